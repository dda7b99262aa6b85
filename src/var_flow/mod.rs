//! Var-flow: per-character color blending of syntax regions and variable roles.
//!
//! Pipeline: classify and color nodes ([`code_colors`]), stack colors per
//! character and blend them ([`ColorMatrix::build`]), then merge equal
//! neighbours into ranges ([`range_class_colors`]).

pub mod color;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::extract::Bindings;
use crate::ast::NameMatcher;
use crate::error::Result;
use crate::syntax::{self, is_function_type, EditorRange, NodeId, SourceLocation, SyntaxTree};

pub use color::{mix, mix_colors, Mixer, Rgb, TRANSPARENT};

/// Classification of an identifier bound by a declarator.
pub const VARIABLE_DEFINITION: &str = "VariableDefinition";
/// Classification of any other identifier naming a known variable.
pub const VARIABLE_MENTION: &str = "VariableMention";

// ============ Palette ============

/// Node type (or variable classification) -> color. Empty colors disable a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(IndexMap<String, String>);

impl Default for Palette {
    fn default() -> Self {
        let mut colors = IndexMap::new();
        colors.insert(VARIABLE_DEFINITION.to_string(), "rgb(255, 99, 71)".to_string());
        colors.insert(VARIABLE_MENTION.to_string(), "rgb(65, 105, 225)".to_string());
        Palette(colors)
    }
}

impl Palette {
    pub fn new(colors: IndexMap<String, String>) -> Self {
        Palette(colors)
    }

    /// `overrides` laid over `self`, key by key.
    pub fn merged(&self, overrides: &IndexMap<String, String>) -> Palette {
        let mut colors = self.0.clone();
        for (node_type, color) in overrides {
            colors.insert(node_type.clone(), color.clone());
        }
        Palette(colors)
    }

    pub fn color_for(&self, node_type: &str) -> Option<&str> {
        self.0
            .get(node_type)
            .map(String::as_str)
            .filter(|color| !color.is_empty())
    }
}

// ============ Classification ============

/// Parameter names of every function plus every declared name in the tree.
pub fn known_names(tree: &SyntaxTree) -> Result<Vec<String>> {
    let program = tree.program();
    let mut names = Bindings::of(tree, program)?.declaration_names();
    for id in tree.real_nodes() {
        if is_function_type(&tree.node(id).node_type) {
            names.extend(Bindings::of(tree, id)?.parameter_names());
        }
    }
    Ok(names)
}

/// Effective type of a node: identifiers naming known variables become
/// [`VARIABLE_DEFINITION`] or [`VARIABLE_MENTION`], everything else keeps its own type.
pub fn classify<'a>(tree: &'a SyntaxTree, id: NodeId, known: &NameMatcher) -> &'a str {
    let node = tree.node(id);
    let is_known = node.is_identifier()
        && node
            .name
            .as_deref()
            .is_some_and(|name| known.matches(name).is_some());
    if !is_known {
        return &node.node_type;
    }
    if is_definition(tree, id) {
        VARIABLE_DEFINITION
    } else {
        VARIABLE_MENTION
    }
}

/// Under an `id` edge somewhere up the chain, with a declarator above.
fn is_definition(tree: &SyntaxTree, id: NodeId) -> bool {
    let mut under_id = tree.node(id).field == Some("id");
    let mut in_declarator = false;
    for ancestor in tree.ancestors(id) {
        let node = tree.node(ancestor);
        under_id |= node.field == Some("id");
        in_declarator |= node.is("VariableDeclarator");
    }
    under_id && in_declarator
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeColor {
    /// The node's own syntactic type, even when colored as a variable role.
    #[serde(rename = "type")]
    pub node_type: String,
    pub color: String,
    /// Parser location: 1-based lines, 0-based columns. See [`CodeColor::range`]
    /// for the editor form.
    pub loc: SourceLocation,
}

impl CodeColor {
    /// `loc` with 1-based columns, as shown in an editor.
    pub fn range(&self) -> EditorRange {
        self.loc.editor_range()
    }
}

/// Colored nodes in pre-order; synthetic nodes and uncolored types are skipped.
pub fn code_colors(tree: &SyntaxTree, palette: &Palette, known: &NameMatcher) -> Vec<CodeColor> {
    tree.real_nodes()
        .into_iter()
        .filter(|&id| !tree.node(id).synthetic)
        .filter_map(|id| {
            let color = palette.color_for(classify(tree, id, known))?;
            let node = tree.node(id);
            Some(CodeColor {
                node_type: node.node_type.clone(),
                color: color.to_string(),
                loc: node.loc,
            })
        })
        .collect()
}

// ============ Matrix ============

/// Blended color and contributing types for every character of the source.
///
/// Rows follow the source lines (split on `\n`), each as wide as its line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorMatrix {
    pub colors: Vec<Vec<String>>,
    pub types: Vec<Vec<Vec<String>>>,
}

impl ColorMatrix {
    pub fn build(source: &str, code_colors: &[CodeColor], mixer: Mixer) -> Result<Self> {
        let widths: Vec<usize> = source.split('\n').map(|line| line.chars().count()).collect();
        let mut stacks: Vec<Vec<Vec<usize>>> = widths.iter().map(|&w| vec![Vec::new(); w]).collect();

        let parsed = code_colors
            .iter()
            .map(|entry| entry.color.parse::<Rgb>())
            .collect::<Result<Vec<_>>>()?;

        for (index, entry) in code_colors.iter().enumerate() {
            let SourceLocation { start, end } = entry.loc;
            for line in start.line..=end.line {
                let Some(row) = stacks.get_mut(line.wrapping_sub(1)) else {
                    break;
                };
                let width = row.len();
                let from = if line == start.line { start.column } else { 0 };
                let to = if line == end.line { end.column.min(width) } else { width };
                for cell in row.iter_mut().take(to).skip(from) {
                    cell.push(index);
                }
            }
        }

        let colors = stacks
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let stacked: Vec<Rgb> = cell.iter().map(|&i| parsed[i]).collect();
                        color::blend_to_string(&stacked, mixer)
                    })
                    .collect()
            })
            .collect();
        let types = stacks
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.iter().map(|&i| code_colors[i].node_type.clone()).collect())
                    .collect()
            })
            .collect();

        Ok(Self { colors, types })
    }
}

// ============ Ranges ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeClassColor {
    /// Distinct types of the last cell of the run, in stacking order.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub range: EditorRange,
    pub color: String,
}

/// Row-major run-length merge of equal blended colors.
pub fn range_class_colors(matrix: &ColorMatrix) -> Vec<RangeClassColor> {
    let mut ranges = Vec::new();
    let mut current: Option<RangeClassColor> = None;

    for (row, (colors, types)) in matrix.colors.iter().zip(&matrix.types).enumerate() {
        let line = row + 1;
        for (column, (color, cell_types)) in colors.iter().zip(types).enumerate() {
            let cell_types = distinct(cell_types);
            match current.as_mut() {
                Some(run) if run.color == *color => {
                    run.range[2] = line;
                    run.range[3] = column + 2;
                    run.types = cell_types;
                }
                _ => {
                    ranges.extend(current.take());
                    current = Some(RangeClassColor {
                        types: cell_types,
                        range: [line, column + 1, line, column + 2],
                        color: color.clone(),
                    });
                }
            }
        }
    }
    ranges.extend(current);
    ranges
}

fn distinct(types: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(types.len());
    for node_type in types {
        if !seen.contains(node_type) {
            seen.push(node_type.clone());
        }
    }
    seen
}

// ============ Pipeline ============

/// Parse `source` and compute its var-flow ranges.
pub fn colorize(
    source: &str,
    mixer: Mixer,
    overrides: &IndexMap<String, String>,
) -> Result<Vec<RangeClassColor>> {
    let tree = syntax::parse(source)?;
    let palette = Palette::default().merged(overrides);
    let known = NameMatcher::new(known_names(&tree)?);
    let colors = code_colors(&tree, &palette, &known);
    let matrix = ColorMatrix::build(source, &colors, mixer)?;
    Ok(range_class_colors(&matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Position;
    use pretty_assertions::assert_eq;

    const GREEN: &str = "rgb(0, 255, 0)";
    const YELLOW: &str = "rgb(254, 255, 0)";
    const MID: &str = "rgb(127, 255, 0)";
    const CODE: &str = "function foo(a, b) {\n  return a + b;\n}";

    fn overrides(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn block_and_return() -> Palette {
        Palette::new(overrides(&[("BlockStatement", YELLOW), ("ReturnStatement", GREEN)]))
    }

    #[test]
    fn test_code_colors() {
        let tree = syntax::parse(CODE).unwrap();
        let palette = Palette::new(overrides(&[("ReturnStatement", GREEN)]));
        let colors = code_colors(&tree, &palette, &NameMatcher::default());
        assert_eq!(
            colors,
            vec![CodeColor {
                node_type: "ReturnStatement".into(),
                color: GREEN.into(),
                loc: SourceLocation {
                    start: Position { line: 2, column: 2 },
                    end: Position { line: 2, column: 15 },
                },
            }]
        );
        assert_eq!(colors[0].range(), [2, 3, 2, 16]);
    }

    #[test]
    fn test_matrix_follows_lines() {
        let tree = syntax::parse(CODE).unwrap();
        let colors = code_colors(&tree, &block_and_return(), &NameMatcher::default());
        let matrix = ColorMatrix::build(CODE, &colors, Mixer::Average).unwrap();

        let widths: Vec<usize> = matrix.colors.iter().map(Vec::len).collect();
        assert_eq!(widths, vec![20, 15, 1]);
        assert!(matrix.colors[0][..19].iter().all(|c| c == TRANSPARENT));
        assert_eq!(matrix.colors[0][19], YELLOW);
        assert_eq!(matrix.colors[1][..2].to_vec(), vec![YELLOW, YELLOW]);
        assert!(matrix.colors[1][2..].iter().all(|c| c == MID));
        assert_eq!(matrix.colors[2], vec![YELLOW]);
        assert_eq!(matrix.types[1][2], vec!["BlockStatement", "ReturnStatement"]);
        assert!(matrix.types[0][0].is_empty());
    }

    #[test]
    fn test_ranges() {
        let tree = syntax::parse(CODE).unwrap();
        let colors = code_colors(&tree, &block_and_return(), &NameMatcher::default());
        let matrix = ColorMatrix::build(CODE, &colors, Mixer::Average).unwrap();
        let ranges = range_class_colors(&matrix);
        assert_eq!(
            ranges,
            vec![
                RangeClassColor { types: vec![], range: [1, 1, 1, 20], color: TRANSPARENT.into() },
                RangeClassColor {
                    types: vec!["BlockStatement".into()],
                    range: [1, 20, 2, 3],
                    color: YELLOW.into(),
                },
                RangeClassColor {
                    types: vec!["BlockStatement".into(), "ReturnStatement".into()],
                    range: [2, 3, 2, 16],
                    color: MID.into(),
                },
                RangeClassColor {
                    types: vec!["BlockStatement".into()],
                    range: [3, 1, 3, 2],
                    color: YELLOW.into(),
                },
            ]
        );
    }

    #[test]
    fn test_ranges_partition_the_source() {
        let source = "let a = 1;\nlet b = a;";
        let ranges = colorize(source, Mixer::Power, &IndexMap::new()).unwrap();
        for pair in ranges.windows(2) {
            assert_ne!(pair[0].color, pair[1].color);
        }

        let widths: Vec<usize> = source.split('\n').map(|l| l.chars().count()).collect();
        let covered: usize = ranges
            .iter()
            .map(|r| {
                let [l1, c1, l2, c2] = r.range;
                if l1 == l2 {
                    c2 - c1
                } else {
                    (widths[l1 - 1] - (c1 - 1)) + widths[l1..l2 - 1].iter().sum::<usize>() + (c2 - 1)
                }
            })
            .sum();
        assert_eq!(covered, widths.iter().sum::<usize>());
        assert_eq!(ranges.first().map(|r| [r.range[0], r.range[1]]), Some([1, 1]));
        assert_eq!(ranges.last().map(|r| [r.range[2], r.range[3]]), Some([2, 11]));
    }

    #[test]
    fn test_definition_and_mention() {
        let tree = syntax::parse("function f(p) {\n  const {x, y: [z]} = p;\n  return x + z;\n}").unwrap();
        let known = NameMatcher::new(known_names(&tree).unwrap());
        let roles: Vec<(String, &str)> = tree
            .real_nodes()
            .into_iter()
            .filter(|&id| tree.node(id).is_identifier() && !tree.node(id).synthetic)
            .map(|id| (tree.node(id).name.clone().unwrap_or_default(), classify(&tree, id, &known)))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("f".to_string(), "Identifier"),
                ("p".to_string(), VARIABLE_MENTION),
                ("x".to_string(), VARIABLE_DEFINITION),
                ("y".to_string(), "Identifier"),
                ("z".to_string(), VARIABLE_DEFINITION),
                ("p".to_string(), VARIABLE_MENTION),
                ("x".to_string(), VARIABLE_MENTION),
                ("z".to_string(), VARIABLE_MENTION),
            ]
        );
    }

    #[test]
    fn test_palette_merge_and_disable() {
        let palette = Palette::default().merged(&overrides(&[(VARIABLE_MENTION, ""), ("IfStatement", GREEN)]));
        assert_eq!(palette.color_for(VARIABLE_MENTION), None);
        assert_eq!(palette.color_for(VARIABLE_DEFINITION), Some("rgb(255, 99, 71)"));
        assert_eq!(palette.color_for("IfStatement"), Some(GREEN));
    }

    #[test]
    fn test_pipeline_with_overrides() {
        let palette = overrides(&[
            ("BlockStatement", YELLOW),
            ("ReturnStatement", GREEN),
            (VARIABLE_DEFINITION, ""),
            (VARIABLE_MENTION, ""),
        ]);
        let ranges = colorize(CODE, Mixer::Average, &palette).unwrap();
        let summary: Vec<(EditorRange, &str)> =
            ranges.iter().map(|r| (r.range, r.color.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ([1, 1, 1, 20], TRANSPARENT),
                ([1, 20, 2, 3], YELLOW),
                ([2, 3, 2, 16], MID),
                ([3, 1, 3, 2], YELLOW),
            ]
        );
    }

    #[test]
    fn test_invalid_palette_color() {
        let err = colorize(CODE, Mixer::Average, &overrides(&[("ReturnStatement", "greenish")])).unwrap_err();
        assert_eq!(err, crate::error::AnalysisError::InvalidColor("greenish".into()));
    }
}
