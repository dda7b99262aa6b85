//! Owned JavaScript syntax trees.
//!
//! Source text is parsed with tree-sitter and lowered into an arena of
//! [`SyntaxNode`]s whose types follow the Babel naming (`Program`,
//! `FunctionDeclaration`, `Identifier`, ...). Every analysis in this crate
//! works on [`SyntaxTree`] rather than on tree-sitter nodes, so trees can be
//! copied, sliced into function subtrees and shared across threads.
//!
//! ## Layout
//!
//! ```text
//! syntax/
//! ├── mod.rs    - SyntaxTree, positions, grammar dispatch, parse / render
//! └── lower.rs  - tree-sitter kind -> Babel type lowering
//! ```

mod lower;

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tree_sitter::{Language, Node, Parser};

use crate::error::{AnalysisError, Result};

// ============ Positions ============

/// A point in the source: 1-based line, 0-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

/// `[startLine, startColumn, endLine, endColumn]`, all 1-based, end column exclusive.
pub type EditorRange = [usize; 4];

impl SourceLocation {
    pub fn editor_range(&self) -> EditorRange {
        [
            self.start.line,
            self.start.column + 1,
            self.end.line,
            self.end.column + 1,
        ]
    }
}

/// Byte offset -> line/column conversion for one source text.
pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { line_starts }
    }

    pub(crate) fn position(&self, text: &str, byte: usize) -> Position {
        let byte = byte.min(text.len());
        let line = self.line_starts.partition_point(|&start| start <= byte);
        let line_start = self.line_starts[line - 1];
        let column = text
            .get(line_start..byte)
            .map_or(byte - line_start, |slice| slice.chars().count());
        Position { line, column }
    }

    pub(crate) fn location(&self, text: &str, span: &Range<usize>) -> SourceLocation {
        SourceLocation {
            start: self.position(text, span.start),
            end: self.position(text, span.end),
        }
    }
}

// ============ Nodes ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    /// Babel node type, e.g. `VariableDeclarator`.
    pub node_type: String,
    pub loc: SourceLocation,
    /// Byte range into [`SyntaxTree::source`].
    pub span: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Role of this node in its parent (`id`, `params`, `key`, `value`, ...).
    pub field: Option<&'static str>,
    /// Identifier text, for `Identifier` and `JSXIdentifier` nodes.
    pub name: Option<String>,
    /// Element slots of array patterns and array literals; holes are `None`.
    pub elements: Option<Vec<Option<NodeId>>>,
    /// Set on the `File` wrapper and on the duplicate identifier that
    /// shorthand object properties carry as their value.
    pub synthetic: bool,
}

impl SyntaxNode {
    pub fn is(&self, node_type: &str) -> bool {
        self.node_type == node_type
    }

    pub fn is_identifier(&self) -> bool {
        self.node_type == "Identifier"
    }
}

pub fn is_function_type(node_type: &str) -> bool {
    matches!(
        node_type,
        "FunctionDeclaration" | "FunctionExpression" | "ArrowFunctionExpression"
    )
}

// ============ Tree ============

/// Arena of syntax nodes. Node ids are assigned in pre-order.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: NodeId,
    source: Arc<str>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(nodes: Vec<SyntaxNode>, root: NodeId, source: Arc<str>) -> Self {
        Self { nodes, root, source }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first real node: `Program` for a parsed file, the root otherwise.
    pub fn program(&self) -> NodeId {
        let root = self.node(self.root);
        if root.synthetic {
            root.children.first().copied().unwrap_or(self.root)
        } else {
            self.root
        }
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.node(child).field == Some(field))
    }

    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.node(child).field == Some(field))
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |&parent| self.node(parent).parent)
    }

    /// `id` and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    /// Every node in pre-order, without the synthetic `File` wrapper.
    pub fn real_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.program())
    }

    /// Source text covered by `id`.
    pub fn text(&self, id: NodeId) -> &str {
        let span = &self.node(id).span;
        self.source.get(span.clone()).unwrap_or_default()
    }

    /// Copy the subtree rooted at `id` into its own arena sharing the source.
    pub fn subtree(&self, id: NodeId) -> SyntaxTree {
        let order = self.descendants(id);
        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_index, old) in order.iter().enumerate() {
            remap[old.0] = new_index;
        }
        let map = |old: NodeId| NodeId(remap[old.0]);

        let nodes = order
            .iter()
            .map(|&old| {
                let node = self.node(old);
                let mut copy = node.clone();
                copy.parent = if old == id { None } else { node.parent.map(map) };
                if old == id {
                    copy.field = None;
                }
                copy.children = node.children.iter().copied().map(map).collect();
                copy.elements = node
                    .elements
                    .as_ref()
                    .map(|slots| slots.iter().map(|slot| slot.map(map)).collect());
                copy
            })
            .collect();

        SyntaxTree {
            nodes,
            root: NodeId(0),
            source: Arc::clone(&self.source),
        }
    }

    /// Move every span `shift` bytes left and recompute locations against `source`.
    fn rebase(mut self, source: Arc<str>, shift: usize) -> SyntaxTree {
        let index = LineIndex::new(&source);
        for node in &mut self.nodes {
            node.span = node.span.start.saturating_sub(shift)..node.span.end.saturating_sub(shift);
            node.loc = index.location(&source, &node.span);
        }
        self.source = source;
        self
    }

    /// First function node in pre-order.
    pub fn first_function(&self) -> Option<NodeId> {
        self.real_nodes()
            .into_iter()
            .find(|&id| is_function_type(&self.node(id).node_type))
    }
}

// ============ Grammar Modes ============

/// Grammar modes tried in order by [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Plain JavaScript (JSX included).
    Script,
    /// TSX: JavaScript extended with type annotations and JSX.
    Module,
}

impl Grammar {
    pub const ALL: [Grammar; 2] = [Grammar::Script, Grammar::Module];

    fn tree_sitter_language(&self) -> Language {
        match self {
            Self::Script => tree_sitter_javascript::LANGUAGE.into(),
            Self::Module => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

// ============ Parsing ============

/// Parse a whole source file. The root is a synthetic `File` node wrapping `Program`.
pub fn parse(source: &str) -> Result<SyntaxTree> {
    let mut last_error = String::from("empty parse result");
    for grammar in Grammar::ALL {
        match parse_with(source, grammar) {
            Ok(tree) => return Ok(tree),
            Err(message) => last_error = message,
        }
    }
    Err(AnalysisError::Parse { message: last_error })
}

/// Parse with a single grammar; `Err` carries a human readable message.
pub fn parse_with(source: &str, grammar: Grammar) -> std::result::Result<SyntaxTree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.tree_sitter_language())
        .map_err(|e| format!("Failed to set language: {}", e))?;

    let tree = parser.parse(source, None).ok_or("Failed to parse content")?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(describe_error(root, source));
    }

    Ok(lower::lower_file(root, source))
}

/// Parse the text of a single function and return it as a tree rooted at the function.
///
/// Anonymous function expressions are not valid statements, so the text is
/// retried inside parentheses; positions still refer to `text`.
pub fn parse_function(text: &str) -> Result<SyntaxTree> {
    let direct = parse(text);
    if let Ok(tree) = &direct {
        if let Some(function) = tree.first_function() {
            return Ok(tree.subtree(function));
        }
    }

    match parse_function_expression(text) {
        Ok(tree) => Ok(tree),
        Err(_) => match direct {
            Err(err) => Err(err),
            Ok(_) => Err(AnalysisError::NoFunction),
        },
    }
}

/// Parse `text` in expression position, so `function g(){}` stays a
/// `FunctionExpression`; positions still refer to `text`.
pub fn parse_function_expression(text: &str) -> Result<SyntaxTree> {
    let wrapped = format!("({})", text);
    let tree = parse(&wrapped)?;
    let function = tree.first_function().ok_or(AnalysisError::NoFunction)?;
    Ok(tree.subtree(function).rebase(Arc::from(text), 1))
}

/// Source text of `id`.
pub fn render(tree: &SyntaxTree, id: NodeId) -> &str {
    tree.text(id)
}

fn describe_error(root: Node, source: &str) -> String {
    let Some(node) = first_error_node(root) else {
        return "syntax error".to_string();
    };
    let point = node.start_position();
    let line = point.row + 1;
    let column = point.column;
    if node.is_missing() {
        return format!("missing `{}` at {}:{}", node.kind(), line, column);
    }
    let token: String = source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or_default()
        .chars()
        .take(20)
        .collect();
    format!("unexpected `{}` at {}:{}", token.trim(), line, column)
}

fn first_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    None
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;

    fn types(tree: &SyntaxTree) -> Vec<String> {
        tree.real_nodes()
            .into_iter()
            .map(|id| tree.node(id).node_type.clone())
            .collect()
    }

    #[test]
    fn test_file_wraps_program() {
        let tree = parse("let a = 1;").unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.node_type, "File");
        assert!(root.synthetic);
        assert_eq!(tree.node(tree.program()).node_type, "Program");
    }

    #[test]
    fn test_babel_types() {
        let tree = parse("function add(a, b){ const c = a + b; return c; }").unwrap();
        assert_eq!(
            types(&tree),
            vec![
                "Program",
                "FunctionDeclaration",
                "Identifier",
                "Identifier",
                "Identifier",
                "BlockStatement",
                "VariableDeclaration",
                "VariableDeclarator",
                "Identifier",
                "BinaryExpression",
                "Identifier",
                "Identifier",
                "ReturnStatement",
                "Identifier",
            ]
        );
    }

    #[test]
    fn test_declarator_fields() {
        let tree = parse("const c = a;").unwrap();
        let declarator = tree
            .real_nodes()
            .into_iter()
            .find(|&id| tree.node(id).is("VariableDeclarator"))
            .unwrap();
        let id = tree.child_by_field(declarator, "id").unwrap();
        let init = tree.child_by_field(declarator, "init").unwrap();
        assert_eq!(tree.node(id).name.as_deref(), Some("c"));
        assert_eq!(tree.node(init).name.as_deref(), Some("a"));
    }

    #[test]
    fn test_locations_are_one_based_lines() {
        let tree = parse("function a(){\n  return 1;\n}").unwrap();
        let ret = tree
            .real_nodes()
            .into_iter()
            .find(|&id| tree.node(id).is("ReturnStatement"))
            .unwrap();
        let loc = tree.node(ret).loc;
        assert_eq!(loc.start, Position { line: 2, column: 2 });
        assert_eq!(loc.end, Position { line: 2, column: 11 });
    }

    #[test]
    fn test_program_spans_whole_source() {
        let source = "\n\nlet a = 1;\n";
        let tree = parse(source).unwrap();
        let program = tree.node(tree.program());
        assert_eq!(program.span, 0..source.len());
        assert_eq!(program.loc.start, Position { line: 1, column: 0 });
        assert_eq!(program.loc.end, Position { line: 4, column: 0 });
    }

    #[test]
    fn test_shorthand_property_has_duplicate() {
        let tree = parse("const {a} = o;").unwrap();
        let identifiers: Vec<_> = tree
            .real_nodes()
            .into_iter()
            .filter(|&id| tree.node(id).is_identifier() && tree.node(id).name.as_deref() == Some("a"))
            .collect();
        assert_eq!(identifiers.len(), 2);
        assert!(!tree.node(identifiers[0]).synthetic);
        assert!(tree.node(identifiers[1]).synthetic);
        assert_eq!(tree.node(identifiers[0]).span, tree.node(identifiers[1]).span);
    }

    #[test]
    fn test_array_pattern_holes() {
        let tree = parse("const [, b, , c] = o;").unwrap();
        let pattern = tree
            .real_nodes()
            .into_iter()
            .find(|&id| tree.node(id).is("ArrayPattern"))
            .unwrap();
        let slots = tree.node(pattern).elements.clone().unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots[0].is_none());
        assert!(slots[1].is_some());
        assert!(slots[2].is_none());
        assert!(slots[3].is_some());
    }

    #[test]
    fn test_for_in_gets_declaration() {
        let tree = parse("for (var p in m) {}").unwrap();
        let t = types(&tree);
        assert!(t.contains(&"ForInStatement".to_string()));
        assert!(t.contains(&"VariableDeclarator".to_string()));
    }

    #[test]
    fn test_logical_expression() {
        let tree = parse("a && b;").unwrap();
        assert!(types(&tree).contains(&"LogicalExpression".to_string()));
    }

    #[test]
    fn test_typescript_falls_back_to_module_grammar() {
        let tree = parse("function f(a: number): number { let b: number = a; return b; }").unwrap();
        let t = types(&tree);
        assert!(t.contains(&"FunctionDeclaration".to_string()));
        assert!(t.contains(&"VariableDeclarator".to_string()));
    }

    #[test]
    fn test_this_parameter_is_not_a_param() {
        let tree = parse_function("function f(this: Window, a: number) { let b = a; }").unwrap();
        let params: Vec<&str> = tree
            .children_by_field(tree.root(), "params")
            .map(|id| tree.node(id).name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(params, vec!["a"]);
        assert!(!types(&tree).contains(&"ThisExpression".to_string()));
    }

    #[test]
    fn test_parse_function_expression_keeps_type() {
        let tree = parse_function_expression("function g(a) { return a; }").unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.node_type, "FunctionExpression");
        assert_eq!(root.span, 0..27);
        assert_eq!(root.loc.start, Position { line: 1, column: 0 });
        assert_eq!(parse_function("function g(a) { return a; }").unwrap().node(NodeId(0)).node_type, "FunctionDeclaration");
    }

    #[test]
    fn test_parse_error() {
        let err = parse("function (").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { .. }));
    }

    #[test]
    fn test_parse_anonymous_function() {
        let tree = parse_function("function () {\n  let x = 1;\n}").unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.node_type, "FunctionExpression");
        assert_eq!(root.loc.start, Position { line: 1, column: 0 });
        assert_eq!(render(&tree, tree.root()), "function () {\n  let x = 1;\n}");
    }

    #[test]
    fn test_subtree_is_self_contained() {
        let tree = parse("let x = 1; function f(a) { return a; }").unwrap();
        let function = tree.first_function().unwrap();
        let sub = tree.subtree(function);
        assert_eq!(sub.node(sub.root()).parent, None);
        assert_eq!(sub.program(), sub.root());
        assert_eq!(sub.text(sub.root()), "function f(a) { return a; }");
        for id in sub.real_nodes().into_iter().skip(1) {
            assert!(sub.node(id).parent.is_some());
        }
    }

    #[test]
    fn test_columns_count_characters() {
        let tree = parse("let s = 'é'; let t = 1;").unwrap();
        let t_id = tree
            .real_nodes()
            .into_iter()
            .find(|&id| tree.node(id).name.as_deref() == Some("t"))
            .unwrap();
        assert_eq!(tree.node(t_id).loc.start.column, 17);
    }
}
