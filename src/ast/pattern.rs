//! Binding patterns and their decomposition into named leaves.
//!
//! A [`Pattern`] is read from the left-hand side of a declarator or from a
//! parameter. [`decompose`] turns it into an [`Extracted`] value that keeps
//! the destructuring shape, and [`Extracted::flatten`] lists the bound names
//! depth-first, left to right.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{AnalysisError, Result};
use crate::syntax::{NodeId, SyntaxTree};

/// Prefix marking names captured by a rest element.
pub const REST_PREFIX: &str = "...";

// ============ Patterns ============

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Identifier(String),
    Rest(Box<Pattern>),
    /// Target with a default value; the default itself is not kept.
    Assignment { target: Box<Pattern> },
    /// Slots in source order; holes are `None`.
    Array(Vec<Option<Pattern>>),
    Object(Vec<PropertyPattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPattern {
    Property { key: String, value: Pattern },
    /// Trailing `...name`.
    Rest(String),
}

impl Pattern {
    /// Read the pattern rooted at `id`.
    pub fn from_node(tree: &SyntaxTree, id: NodeId) -> Result<Pattern> {
        let node = tree.node(id);
        match node.node_type.as_str() {
            "Identifier" => Ok(Pattern::Identifier(node.name.clone().unwrap_or_default())),
            "RestElement" => {
                let argument = required_child(tree, id, "argument")?;
                Ok(Pattern::Rest(Box::new(Pattern::from_node(tree, argument)?)))
            }
            "AssignmentPattern" => {
                let left = required_child(tree, id, "left")?;
                Ok(Pattern::Assignment {
                    target: Box::new(Pattern::from_node(tree, left)?),
                })
            }
            "ArrayPattern" => {
                let slots = node.elements.clone().unwrap_or_default();
                let elements = slots
                    .into_iter()
                    .map(|slot| slot.map(|element| Pattern::from_node(tree, element)).transpose())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Pattern::Array(elements))
            }
            "ObjectPattern" => {
                let properties = tree
                    .children_by_field(id, "properties")
                    .map(|property| property_pattern(tree, property))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Pattern::Object(properties))
            }
            _ => Err(unsupported(tree, id)),
        }
    }
}

fn property_pattern(tree: &SyntaxTree, id: NodeId) -> Result<PropertyPattern> {
    match tree.node(id).node_type.as_str() {
        "ObjectProperty" => {
            let key = required_child(tree, id, "key")?;
            let value = required_child(tree, id, "value")?;
            Ok(PropertyPattern::Property {
                key: key_name(tree, key),
                value: Pattern::from_node(tree, value)?,
            })
        }
        "RestElement" => {
            let argument = required_child(tree, id, "argument")?;
            match tree.node(argument).name.as_deref() {
                Some(name) if tree.node(argument).is_identifier() => {
                    Ok(PropertyPattern::Rest(name.to_string()))
                }
                _ => Err(unsupported(tree, argument)),
            }
        }
        _ => Err(unsupported(tree, id)),
    }
}

/// Property key as written: identifier name, or literal text without quotes.
fn key_name(tree: &SyntaxTree, key: NodeId) -> String {
    match &tree.node(key).name {
        Some(name) => name.clone(),
        None => tree
            .text(key)
            .trim_matches(|c| c == '"' || c == '\'' || c == '[' || c == ']')
            .to_string(),
    }
}

fn required_child(tree: &SyntaxTree, id: NodeId, field: &str) -> Result<NodeId> {
    tree.child_by_field(id, field)
        .ok_or_else(|| unsupported(tree, id))
}

fn unsupported(tree: &SyntaxTree, id: NodeId) -> AnalysisError {
    let node = tree.node(id);
    AnalysisError::UnsupportedPattern {
        kind: node.node_type.clone(),
        line: node.loc.start.line,
        column: node.loc.start.column,
    }
}

// ============ Extracted Structure ============

/// How a leaf name is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Identifier,
    RestElement,
    Assignment,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "Identifier",
            Self::RestElement => "RestElement",
            Self::Assignment => "Assignment",
        }
    }
}

/// Shape-preserving mirror of a [`Pattern`].
///
/// Serializes to the display form: a top-level or sequence leaf is its
/// name (`"...rest"` for rest elements), a mapping leaf is its kind tag, and
/// an array hole is `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Leaf { name: String, kind: BindingKind },
    Sequence(Vec<Option<Extracted>>),
    Mapping(Vec<(String, Extracted)>),
}

impl Extracted {
    fn leaf(name: &str, kind: BindingKind) -> Self {
        Extracted::Leaf {
            name: name.to_string(),
            kind,
        }
    }

    /// Bound names depth-first, left to right; rest names keep the `...` prefix.
    pub fn flatten(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.flatten_into(&mut names);
        names
    }

    fn flatten_into(&self, names: &mut Vec<String>) {
        match self {
            Extracted::Leaf { name, kind } => names.push(leaf_display(name, *kind)),
            Extracted::Sequence(slots) => {
                for slot in slots.iter().flatten() {
                    slot.flatten_into(names);
                }
            }
            Extracted::Mapping(entries) => {
                for (_, value) in entries {
                    value.flatten_into(names);
                }
            }
        }
    }
}

fn leaf_display(name: &str, kind: BindingKind) -> String {
    match kind {
        BindingKind::RestElement => format!("{}{}", REST_PREFIX, name),
        _ => name.to_string(),
    }
}

/// Decompose a pattern, discarding default values.
pub fn decompose(pattern: &Pattern) -> Extracted {
    match pattern {
        Pattern::Identifier(name) => Extracted::leaf(name, BindingKind::Identifier),
        Pattern::Rest(inner) => match inner.as_ref() {
            Pattern::Identifier(name) => Extracted::leaf(name, BindingKind::RestElement),
            nested => decompose(nested),
        },
        Pattern::Assignment { target } => match target.as_ref() {
            Pattern::Identifier(name) => Extracted::leaf(name, BindingKind::Assignment),
            nested => decompose(nested),
        },
        Pattern::Array(slots) => Extracted::Sequence(
            slots
                .iter()
                .map(|slot| slot.as_ref().map(decompose))
                .collect(),
        ),
        Pattern::Object(properties) => Extracted::Mapping(
            properties
                .iter()
                .map(|property| match property {
                    PropertyPattern::Property { key, value } => {
                        let extracted = decompose(value);
                        // Leaves are keyed by the name they bind, nested shapes by the property key.
                        let entry_key = match &extracted {
                            Extracted::Leaf { name, .. } => name.clone(),
                            _ => key.clone(),
                        };
                        (entry_key, extracted)
                    }
                    PropertyPattern::Rest(name) => {
                        (name.clone(), Extracted::leaf(name, BindingKind::RestElement))
                    }
                })
                .collect(),
        ),
    }
}

// ============ Display Serialization ============

struct Shape<'a> {
    value: &'a Extracted,
    in_mapping: bool,
}

impl Serialize for Shape<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.value {
            Extracted::Leaf { kind, .. } if self.in_mapping => serializer.serialize_str(kind.as_str()),
            Extracted::Leaf { name, kind } => serializer.serialize_str(&leaf_display(name, *kind)),
            Extracted::Sequence(slots) => {
                let mut seq = serializer.serialize_seq(Some(slots.len()))?;
                for slot in slots {
                    let shape = slot.as_ref().map(|value| Shape {
                        value,
                        in_mapping: false,
                    });
                    seq.serialize_element(&shape)?;
                }
                seq.end()
            }
            Extracted::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(
                        key,
                        &Shape {
                            value,
                            in_mapping: true,
                        },
                    )?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Extracted {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Shape {
            value: self,
            in_mapping: false,
        }
        .serialize(serializer)
    }
}
