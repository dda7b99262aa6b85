//! Function-level analyses over a parsed source file.
//!
//! ## Layout
//!
//! ```text
//! ast/
//! ├── mod.rs              - SourceFile / FunctionNode, function catalogue
//! ├── pattern.rs          - binding patterns and their decomposition
//! ├── extract.rs          - parameter / declaration names and occurrences
//! ├── normalize.rs        - camel-case renaming
//! └── identifier_tree.rs  - merged ancestor chains of identifiers
//! ```

pub mod extract;
pub mod identifier_tree;
pub mod normalize;
pub mod pattern;

use crate::error::Result;
use crate::syntax::{self, is_function_type, NodeId, SyntaxTree};

pub use extract::{Bindings, NameOccurrence};
pub use identifier_tree::{IdentifierTree, IdentifierTreeNode, Summary, TreeFilter, TypePolicy};
pub use normalize::{camel_case, canonical_name, normalize, NameMatcher};
pub use pattern::{decompose, BindingKind, Extracted, Pattern, PropertyPattern};

// ============ Function Nodes ============

/// A function copied out of its file into a tree rooted at the function.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    tree: SyntaxTree,
}

impl FunctionNode {
    /// Parse the text of one function.
    pub fn parse(text: &str) -> Result<Self> {
        syntax::parse_function(text).map(|tree| Self { tree })
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// `FunctionDeclaration`, `FunctionExpression` or `ArrowFunctionExpression`.
    pub fn node_type(&self) -> &str {
        &self.tree.node(self.root()).node_type
    }

    pub fn name(&self) -> Option<&str> {
        let id = self.tree.child_by_field(self.root(), "id")?;
        self.tree.node(id).name.as_deref()
    }

    pub fn params(&self) -> Vec<NodeId> {
        self.tree.children_by_field(self.root(), "params").collect()
    }

    /// Source text of the function.
    pub fn render(&self) -> &str {
        self.tree.text(self.root())
    }

    pub fn bindings(&self) -> Result<Bindings<'_>> {
        Bindings::of(&self.tree, self.root())
    }

    /// A function is available when it declares at least one local variable.
    pub fn is_available(&self) -> Result<bool> {
        Ok(self.bindings()?.has_declarations())
    }

    pub fn normalized(&self) -> Result<FunctionNode> {
        normalize(self)
    }
}

// ============ Source Files ============

#[derive(Debug, Clone)]
pub struct SourceFile {
    tree: SyntaxTree,
}

impl SourceFile {
    pub fn parse(source: &str) -> Result<Self> {
        syntax::parse(source).map(|tree| Self { tree })
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Every function in pre-order: declarations, expressions, arrows, and
    /// `new Function(...)` calls whose arguments are all string literals.
    pub fn functions(&self) -> Result<Vec<FunctionNode>> {
        let tree = &self.tree;
        let mut functions = Vec::new();
        for id in tree.real_nodes() {
            let node = tree.node(id);
            if is_function_type(&node.node_type) {
                functions.push(FunctionNode {
                    tree: tree.subtree(id),
                });
            } else if let Some(text) = function_constructor_text(tree, id) {
                functions.push(FunctionNode::parse(&text)?);
            }
        }
        Ok(functions)
    }

    pub fn available_functions(&self) -> Result<Vec<FunctionNode>> {
        let mut available = Vec::new();
        for function in self.functions()? {
            if function.is_available()? {
                available.push(function);
            }
        }
        Ok(available)
    }

    pub fn normalized_functions(&self) -> Result<Vec<FunctionNode>> {
        self.functions()?
            .iter()
            .map(FunctionNode::normalized)
            .collect()
    }
}

/// `new Function('a', 'b', 'return a + b')` -> `function (a,b){ return a + b }`.
fn function_constructor_text(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    if !node.is("NewExpression") {
        return None;
    }
    let callee = tree.node(tree.child_by_field(id, "callee")?);
    if !callee.is_identifier() || callee.name.as_deref() != Some("Function") {
        return None;
    }

    let mut values = tree
        .children_by_field(id, "arguments")
        .map(|argument| {
            tree.node(argument)
                .is("StringLiteral")
                .then(|| string_value(tree.text(argument)))
        })
        .collect::<Option<Vec<_>>>()?;
    let body = values.pop().unwrap_or_default();
    Some(format!("function ({}){{ {} }}", values.join(","), body))
}

/// Value of a quoted string literal with escapes resolved.
fn string_value(literal: &str) -> String {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => push_code_point(&mut out, &mut chars, 2),
            Some('u') => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|&h| h != '}').collect();
                    if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        out.push(decoded);
                    }
                } else {
                    push_code_point(&mut out, &mut chars, 4);
                }
            }
            // Line continuation.
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(out: &mut String, chars: &mut std::iter::Peekable<std::str::Chars<'_>>, digits: usize) {
    let hex: String = chars.by_ref().take(digits).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(decoded) => out.push(decoded),
        None => out.push_str(&hex),
    }
}
