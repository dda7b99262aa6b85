//! Lowering of tree-sitter JavaScript / TSX trees into [`SyntaxTree`].
//!
//! Node kinds are renamed to their Babel counterparts; wrapper kinds Babel
//! does not have (`formal_parameters`, `arguments`, parenthesized
//! expressions, ...) are dissolved into their parent, and comments are dropped.

use std::ops::Range;
use std::sync::Arc;

use tree_sitter::Node;

use super::{LineIndex, NodeId, SyntaxNode, SyntaxTree};

// ============ Kind Tables ============

/// Kinds whose children are lowered directly into the parent, with the field they get there.
fn transparent_field(kind: &str) -> Option<Option<&'static str>> {
    match kind {
        "formal_parameters" => Some(Some("params")),
        "arguments" => Some(Some("arguments")),
        "else_clause" => Some(Some("alternate")),
        "finally_clause" => Some(Some("finalizer")),
        "switch_body" => Some(Some("cases")),
        "class_heritage" => Some(Some("superClass")),
        "template_substitution" => Some(Some("expressions")),
        "parenthesized_expression" => Some(None),
        _ => None,
    }
}

/// Kinds lowered without their children.
fn is_leaf_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "property_identifier"
            | "statement_identifier"
            | "private_property_identifier"
            | "type_identifier"
            | "undefined"
            | "string"
            | "number"
            | "regex"
            | "true"
            | "false"
            | "null"
            | "this"
            | "super"
            | "string_fragment"
            | "jsx_text"
            | "hash_bang_line"
    )
}

fn is_identifier_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "property_identifier" | "statement_identifier" | "undefined"
    )
}

/// Parents whose identifiers are tag or attribute names. Identifiers inside
/// `{...}` expression containers stay plain `Identifier`s.
fn is_jsx_name_parent(parent_kind: &str) -> bool {
    matches!(
        parent_kind,
        "jsx_opening_element"
            | "jsx_closing_element"
            | "jsx_self_closing_element"
            | "jsx_attribute"
            | "nested_identifier"
            | "jsx_namespace_name"
    )
}

fn babel_type(node: Node, parent_kind: &str) -> String {
    let kind = node.kind();
    if is_identifier_kind(kind) && is_jsx_name_parent(parent_kind) {
        return "JSXIdentifier".to_string();
    }
    let mapped = match kind {
        "program" => "Program",
        "identifier" | "property_identifier" | "statement_identifier" | "undefined" => "Identifier",
        "private_property_identifier" => "PrivateName",
        "function_declaration" | "generator_function_declaration" => "FunctionDeclaration",
        "function" | "function_expression" | "generator_function" => "FunctionExpression",
        "arrow_function" => "ArrowFunctionExpression",
        "method_definition" => "ClassMethod",
        "class_declaration" | "abstract_class_declaration" => "ClassDeclaration",
        "class" => "ClassExpression",
        "class_body" => "ClassBody",
        "field_definition" | "public_field_definition" => "ClassProperty",
        "statement_block" => "BlockStatement",
        "lexical_declaration" | "variable_declaration" => "VariableDeclaration",
        "variable_declarator" => "VariableDeclarator",
        "expression_statement" => "ExpressionStatement",
        "return_statement" => "ReturnStatement",
        "if_statement" => "IfStatement",
        "for_statement" => "ForStatement",
        "for_in_statement" => {
            let is_of = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "of");
            if is_of {
                "ForOfStatement"
            } else {
                "ForInStatement"
            }
        }
        "while_statement" => "WhileStatement",
        "do_statement" => "DoWhileStatement",
        "break_statement" => "BreakStatement",
        "continue_statement" => "ContinueStatement",
        "throw_statement" => "ThrowStatement",
        "try_statement" => "TryStatement",
        "catch_clause" => "CatchClause",
        "switch_statement" => "SwitchStatement",
        "switch_case" | "switch_default" => "SwitchCase",
        "labeled_statement" => "LabeledStatement",
        "empty_statement" => "EmptyStatement",
        "debugger_statement" => "DebuggerStatement",
        "import_statement" => "ImportDeclaration",
        "export_statement" => "ExportNamedDeclaration",
        "binary_expression" => {
            let logical = node
                .child_by_field_name("operator")
                .is_some_and(|op| matches!(op.kind(), "&&" | "||" | "??"));
            if logical {
                "LogicalExpression"
            } else {
                "BinaryExpression"
            }
        }
        "unary_expression" => "UnaryExpression",
        "update_expression" => "UpdateExpression",
        "assignment_expression" | "augmented_assignment_expression" => "AssignmentExpression",
        "ternary_expression" => "ConditionalExpression",
        "call_expression" => "CallExpression",
        "new_expression" => "NewExpression",
        "member_expression" | "subscript_expression" => "MemberExpression",
        "await_expression" => "AwaitExpression",
        "yield_expression" => "YieldExpression",
        "sequence_expression" => "SequenceExpression",
        "spread_element" => "SpreadElement",
        "object" => "ObjectExpression",
        "pair" | "pair_pattern" => "ObjectProperty",
        "array" => "ArrayExpression",
        "object_pattern" => "ObjectPattern",
        "array_pattern" => "ArrayPattern",
        "assignment_pattern" => "AssignmentPattern",
        "rest_pattern" => "RestElement",
        "string" => "StringLiteral",
        "number" => "NumericLiteral",
        "true" | "false" => "BooleanLiteral",
        "null" => "NullLiteral",
        "regex" => "RegExpLiteral",
        "template_string" => "TemplateLiteral",
        "string_fragment" => "TemplateElement",
        "tagged_template_expression" => "TaggedTemplateExpression",
        "this" => "ThisExpression",
        "super" => "Super",
        "jsx_element" | "jsx_self_closing_element" => "JSXElement",
        "jsx_opening_element" => "JSXOpeningElement",
        "jsx_closing_element" => "JSXClosingElement",
        "jsx_attribute" => "JSXAttribute",
        "jsx_expression" => "JSXExpressionContainer",
        "jsx_text" => "JSXText",
        "type_annotation" => "TypeAnnotation",
        other => return pascal_case(other),
    };
    mapped.to_string()
}

/// `computed_property_name` -> `ComputedPropertyName`.
fn pascal_case(kind: &str) -> String {
    kind.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Babel key for a child, from the tree-sitter field name and the parent kind.
fn babel_field(parent_kind: &str, field: Option<&'static str>) -> Option<&'static str> {
    match (parent_kind, field) {
        (
            "variable_declarator"
            | "function_declaration"
            | "generator_function_declaration"
            | "function"
            | "function_expression"
            | "generator_function"
            | "class_declaration"
            | "abstract_class_declaration"
            | "class",
            Some("name"),
        ) => Some("id"),
        ("variable_declarator", Some("value")) => Some("init"),
        ("arrow_function", Some("parameter")) => Some("params"),
        ("call_expression", Some("function")) => Some("callee"),
        ("new_expression", Some("constructor")) => Some("callee"),
        (_, Some("condition")) => Some("test"),
        (_, Some("consequence")) => Some("consequent"),
        (_, Some("alternative")) => Some("alternate"),
        (_, Some(other)) => Some(other),
        ("rest_pattern" | "spread_element", None) => Some("argument"),
        ("array" | "array_pattern", None) => Some("elements"),
        ("object" | "object_pattern", None) => Some("properties"),
        ("program" | "statement_block" | "class_body", None) => Some("body"),
        ("lexical_declaration" | "variable_declaration", None) => Some("declarations"),
        _ => None,
    }
}

// ============ Lowering ============

pub(super) fn lower_file(root: Node, source: &str) -> SyntaxTree {
    let mut lowering = Lowering::new(source);
    let whole = 0..source.len();
    let file = lowering.push(None, None, "File".to_string(), whole.clone());
    lowering.nodes[file.0].synthetic = true;
    let program = lowering.push(Some(file), Some("program"), "Program".to_string(), whole);
    lowering.lower_children(root, program);
    lowering.finish(file)
}

struct Lowering<'s> {
    source: &'s str,
    index: LineIndex,
    nodes: Vec<SyntaxNode>,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            nodes: Vec::new(),
        }
    }

    fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree::from_parts(self.nodes, root, Arc::from(self.source))
    }

    fn push(
        &mut self,
        parent: Option<NodeId>,
        field: Option<&'static str>,
        node_type: String,
        span: Range<usize>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let loc = self.index.location(self.source, &span);
        self.nodes.push(SyntaxNode {
            node_type,
            loc,
            span,
            parent,
            children: Vec::new(),
            field,
            name: None,
            elements: None,
            synthetic: false,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn push_identifier(
        &mut self,
        parent: NodeId,
        field: Option<&'static str>,
        node: Node,
        synthetic: bool,
    ) -> NodeId {
        let id = self.push(Some(parent), field, "Identifier".to_string(), node.byte_range());
        let name = self.text(node).to_string();
        let entry = &mut self.nodes[id.0];
        entry.name = Some(name);
        entry.synthetic = synthetic;
        id
    }

    fn text(&self, node: Node) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Lower every named child of `node` into `parent`.
    fn lower_children(&mut self, node: Node, parent: NodeId) {
        self.lower_children_as(node, parent, None);
    }

    /// Same as [`Self::lower_children`]; `forced` replaces each child's field.
    fn lower_children_as(&mut self, node: Node, parent: NodeId, forced: Option<&'static str>) {
        let kind = node.kind();
        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            if child.is_named() {
                let field = forced.or_else(|| babel_field(kind, cursor.field_name()));
                self.lower(child, kind, parent, field);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    fn lower(&mut self, node: Node, parent_kind: &str, parent: NodeId, field: Option<&'static str>) {
        let kind = node.kind();
        if matches!(kind, "comment" | "html_comment" | "escape_sequence") {
            return;
        }
        if let Some(inner_field) = transparent_field(kind) {
            self.lower_children_as(node, parent, inner_field.or(field));
            return;
        }

        match kind {
            "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                self.lower_shorthand(node, parent, field);
            }
            "object_assignment_pattern" => self.lower_object_assignment(node, parent, field),
            "required_parameter" | "optional_parameter" => {
                self.lower_typed_parameter(node, parent, field);
            }
            "array" | "array_pattern" => self.lower_array(node, parent_kind, parent, field),
            "for_in_statement" => self.lower_for_in(node, parent_kind, parent, field),
            _ => {
                let node_type = babel_type(node, parent_kind);
                let id = self.push(Some(parent), field, node_type, node.byte_range());
                if is_identifier_kind(kind) || kind == "private_property_identifier" {
                    self.nodes[id.0].name = Some(self.text(node).to_string());
                }
                if !is_leaf_kind(kind) {
                    self.lower_children(node, id);
                }
            }
        }
    }

    /// `{a}` becomes `ObjectProperty { key: a, value: a' }` with `a'` a synthetic duplicate.
    fn lower_shorthand(&mut self, node: Node, parent: NodeId, field: Option<&'static str>) {
        let property = self.push(Some(parent), field, "ObjectProperty".to_string(), node.byte_range());
        self.push_identifier(property, Some("key"), node, false);
        self.push_identifier(property, Some("value"), node, true);
    }

    /// `{a = 1}` becomes `ObjectProperty { key: a, value: AssignmentPattern { left: a', right } }`.
    fn lower_object_assignment(&mut self, node: Node, parent: NodeId, field: Option<&'static str>) {
        let (Some(left), right) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        if left.kind() != "shorthand_property_identifier_pattern" {
            // Destructuring target with a default: same shape as assignment_pattern.
            let id = self.push(Some(parent), field, "AssignmentPattern".to_string(), node.byte_range());
            self.lower(left, node.kind(), id, Some("left"));
            if let Some(right) = right {
                self.lower(right, node.kind(), id, Some("right"));
            }
            return;
        }

        let property = self.push(Some(parent), field, "ObjectProperty".to_string(), node.byte_range());
        self.push_identifier(property, Some("key"), left, false);
        let assignment = self.push(
            Some(property),
            Some("value"),
            "AssignmentPattern".to_string(),
            node.byte_range(),
        );
        self.push_identifier(assignment, Some("left"), left, true);
        if let Some(right) = right {
            self.lower(right, node.kind(), assignment, Some("right"));
        }
    }

    /// TypeScript parameters lower to their pattern; type annotations are dropped.
    /// A `this: T` parameter only types the receiver and binds nothing.
    fn lower_typed_parameter(&mut self, node: Node, parent: NodeId, field: Option<&'static str>) {
        let Some(pattern) = node.child_by_field_name("pattern") else {
            return;
        };
        if pattern.kind() == "this" {
            return;
        }
        match node.child_by_field_name("value") {
            Some(value) => {
                let id = self.push(Some(parent), field, "AssignmentPattern".to_string(), node.byte_range());
                self.lower(pattern, node.kind(), id, Some("left"));
                self.lower(value, node.kind(), id, Some("right"));
            }
            None => self.lower(pattern, node.kind(), parent, field),
        }
    }

    /// Arrays keep their holes as `None` slots.
    fn lower_array(&mut self, node: Node, parent_kind: &str, parent: NodeId, field: Option<&'static str>) {
        let kind = node.kind();
        let id = self.push(Some(parent), field, babel_type(node, parent_kind), node.byte_range());
        let mut slots = Vec::new();
        let mut expecting = true;

        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                match child.kind() {
                    "," => {
                        if expecting {
                            slots.push(None);
                        }
                        expecting = true;
                    }
                    "comment" => {}
                    _ if child.is_named() => {
                        let before = self.nodes[id.0].children.len();
                        self.lower(child, kind, id, babel_field(kind, cursor.field_name()));
                        slots.push(self.nodes[id.0].children.get(before).copied());
                        expecting = false;
                    }
                    _ => {}
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        self.nodes[id.0].elements = Some(slots);
    }

    /// `for (const x of y)` gets the `VariableDeclaration > VariableDeclarator` Babel has.
    fn lower_for_in(&mut self, node: Node, parent_kind: &str, parent: NodeId, field: Option<&'static str>) {
        let kind = node.kind();
        let id = self.push(Some(parent), field, babel_type(node, parent_kind), node.byte_range());
        let declaration_kind = node.child_by_field_name("kind");

        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let child_field = cursor.field_name();
            if child.is_named() {
                match (child_field, declaration_kind) {
                    (Some("left"), Some(keyword)) => {
                        let declaration = self.push(
                            Some(id),
                            Some("left"),
                            "VariableDeclaration".to_string(),
                            keyword.start_byte()..child.end_byte(),
                        );
                        let declarator = self.push(
                            Some(declaration),
                            Some("declarations"),
                            "VariableDeclarator".to_string(),
                            child.byte_range(),
                        );
                        self.lower(child, "variable_declarator", declarator, Some("id"));
                    }
                    _ => self.lower(child, kind, id, babel_field(kind, child_field)),
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case_fallback() {
        assert_eq!(pascal_case("computed_property_name"), "ComputedPropertyName");
        assert_eq!(pascal_case("jsx_namespace_name"), "JsxNamespaceName");
    }

    #[test]
    fn test_jsx_names_only_for_tags_and_attributes() {
        assert!(is_jsx_name_parent("jsx_opening_element"));
        assert!(is_jsx_name_parent("jsx_attribute"));
        assert!(!is_jsx_name_parent("jsx_expression"));
    }

    #[test]
    fn test_jsx_expression_identifiers() {
        let tree = crate::syntax::parse("const el = <div className={cls}>{count}</div>;").unwrap();
        let named = |name: &str| {
            tree.real_nodes()
                .into_iter()
                .filter(|&id| tree.node(id).name.as_deref() == Some(name))
                .map(|id| tree.node(id).node_type.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(named("count"), vec!["Identifier"]);
        assert_eq!(named("cls"), vec!["Identifier"]);
        assert_eq!(named("div"), vec!["JSXIdentifier", "JSXIdentifier"]);
        assert_eq!(named("className"), vec!["JSXIdentifier"]);
    }

    #[test]
    fn test_babel_field_renames() {
        assert_eq!(babel_field("variable_declarator", Some("name")), Some("id"));
        assert_eq!(babel_field("variable_declarator", Some("value")), Some("init"));
        assert_eq!(babel_field("pair", Some("value")), Some("value"));
        assert_eq!(babel_field("rest_pattern", None), Some("argument"));
        assert_eq!(babel_field("arrow_function", Some("parameter")), Some("params"));
        assert_eq!(babel_field("binary_expression", None), None);
    }
}
