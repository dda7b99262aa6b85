//! Names bound inside a function and where they occur.

use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::normalize::NameMatcher;
use crate::ast::pattern::{decompose, Extracted, Pattern};
use crate::error::Result;
use crate::syntax::{EditorRange, NodeId, SyntaxTree};

/// One identifier token referring to a known name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameOccurrence {
    /// The bound name, without the rest prefix.
    pub name: String,
    pub range: EditorRange,
}

/// Parameter and declaration bindings of one function (or of a whole program).
#[derive(Debug, Clone)]
pub struct Bindings<'t> {
    tree: &'t SyntaxTree,
    scope: NodeId,
    parameters: Vec<Extracted>,
    declarations: Vec<Vec<Extracted>>,
}

impl<'t> Bindings<'t> {
    /// Collect bindings of `scope`: its own parameters, and every variable
    /// declaration below it in pre-order (nested functions included).
    pub fn of(tree: &'t SyntaxTree, scope: NodeId) -> Result<Self> {
        let parameters = tree
            .children_by_field(scope, "params")
            .map(|param| Pattern::from_node(tree, param).map(|pattern| decompose(&pattern)))
            .collect::<Result<Vec<_>>>()?;

        let declarations = declarations(tree, scope)
            .into_iter()
            .map(|declaration| {
                declarators(tree, declaration)
                    .filter_map(|declarator| tree.child_by_field(declarator, "id"))
                    .map(|id| Pattern::from_node(tree, id).map(|pattern| decompose(&pattern)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tree,
            scope,
            parameters,
            declarations,
        })
    }

    /// One entry per parameter.
    pub fn parameters(&self) -> &[Extracted] {
        &self.parameters
    }

    /// One list per `let`/`const`/`var` statement, one entry per declarator.
    pub fn declarations(&self) -> &[Vec<Extracted>] {
        &self.declarations
    }

    pub fn has_declarations(&self) -> bool {
        !self.declarations.is_empty()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().flat_map(Extracted::flatten).collect()
    }

    pub fn declaration_names(&self) -> Vec<String> {
        self.declarations
            .iter()
            .flatten()
            .flat_map(Extracted::flatten)
            .collect()
    }

    /// Parameter names followed by declared names.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.parameter_names();
        names.extend(self.declaration_names());
        names
    }

    /// Every non-synthetic identifier in the scope matching one of [`Self::names`].
    pub fn occurrences(&self) -> Vec<NameOccurrence> {
        self.occurrences_of(&NameMatcher::new(self.names()))
    }

    /// Identifiers in the scope known to `matcher`, in pre-order.
    pub fn occurrences_of(&self, matcher: &NameMatcher) -> Vec<NameOccurrence> {
        self.tree
            .descendants(self.scope)
            .into_iter()
            .filter_map(|id| {
                let node = self.tree.node(id);
                if !node.is_identifier() || node.synthetic {
                    return None;
                }
                let name = matcher.matches(node.name.as_deref()?)?;
                Some(NameOccurrence {
                    name: name.to_string(),
                    range: node.loc.editor_range(),
                })
            })
            .collect()
    }

    /// Ranges per name for identifiers matching `names`.
    ///
    /// With `sort`, each list is ordered by ascending line and then by
    /// descending column, keeping source order for ties.
    pub fn occurrences_by_name(&self, names: &[String], sort: bool) -> IndexMap<String, Vec<EditorRange>> {
        let mut by_name: IndexMap<String, Vec<EditorRange>> = IndexMap::new();
        for occurrence in self.occurrences_of(&NameMatcher::new(names)) {
            by_name.entry(occurrence.name).or_default().push(occurrence.range);
        }
        if sort {
            for ranges in by_name.values_mut() {
                ranges.sort_by(|a, b| a[0].cmp(&b[0]).then(b[1].cmp(&a[1])));
            }
        }
        by_name
    }
}

/// `VariableDeclaration` nodes below `scope`, in pre-order.
pub fn declarations(tree: &SyntaxTree, scope: NodeId) -> Vec<NodeId> {
    tree.descendants(scope)
        .into_iter()
        .filter(|&id| tree.node(id).is("VariableDeclaration"))
        .collect()
}

pub fn declarators(tree: &SyntaxTree, declaration: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.children_by_field(declaration, "declarations")
}
