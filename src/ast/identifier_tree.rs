//! Merged ancestor chains of identifier occurrences.
//!
//! Every selected identifier contributes the chain of syntax nodes from the
//! top of the tree down to itself. Chains that share a prefix (by node
//! identity) share the corresponding tree nodes, so the result shows where
//! occurrences of the same names meet.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::syntax::{NodeId, SyntaxNode, SyntaxTree};

// ============ Filters ============

/// Which ancestor types a chain keeps. The identifier itself is always kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TypePolicy {
    #[default]
    All,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
}

impl TypePolicy {
    /// Build from optional include / exclude lists; supplying both is an error.
    pub fn from_lists(include: Option<Vec<String>>, exclude: Option<Vec<String>>) -> Result<Self> {
        match (include, exclude) {
            (Some(_), Some(_)) => Err(AnalysisError::ConflictingTypeFilters),
            (Some(types), None) => Ok(Self::Include(types.into_iter().collect())),
            (None, Some(types)) => Ok(Self::Exclude(types.into_iter().collect())),
            (None, None) => Ok(Self::All),
        }
    }

    pub fn keeps(&self, node_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(types) => types.contains(node_type),
            Self::Exclude(types) => !types.contains(node_type),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeFilter {
    /// Identifier names to follow; `None` follows every identifier.
    pub identifiers: Option<HashSet<String>>,
    pub types: TypePolicy,
}

impl TreeFilter {
    pub fn new(
        identifiers: Option<Vec<String>>,
        include: Option<Vec<String>>,
        exclude: Option<Vec<String>>,
    ) -> Result<Self> {
        Ok(Self {
            identifiers: identifiers.map(|names| names.into_iter().collect()),
            types: TypePolicy::from_lists(include, exclude)?,
        })
    }

    fn selects(&self, node: &SyntaxNode) -> bool {
        if !node.is_identifier() || node.synthetic {
            return false;
        }
        match (&self.identifiers, node.name.as_deref()) {
            (None, _) => true,
            (Some(names), Some(name)) => names.contains(name),
            (Some(_), None) => false,
        }
    }
}

// ============ Tree ============

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierTreeNode {
    /// Syntax node this tree node stands for; `None` only for the root.
    pub ancestor: Option<NodeId>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Prefix tree of identifier chains; node `0` is the root.
#[derive(Debug, Clone)]
pub struct IdentifierTree<'t> {
    syntax: &'t SyntaxTree,
    nodes: Vec<IdentifierTreeNode>,
}

/// Leaves of an [`IdentifierTree`], nested like the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary<T> {
    Leaf(T),
    Branch(Vec<Summary<T>>),
}

impl<'t> IdentifierTree<'t> {
    pub fn build(syntax: &'t SyntaxTree, filter: &TreeFilter) -> Self {
        let mut tree = Self {
            syntax,
            nodes: vec![IdentifierTreeNode {
                ancestor: None,
                parent: None,
                children: Vec::new(),
            }],
        };
        for chain in chains(syntax, filter) {
            tree.insert(&chain);
        }
        tree
    }

    fn insert(&mut self, chain: &[NodeId]) {
        let mut current = 0;
        for &ancestor in chain {
            let existing = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].ancestor == Some(ancestor));
            current = match existing {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(IdentifierTreeNode {
                        ancestor: Some(ancestor),
                        parent: Some(current),
                        children: Vec::new(),
                    });
                    self.nodes[current].children.push(child);
                    child
                }
            };
        }
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, index: usize) -> &IdentifierTreeNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    /// Syntax node behind a tree node.
    pub fn syntax_node(&self, index: usize) -> Option<&'t SyntaxNode> {
        let syntax = self.syntax;
        self.nodes[index].ancestor.map(|id| syntax.node(id))
    }

    /// Collapse to leaves mapped by `mapper`; singleton lists are unwrapped at the top.
    pub fn summary<T, F>(&self, mut mapper: F) -> Summary<T>
    where
        F: FnMut(Option<&SyntaxNode>) -> T,
    {
        let mut summary = self.collapse(0, &mut mapper);
        loop {
            match summary {
                Summary::Branch(mut items) if items.len() == 1 => summary = items.remove(0),
                other => return other,
            }
        }
    }

    fn collapse<T, F>(&self, index: usize, mapper: &mut F) -> Summary<T>
    where
        F: FnMut(Option<&SyntaxNode>) -> T,
    {
        let children = &self.nodes[index].children;
        if children.is_empty() {
            return Summary::Leaf(mapper(self.syntax_node(index)));
        }
        Summary::Branch(
            children
                .iter()
                .map(|&child| self.collapse(child, mapper))
                .collect(),
        )
    }

    /// Leaf identifier names.
    pub fn names(&self) -> Summary<String> {
        self.summary(|node| node.and_then(|n| n.name.clone()).unwrap_or_default())
    }
}

/// Root-to-identifier chains in pre-order of the identifiers.
pub fn chains(syntax: &SyntaxTree, filter: &TreeFilter) -> Vec<Vec<NodeId>> {
    syntax
        .real_nodes()
        .into_iter()
        .filter(|&id| filter.selects(syntax.node(id)))
        .map(|id| {
            let mut chain: Vec<NodeId> = syntax
                .ancestors(id)
                .filter(|&ancestor| {
                    let node = syntax.node(ancestor);
                    !node.synthetic && filter.types.keeps(&node.node_type)
                })
                .collect();
            chain.reverse();
            chain.push(id);
            chain
        })
        .collect()
}
