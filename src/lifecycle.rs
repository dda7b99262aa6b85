//! Lifecycle trees: the full nesting of syntax nodes, reduced to type and lines.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::syntax::{self, NodeId, SourceLocation, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleInfo {
    /// First line of the node.
    pub start: usize,
    /// Last line of the node.
    pub end: usize,
    #[serde(rename = "type")]
    pub node_type: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleNode {
    pub node: LifecycleInfo,
    pub children: Vec<LifecycleNode>,
}

impl LifecycleNode {
    /// Number of nodes in this subtree, itself included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(LifecycleNode::count).sum::<usize>()
    }
}

/// Append-only registry: records in visit order, looked up by syntax node.
#[derive(Default)]
struct Registry {
    index: HashMap<NodeId, usize>,
    records: Vec<(LifecycleInfo, Vec<usize>)>,
}

impl Registry {
    fn add(&mut self, tree: &SyntaxTree, id: NodeId) -> usize {
        let node = tree.node(id);
        let record = self.records.len();
        self.records.push((
            LifecycleInfo {
                start: node.loc.start.line,
                end: node.loc.end.line,
                node_type: node.node_type.clone(),
                loc: node.loc,
            },
            Vec::new(),
        ));
        self.index.insert(id, record);
        record
    }

    fn find(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn materialize(&self, record: usize) -> LifecycleNode {
        let (info, children) = &self.records[record];
        LifecycleNode {
            node: info.clone(),
            children: children.iter().map(|&child| self.materialize(child)).collect(),
        }
    }
}

/// Lifecycle tree rooted at the first real node (`Program` for a parsed file).
pub fn lifecycle_tree(tree: &SyntaxTree) -> LifecycleNode {
    let mut registry = Registry::default();
    for id in tree.real_nodes() {
        let record = registry.add(tree, id);
        if let Some(parent) = tree.node(id).parent.and_then(|parent| registry.find(parent)) {
            registry.records[parent].1.push(record);
        }
    }
    registry.materialize(0)
}

pub fn lifecycle_data(source: &str) -> Result<LifecycleNode> {
    let tree = syntax::parse(source)?;
    Ok(lifecycle_tree(&tree))
}
