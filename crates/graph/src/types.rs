use madl_segmenter::{SourceUnit, UnitId};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node in the call graph: one extracted unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    pub unit_id: UnitId,
    pub name: String,
    pub file_path: String,
}

impl CallNode {
    pub fn from_unit(unit: &SourceUnit) -> Self {
        Self {
            unit_id: unit.id.clone(),
            name: unit.name.clone(),
            file_path: unit.file_path.clone(),
        }
    }
}

/// Edge in the call graph: caller → callee, resolved from one `calls_out` token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    /// Token as it appeared in the caller's body
    pub call_name: String,
}

/// Node/edge totals for run reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

/// Approximate call graph over the units of one scan
#[derive(Debug)]
pub struct CallGraph {
    /// Directed graph (caller -> callee)
    pub graph: DiGraph<CallNode, CallEdge>,

    /// Unit id -> NodeIndex
    unit_index: HashMap<UnitId, NodeIndex>,

    /// Unit name -> NodeIndex; the last unit added under a name wins
    name_index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            unit_index: HashMap::new(),
            name_index: HashMap::new(),
        }
    }

    /// Add node to graph; returns `None` if the unit id is already present
    pub fn add_node(&mut self, node: CallNode) -> Option<NodeIndex> {
        if self.unit_index.contains_key(&node.unit_id) {
            return None;
        }
        let unit_id = node.unit_id.clone();
        let name = node.name.clone();

        let idx = self.graph.add_node(node);
        self.unit_index.insert(unit_id, idx);
        self.name_index.insert(name, idx);
        Some(idx)
    }

    /// Add edge between nodes
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: CallEdge) {
        self.graph.add_edge(from, to, edge);
    }

    /// Find node by unit id
    pub fn find_unit(&self, unit_id: &UnitId) -> Option<NodeIndex> {
        self.unit_index.get(unit_id).copied()
    }

    /// Resolve a call token to the unit registered last under that name
    pub fn resolve(&self, name: &str) -> Option<NodeIndex> {
        self.name_index.get(name).copied()
    }

    /// Get node data
    pub fn get_node(&self, idx: NodeIndex) -> Option<&CallNode> {
        self.graph.node_weight(idx)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &CallNode)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|node| (idx, node)))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
        }
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}
