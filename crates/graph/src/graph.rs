use crate::error::{GraphError, Result};
use crate::types::CallGraph;
use madl_segmenter::UnitId;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

impl CallGraph {
    /// Units the given unit calls (outgoing edges)
    pub fn get_callees(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph.edges(node).map(|e| e.target()).collect()
    }

    /// Units that call the given unit (incoming edges)
    pub fn get_callers(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| e.source())
            .collect()
    }

    /// Find all nodes reachable from `node` along call edges (either direction)
    /// within `max_depth` hops. Returns `(NodeIndex, distance)` in breadth-first order.
    pub fn get_related_nodes(&self, node: NodeIndex, max_depth: usize) -> Vec<(NodeIndex, usize)> {
        let mut visited = HashSet::from([node]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([(node, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            let neighbors = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .chain(self.graph.neighbors_directed(current, Direction::Incoming));
            for next in neighbors {
                if visited.insert(next) {
                    result.push((next, depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        result
    }

    /// Ids of units related to `unit_id` within `max_depth` hops
    pub fn related_units(&self, unit_id: &UnitId, max_depth: usize) -> Result<Vec<UnitId>> {
        let node = self
            .find_unit(unit_id)
            .ok_or_else(|| GraphError::NodeNotFound(unit_id.to_string()))?;

        Ok(self
            .get_related_nodes(node, max_depth)
            .into_iter()
            .filter_map(|(idx, _)| self.get_node(idx).map(|n| n.unit_id.clone()))
            .collect())
    }
}
