use crate::error::{GraphError, Result};
use crate::types::{CallEdge, CallGraph, CallNode};
use madl_segmenter::{SourceUnit, UnitId};
use petgraph::graph::NodeIndex;

/// Builds the call graph and fills `calls_in` on every unit of a scan
#[derive(Debug, Default, Clone, Copy)]
pub struct CallGraphBuilder;

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the graph from all units of one scan.
    ///
    /// Call tokens resolve by bare name through a name → unit lookup in which the
    /// last unit with a given name wins; earlier namesakes receive no incoming edges.
    /// Existing `calls_in` entries are cleared first so rebuilding is safe.
    pub fn build(&self, units: &mut [SourceUnit]) -> Result<CallGraph> {
        let mut graph = CallGraph::new();

        // Phase 1: one node per unit, in slice order
        let mut nodes: Vec<NodeIndex> = Vec::with_capacity(units.len());
        for unit in units.iter_mut() {
            unit.clear_callers();
            let idx = graph
                .add_node(CallNode::from_unit(unit))
                .ok_or_else(|| GraphError::DuplicateUnit(unit.id.to_string()))?;
            nodes.push(idx);
        }

        // Phase 2: resolve outgoing calls
        let mut incoming: Vec<(usize, UnitId)> = Vec::new();
        for (caller_pos, unit) in units.iter().enumerate() {
            let from = nodes[caller_pos];
            for call in &unit.calls_out {
                let Some(to) = graph.resolve(call) else {
                    continue;
                };
                graph.add_edge(
                    from,
                    to,
                    CallEdge {
                        call_name: call.clone(),
                    },
                );
                incoming.push((to.index(), unit.id.clone()));
            }
        }

        // Phase 3: mirror edges into calls_in (node index == slice position)
        for (callee_pos, caller) in incoming {
            units[callee_pos].add_caller(&caller);
        }

        log::info!(
            "Built call graph: {} units, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madl_segmenter::{Language, Segmenter};
    use pretty_assertions::assert_eq;

    fn units(code: &str) -> Vec<SourceUnit> {
        Segmenter::default().segment(code, "app.py", Language::Python)
    }

    #[test]
    fn caller_appears_in_callee_calls_in() {
        let mut units = units("def a():\n    return 1\n\ndef b():\n    return a()\n");
        let graph = CallGraphBuilder::new().build(&mut units).unwrap();

        let (a, b) = (&units[0], &units[1]);
        assert_eq!(a.calls_in(), &[b.id.clone()]);
        assert!(b.calls_out.contains(&"a".to_string()));
        assert!(b.calls_in().is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn unresolved_calls_add_no_edges() {
        let mut units = units("def a():\n    print(len([]))\n");
        let graph = CallGraphBuilder::new().build(&mut units).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(units[0].calls_in().is_empty());
    }

    #[test]
    fn name_collision_resolves_to_last_unit() {
        let code = "\
class A:
    def save(self):
        pass

class B:
    def save(self):
        pass

def main():
    save()
";
        let mut units = units(code);
        CallGraphBuilder::new().build(&mut units).unwrap();

        assert!(units[0].calls_in().is_empty());
        assert_eq!(units[1].calls_in(), &[units[2].id.clone()]);
    }

    #[test]
    fn rebuild_does_not_duplicate_callers() {
        let mut units = units("def a():\n    pass\n\ndef b():\n    a()\n");
        let builder = CallGraphBuilder::new();
        builder.build(&mut units).unwrap();
        builder.build(&mut units).unwrap();
        assert_eq!(units[0].calls_in().len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut units = units("def a():\n    pass\n");
        units.push(units[0].clone());
        assert!(matches!(
            CallGraphBuilder::new().build(&mut units),
            Err(GraphError::DuplicateUnit(_))
        ));
    }
}
