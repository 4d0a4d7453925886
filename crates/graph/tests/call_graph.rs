use madl_graph::CallGraphBuilder;
use madl_segmenter::{Language, Segmenter, SourceUnit};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn scan() -> Vec<SourceUnit> {
    let segmenter = Segmenter::default();
    let mut units = segmenter.segment(
        "\
def load(path):
    return parse(read(path))

def parse(text):
    return tokens(text)

def tokens(text):
    return text.split()
",
        "loader.py",
        Language::Python,
    );
    units.extend(segmenter.segment(
        "\
func main() {
\tload(\"x\")
\ttokens(\"y\")
}
",
        "cmd/main.go",
        Language::Go,
    ));
    units
}

#[test]
fn calls_in_mirrors_calls_out_across_files() {
    let mut units = scan();
    let graph = CallGraphBuilder::new().build(&mut units).unwrap();

    let by_name: HashMap<&str, &SourceUnit> =
        units.iter().map(|u| (u.name.as_str(), u)).collect();

    // Symmetry: every resolved outgoing call has a matching incoming entry
    for caller in &units {
        for call in &caller.calls_out {
            if let Some(callee) = by_name.get(call.as_str()) {
                assert!(callee.calls_in().contains(&caller.id), "{} -> {}", caller.id, call);
            }
        }
    }

    let tokens = by_name["tokens"];
    assert_eq!(
        tokens.calls_in(),
        &[by_name["parse"].id.clone(), by_name["main"].id.clone()]
    );
    assert_eq!(graph.stats().nodes, 4);
    assert_eq!(graph.stats().edges, 4);
}

#[test]
fn callers_callees_and_related_units() {
    let mut units = scan();
    let graph = CallGraphBuilder::new().build(&mut units).unwrap();

    let load = graph.find_unit(&units[0].id).unwrap();
    let parse = graph.resolve("parse").unwrap();
    let main = graph.resolve("main").unwrap();

    assert_eq!(graph.get_callees(load), vec![parse]);
    assert_eq!(graph.get_callers(load), vec![main]);

    let related = graph.related_units(&units[0].id, 1).unwrap();
    assert_eq!(related.len(), 2);
    let related_far = graph.related_units(&units[0].id, 2).unwrap();
    assert_eq!(related_far.len(), 3);

    let missing = madl_segmenter::UnitId::compose("nope.py", None, "x", 1);
    assert!(graph.related_units(&missing, 1).is_err());
}
