use madl_annotation::{parse_block, split_lines, BlockFormat, SkipReason, Synchronizer, START_SENTINEL};
use madl_segmenter::{Annotation, Language, Segmenter, SourceUnit};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const LEGACY_PY: &str = r#"import json

# --- MADL ---
# {"method_name": "parse", "intent": "old"}

# --- END MADL ---


def parse(raw):
    return json.loads(raw)

# ====== MADL_METADATA ======
# {"method_name": "dump", "intent": "older"}
# ===========================
def dump(value):
    return json.dumps(value)

# --- MADL ---
# {"method_name": "unused"}
def plain():
    return 1
"#;

fn annotate(units: &mut [SourceUnit], names: &[&str]) {
    for unit in units.iter_mut() {
        if names.contains(&unit.name.as_str()) {
            unit.annotation = Some(Annotation {
                method_name: unit.name.clone(),
                intent: format!("fresh intent for {}", unit.name),
                parameters: unit.signature.clone(),
                ..Default::default()
            });
        }
    }
}

fn count_blocks(text: &str) -> usize {
    text.lines().filter(|l| l.trim_end().ends_with(START_SENTINEL)).count()
}

#[test]
fn legacy_blocks_are_replaced_by_one_current_block_each() {
    let mut units = Segmenter::default().segment(LEGACY_PY, "codec.py", Language::Python);
    annotate(&mut units, &["parse", "dump"]);

    let outcome = Synchronizer::default().synchronize_text(LEGACY_PY, Language::Python, &units);

    let formats: Vec<BlockFormat> = outcome.stripped.iter().map(|b| b.format).collect();
    assert_eq!(
        formats,
        vec![BlockFormat::PaddedDelimited, BlockFormat::Metadata, BlockFormat::OpenJson]
    );
    assert_eq!(outcome.inserted.len(), 2);
    assert_eq!(count_blocks(&outcome.text), 2);
    assert!(!outcome.text.contains("MADL_METADATA"));
    assert!(!outcome.text.contains("\"intent\": \"old\""));

    // Every block parses back and sits directly above its definition
    let lines = split_lines(&outcome.text);
    for (idx, line) in lines.iter().enumerate() {
        if line.trim_end().ends_with(START_SENTINEL) {
            let end = lines[idx..]
                .iter()
                .position(|l| l.contains("--- END MADL ---"))
                .map(|p| idx + p + 1)
                .unwrap();
            let block = parse_block(&lines[idx..end], Language::Python).unwrap();
            assert_eq!(block.format, BlockFormat::Delimited);
            assert!(lines[end].starts_with(&format!("def {}(", block.annotation.method_name)));
        }
    }

    // Code outside blocks is untouched
    let code_before: Vec<&str> = LEGACY_PY.lines().filter(|l| !l.starts_with('#') && !l.trim().is_empty()).collect();
    let code_after: Vec<&str> = outcome.text.lines().filter(|l| !l.starts_with('#') && !l.trim().is_empty()).collect();
    assert_eq!(code_before, code_after);
}

#[test]
fn synchronize_is_idempotent_on_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("codec.py");
    fs::write(&path, LEGACY_PY).unwrap();
    let sync = Synchronizer::default();

    let run = || {
        let text = fs::read_to_string(&path).unwrap();
        let mut units = Segmenter::default().segment(&text, "codec.py", Language::Python);
        annotate(&mut units, &["parse", "dump", "plain"]);
        sync.synchronize_file(&path, Language::Python, &units, false).unwrap()
    };

    let first = run();
    assert!(first.changed);
    let after_first = fs::read(&path).unwrap();

    let second = run();
    assert!(!second.changed);
    assert_eq!(fs::read(&path).unwrap(), after_first);
    assert_eq!(second.inserted.len(), 3);

    // No temp files left behind
    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn renamed_unit_is_reported_and_rest_synchronized() {
    let java = "\
public class Greeter {
    public String hello(String name) {
        return \"hi \" + name;
    }

    public String bye(String name) {
        return \"bye \" + name;
    }
}
";
    let mut units = Segmenter::default().segment(java, "Greeter.java", Language::Java);
    annotate(&mut units, &["hello", "bye"]);

    // The file changed between scan and sync: `bye` became `farewell`
    let edited = java.replace("String bye(", "String farewell(");
    let outcome = Synchronizer::default().synchronize_text(&edited, Language::Java, &units);

    assert_eq!(outcome.inserted, vec![units[0].id.clone()]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "bye");
    assert_eq!(outcome.skipped[0].reason, SkipReason::NotFound);
    assert!(outcome.text.contains("    // --- MADL ---\n    // {\n"));
    assert!(outcome.text.contains("public String farewell(String name)"));
}

#[test]
fn dry_run_does_not_write() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("codec.py");
    fs::write(&path, LEGACY_PY).unwrap();

    let outcome = Synchronizer::default()
        .strip_file(&path, Language::Python, true)
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY_PY);

    Synchronizer::default()
        .strip_file(&path, Language::Python, false)
        .unwrap();
    let stripped = fs::read_to_string(&path).unwrap();
    assert_eq!(count_blocks(&stripped), 0);
    assert!(stripped.contains("def plain():"));
}
