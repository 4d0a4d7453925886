use async_trait::async_trait;
use madl_annotation::{END_SENTINEL, START_SENTINEL};
use madl_enrich::{Annotator, Classifier, Enricher, QuotaLimiter};
use madl_pipeline::{
    read_manifest, DiagnosticKind, Pipeline, PipelineConfig, PipelineError,
};
use madl_segmenter::{Annotation, Classification, SourceUnit, VerdictSource};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const UTIL_PY: &str = r#"import os


def add(a, b):
    return a + b


def save(path, data):
    with open(path, "w") as fh:
        fh.write(data)


def total(items):
    return add(items[0], items[1])
"#;

const MATH_GO: &str = "package util\n\nfunc Double(x int) int {\n\treturn x * 2\n}\n";

const CONSTANTS_PY: &str = "LIMIT = 10\nNAME = \"madl\"\n";

fn project() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(temp.path().join("pkg")).expect("create pkg");
    std::fs::write(temp.path().join("pkg/util.py"), UTIL_PY).expect("write util");
    std::fs::write(temp.path().join("pkg/math.go"), MATH_GO).expect("write go");
    std::fs::write(temp.path().join("constants.py"), CONSTANTS_PY).expect("write constants");
    temp
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).expect("read back")
}

fn line_before<'a>(text: &'a str, needle: &str) -> &'a str {
    let lines: Vec<&str> = text.lines().collect();
    let at = lines
        .iter()
        .position(|line| line.starts_with(needle))
        .expect("definition present");
    lines[at - 1]
}

#[tokio::test]
async fn heuristic_run_annotates_reusable_units() {
    let temp = project();
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .expect("pipeline");
    let report = pipeline.run().await.expect("run");

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.units, 4);
    assert_eq!(report.reusable, 3);
    assert_eq!(report.annotations_inserted, 3);
    assert_eq!(report.files_changed, 2);
    assert_eq!(report.call_edges, 1);
    assert_eq!(report.model_verdicts, 0);
    assert_eq!(report.fallback_verdicts, 4);
    assert_eq!(report.quota_used, 0);
    assert_eq!(report.indexed, 3);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let util = read(temp.path(), "pkg/util.py");
    assert_eq!(util.matches(START_SENTINEL).count(), 2);
    assert_eq!(line_before(&util, "def add("), format!("# {END_SENTINEL}"));
    assert_eq!(line_before(&util, "def total("), format!("# {END_SENTINEL}"));
    assert_eq!(line_before(&util, "def save("), "");

    let go = read(temp.path(), "pkg/math.go");
    assert_eq!(line_before(&go, "func Double("), format!("// {END_SENTINEL}"));

    assert_eq!(read(temp.path(), "constants.py"), CONSTANTS_PY);

    let manifest = read_manifest(&pipeline.config().manifest_path())
        .await
        .expect("manifest");
    assert_eq!(manifest.len(), 4);
    let add = manifest.iter().find(|r| r.name == "add").expect("add record");
    assert_eq!(add.calls_in.len(), 1);
    assert!(add.calls_in[0].as_str().contains("::total::"));
    assert_eq!(add.verdict_source, Some(VerdictSource::Heuristic));
    assert!(add.index_id.as_deref().is_some_and(|id| id.starts_with("vec_")));
    let save = manifest.iter().find(|r| r.name == "save").expect("save record");
    assert!(!save.reusable);
    assert!(save.annotation.is_none());
    assert!(save.index_id.is_none());
}

#[tokio::test]
async fn second_run_is_byte_identical() {
    let temp = project();
    let config = PipelineConfig::for_root(temp.path());

    Pipeline::new(config.clone()).await.unwrap().run().await.unwrap();
    let util = read(temp.path(), "pkg/util.py");
    let go = read(temp.path(), "pkg/math.go");

    let report = Pipeline::new(config).await.unwrap().run().await.unwrap();
    assert_eq!(read(temp.path(), "pkg/util.py"), util);
    assert_eq!(read(temp.path(), "pkg/math.go"), go);
    assert_eq!(report.files_changed, 0);
    assert_eq!(report.blocks_stripped, 3);
    assert_eq!(report.annotations_inserted, 3);
}

#[tokio::test]
async fn dry_run_leaves_sources_untouched() {
    let temp = project();
    let config = PipelineConfig {
        dry_run: true,
        ..PipelineConfig::for_root(temp.path())
    };
    let report = Pipeline::new(config).await.unwrap().run().await.unwrap();

    assert_eq!(report.files_changed, 2);
    assert_eq!(read(temp.path(), "pkg/util.py"), UTIL_PY);
    assert_eq!(read(temp.path(), "pkg/math.go"), MATH_GO);
}

#[tokio::test]
async fn only_zero_unit_files_give_an_empty_manifest() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("constants.py"), CONSTANTS_PY).unwrap();

    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap();
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.units, 0);
    assert_eq!(report.files_changed, 0);
    assert_eq!(read(temp.path(), "constants.py"), CONSTANTS_PY);
    let manifest = read_manifest(&pipeline.config().manifest_path()).await.unwrap();
    assert!(manifest.is_empty());
}

#[tokio::test]
async fn cancelled_run_touches_nothing() {
    let temp = project();
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap();
    pipeline.cancel_flag().store(true, Ordering::SeqCst);

    let report = pipeline.run().await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.files_changed, 0);
    assert_eq!(report.diagnostics_of(DiagnosticKind::Cancelled).count(), 2);
    assert_eq!(read(temp.path(), "pkg/util.py"), UTIL_PY);
}

#[tokio::test]
async fn invalid_root_aborts() {
    let temp = TempDir::new().unwrap();
    let result = Pipeline::new(PipelineConfig::for_root(temp.path().join("missing"))).await;
    assert!(matches!(result, Err(PipelineError::InvalidRoot(_))));
}

/// Counts calls and approves everything
#[derive(Default)]
struct CountingModel {
    calls: AtomicUsize,
}

#[async_trait]
impl Classifier for CountingModel {
    async fn classify(&self, _unit: &SourceUnit) -> madl_enrich::Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification::new(true, "model", 0.9, VerdictSource::Model))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[async_trait]
impl Annotator for CountingModel {
    async fn annotate(&self, unit: &SourceUnit) -> madl_enrich::Result<Annotation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Annotation {
            method_name: unit.name.clone(),
            intent: "from model".to_string(),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[tokio::test]
async fn zero_quota_completes_with_fallback_annotations() {
    let temp = project();
    let model = Arc::new(CountingModel::default());
    let enricher = Enricher::new(
        Some(model.clone()),
        Some(model.clone()),
        Arc::new(QuotaLimiter::new(0)),
    );
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap()
        .with_enricher(enricher);

    let report = pipeline.run().await.unwrap();
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.model_verdicts, 0);
    assert_eq!(report.fallback_verdicts, 4);
    assert_eq!(report.annotations_inserted, 3);

    let util = read(temp.path(), "pkg/util.py");
    assert!(util.contains("Auto-generated intent for add."));
    assert!(!util.contains("from model"));
}

#[tokio::test]
async fn strip_removes_every_block() {
    let temp = project();
    let config = PipelineConfig::for_root(temp.path());
    Pipeline::new(config.clone()).await.unwrap().run().await.unwrap();

    let report = Pipeline::new(config).await.unwrap().strip().await.unwrap();
    assert_eq!(report.blocks_stripped, 3);
    assert_eq!(report.files_changed, 2);
    assert_eq!(read(temp.path(), "pkg/util.py"), UTIL_PY);
    assert_eq!(read(temp.path(), "pkg/math.go"), MATH_GO);
}

#[tokio::test]
async fn scan_resolves_calls_without_writing() {
    let temp = project();
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap();
    let scan = pipeline.scan().await.unwrap();

    assert_eq!(scan.graph.edge_count(), 1);
    let records = scan.records();
    assert_eq!(
        records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["Double", "add", "save", "total"]
    );
    assert!(records.iter().all(|r| r.verdict_source.is_none()));
    assert!(!pipeline.config().manifest_path().exists());
    assert_eq!(read(temp.path(), "pkg/util.py"), UTIL_PY);
}

#[tokio::test]
async fn index_path_writes_one_document_per_reusable_unit() {
    let temp = project();
    let config = PipelineConfig {
        index_path: Some("out/index.jsonl".into()),
        ..PipelineConfig::for_root(temp.path())
    };
    let report = Pipeline::new(config).await.unwrap().run().await.unwrap();

    let index = read(temp.path(), "out/index.jsonl");
    assert_eq!(index.lines().count(), report.reusable);
}

/// Saves an edit to the file being processed while its first unit is classified
struct EditingModel {
    root: std::path::PathBuf,
    edited: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl Classifier for EditingModel {
    async fn classify(&self, unit: &SourceUnit) -> madl_enrich::Result<Classification> {
        if !self.edited.swap(true, Ordering::SeqCst) {
            let path = self.root.join(&unit.file_path);
            let mut text = std::fs::read_to_string(&path).expect("read source");
            text.push_str("USER_EDIT = 1\n");
            std::fs::write(&path, text).expect("write edit");
        }
        Ok(Classification::new(true, "model", 0.9, VerdictSource::Model))
    }

    fn name(&self) -> &str {
        "editing"
    }
}

#[tokio::test]
async fn edits_saved_during_the_run_are_kept() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("u.py"), "def add(a, b):\n    return a + b\n").unwrap();

    let classifier: Arc<dyn Classifier> = Arc::new(EditingModel {
        root: temp.path().to_path_buf(),
        edited: Default::default(),
    });
    let enricher = Enricher::new(Some(classifier), None, Arc::new(QuotaLimiter::unlimited()));
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap()
        .with_enricher(enricher);

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.annotations_inserted, 1);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let text = read(temp.path(), "u.py");
    assert!(text.starts_with(&format!("# {START_SENTINEL}\n")));
    assert!(text.ends_with("def add(a, b):\n    return a + b\nUSER_EDIT = 1\n"));
}

/// Panics on one unit, approves the rest
struct PanickingModel;

#[async_trait]
impl Classifier for PanickingModel {
    async fn classify(&self, unit: &SourceUnit) -> madl_enrich::Result<Classification> {
        if unit.name == "save" {
            panic!("classifier crashed on {}", unit.name);
        }
        Ok(Classification::new(true, "model", 0.9, VerdictSource::Model))
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[tokio::test]
async fn panicking_file_task_is_reported_and_run_completes() {
    let temp = project();
    let classifier: Arc<dyn Classifier> = Arc::new(PanickingModel);
    let enricher = Enricher::new(Some(classifier), None, Arc::new(QuotaLimiter::unlimited()));
    let pipeline = Pipeline::new(PipelineConfig::for_root(temp.path()))
        .await
        .unwrap()
        .with_enricher(enricher);

    let report = pipeline.run().await.expect("run completes");

    let failed: Vec<_> = report.diagnostics_of(DiagnosticKind::Task).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, "pkg/util.py");
    assert_eq!(read(temp.path(), "pkg/util.py"), UTIL_PY);

    let go = read(temp.path(), "pkg/math.go");
    assert_eq!(line_before(&go, "func Double("), format!("// {END_SENTINEL}"));

    let manifest = read_manifest(&pipeline.config().manifest_path()).await.unwrap();
    assert_eq!(manifest.len(), 4);
}
