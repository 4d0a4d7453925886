use crate::config::PipelineConfig;
use crate::error::Result;
use crate::manifest::{write_manifest, ManifestRecord};
use crate::scanner::{SourceFile, TreeWalker};
use crate::stats::{Diagnostic, DiagnosticKind, RunReport};
use madl_annotation::{commit, SyncOutcome, Synchronizer};
use madl_enrich::{
    Annotator, Classifier, EnrichReport, Enricher, IndexSink, JsonlSink, LlmClient, NullSink,
    QuotaLimiter,
};
use madl_graph::{CallGraph, CallGraphBuilder};
use madl_segmenter::{Segmenter, SourceUnit};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A file read and segmented during the scan phase
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub file: SourceFile,
    /// Text the units were extracted from
    pub text: String,
    pub units: Vec<SourceUnit>,
}

/// Result of walk + segment + call graph
#[derive(Debug)]
pub struct ScanOutput {
    pub files: Vec<ParsedFile>,
    pub graph: CallGraph,
    pub report: RunReport,
}

impl ScanOutput {
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.files.iter().flat_map(|f| f.units.iter())
    }

    pub fn records(&self) -> Vec<ManifestRecord> {
        self.units().map(ManifestRecord::from).collect()
    }
}

/// Per-file work after the scan phase
#[derive(Default)]
struct FileOutcome {
    units: Vec<SourceUnit>,
    enrich: Vec<EnrichReport>,
    sync: Option<SyncOutcome>,
    indexed: usize,
    diagnostics: Vec<Diagnostic>,
    cancelled: bool,
}

/// Shared handles each file task needs
#[derive(Clone)]
struct FileWorker {
    enricher: Enricher,
    synchronizer: Synchronizer,
    sink: Arc<dyn IndexSink>,
    cancel: Arc<AtomicBool>,
    dry_run: bool,
}

/// Walk → segment → call graph → enrich → synchronize → index
pub struct Pipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    synchronizer: Synchronizer,
    enricher: Enricher,
    sink: Arc<dyn IndexSink>,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Validate `config` and wire up the model client and index sink.
    ///
    /// Fails only on an invalid root or configuration.
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(config.segmenter.clone())?;
        let synchronizer = Synchronizer::new(config.lookback)?;

        let quota = Arc::new(match config.quota {
            Some(limit) => QuotaLimiter::new(limit),
            None => QuotaLimiter::unlimited(),
        });
        let enricher = match LlmClient::from_config(&config.llm)? {
            Some(client) => {
                log::info!("Using model {} at {}", config.llm.model, config.llm.base_url);
                let client = Arc::new(client);
                let classifier: Arc<dyn Classifier> = client.clone();
                let annotator: Arc<dyn Annotator> = client;
                Enricher::new(Some(classifier), Some(annotator), quota)
            }
            None => {
                log::info!("No API key configured, using heuristic classification");
                Enricher::new(None, None, quota)
            }
        };

        let sink: Arc<dyn IndexSink> = match config.index_path() {
            Some(path) => Arc::new(JsonlSink::create(path).await?),
            None => Arc::new(NullSink),
        };

        Ok(Self {
            config,
            segmenter,
            synchronizer,
            enricher,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the classifier/annotator routing
    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn IndexSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Setting the flag stops files that have not started yet
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Walk, segment and build the call graph; nothing is written
    pub async fn scan(&self) -> Result<ScanOutput> {
        let config = self.config.clone();
        let segmenter = self.segmenter.clone();
        tokio::task::spawn_blocking(move || collect(&config, &segmenter)).await?
    }

    /// Full run; writes the manifest and returns the summary
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let ScanOutput {
            files,
            graph,
            mut report,
        } = self.scan().await?;
        report.call_edges = graph.edge_count();

        let worker = FileWorker {
            enricher: self.enricher.clone(),
            synchronizer: self.synchronizer.clone(),
            sink: Arc::clone(&self.sink),
            cancel: Arc::clone(&self.cancel),
            dry_run: self.config.dry_run,
        };
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
        let mut tasks = JoinSet::new();

        for (index, parsed) in files.into_iter().enumerate() {
            if parsed.units.is_empty() {
                continue;
            }
            let worker = worker.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, FileOutcome::untouched(parsed));
                };
                let relative = parsed.file.relative.clone();
                let units = parsed.units.clone();
                // A panic surfaces here as a JoinError for this file only
                match tokio::spawn(async move { worker.process(parsed).await }).await {
                    Ok(outcome) => (index, outcome),
                    Err(e) => {
                        log::warn!("{relative}: file task failed: {e}");
                        (index, FileOutcome::failed(&relative, units, e.to_string()))
                    }
                }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::warn!("File task failed: {e}");
                    report.add_diagnostic(Diagnostic::file(
                        self.config.root.display().to_string(),
                        DiagnosticKind::Task,
                        e.to_string(),
                    ));
                }
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut records = Vec::new();
        for (_, outcome) in outcomes {
            report.reusable += outcome.units.iter().filter(|u| u.is_reusable()).count();
            report.indexed += outcome.indexed;
            report.cancelled |= outcome.cancelled;
            for enrich in &outcome.enrich {
                if let Some(source) = enrich.classified_by {
                    report.add_verdict(source);
                }
            }
            if let Some(sync) = &outcome.sync {
                report.annotations_inserted += sync.inserted.len();
                report.blocks_stripped += sync.stripped.len();
                if sync.changed {
                    report.files_changed += 1;
                }
            }
            report.diagnostics.extend(outcome.diagnostics);
            records.extend(outcome.units.iter().map(ManifestRecord::from));
        }
        report.quota_used = self.enricher.quota().used();

        let manifest = self.config.manifest_path();
        write_manifest(&manifest, &records).await?;
        log::info!("Manifest written to {}", manifest.display());

        report.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Run complete: {} files, {} units, {} reusable, {} inserted, {} stripped in {}ms",
            report.files_scanned,
            report.units,
            report.reusable,
            report.annotations_inserted,
            report.blocks_stripped,
            report.time_ms
        );
        Ok(report)
    }

    /// Remove every recognized annotation block under the root
    pub async fn strip(&self) -> Result<RunReport> {
        let started = Instant::now();
        let config = self.config.clone();
        let synchronizer = self.synchronizer.clone();
        let cancel = Arc::clone(&self.cancel);

        let mut report = tokio::task::spawn_blocking(move || -> Result<RunReport> {
            let walker = TreeWalker::from_config(&config)?;
            let mut report = RunReport::new();

            for file in walker.walk() {
                report.add_file(file.language.as_str());
                if cancel.load(Ordering::SeqCst) {
                    report.cancelled = true;
                    continue;
                }

                let text = match std::fs::read_to_string(&file.path) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("Failed to read {}: {e}", file.path.display());
                        report.add_diagnostic(Diagnostic::file(
                            &file.relative,
                            DiagnosticKind::Read,
                            e.to_string(),
                        ));
                        continue;
                    }
                };

                let outcome = synchronizer.strip_text(&text, file.language);
                if !outcome.changed {
                    continue;
                }
                report.blocks_stripped += outcome.stripped.len();
                report.files_changed += 1;
                if config.dry_run {
                    continue;
                }
                if let Err(e) = commit(&file.path, &outcome.text) {
                    log::warn!("Failed to write {}: {e}", file.path.display());
                    report.add_diagnostic(Diagnostic::file(
                        &file.relative,
                        DiagnosticKind::Write,
                        e.to_string(),
                    ));
                }
            }
            Ok(report)
        })
        .await??;

        report.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Stripped {} blocks from {} files",
            report.blocks_stripped,
            report.files_changed
        );
        Ok(report)
    }
}

fn collect(config: &PipelineConfig, segmenter: &Segmenter) -> Result<ScanOutput> {
    let walker = TreeWalker::from_config(config)?;
    let mut report = RunReport::new();
    let mut files = Vec::new();

    for file in walker.walk() {
        report.add_file(file.language.as_str());
        let text = match std::fs::read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to read {}: {e}", file.path.display());
                report.add_diagnostic(Diagnostic::file(
                    &file.relative,
                    DiagnosticKind::Read,
                    e.to_string(),
                ));
                continue;
            }
        };
        let units = segmenter.segment(&text, &file.relative, file.language);
        log::debug!("{}: {} units", file.relative, units.len());
        report.units += units.len();
        files.push(ParsedFile { file, text, units });
    }
    log::info!("Extracted {} units from {} files", report.units, files.len());

    // The builder needs every unit in one slice; hand them back per file afterwards
    let counts: Vec<usize> = files.iter().map(|f| f.units.len()).collect();
    let mut units: Vec<SourceUnit> = files
        .iter_mut()
        .flat_map(|f| std::mem::take(&mut f.units))
        .collect();

    let graph = match CallGraphBuilder::new().build(&mut units) {
        Ok(graph) => graph,
        Err(e) => {
            log::warn!("Call graph skipped: {e}");
            report.add_diagnostic(Diagnostic::file(
                config.root.display().to_string(),
                DiagnosticKind::Graph,
                e.to_string(),
            ));
            CallGraph::default()
        }
    };

    let mut units = units.into_iter();
    for (file, count) in files.iter_mut().zip(counts) {
        file.units = units.by_ref().take(count).collect();
    }

    Ok(ScanOutput {
        files,
        graph,
        report,
    })
}

impl FileOutcome {
    fn untouched(parsed: ParsedFile) -> Self {
        Self {
            diagnostics: vec![Diagnostic::file(
                &parsed.file.relative,
                DiagnosticKind::Cancelled,
                "left untouched",
            )],
            units: parsed.units,
            cancelled: true,
            ..Default::default()
        }
    }

    fn failed(relative: &str, units: Vec<SourceUnit>, message: String) -> Self {
        Self {
            diagnostics: vec![Diagnostic::file(relative, DiagnosticKind::Task, message)],
            units,
            ..Default::default()
        }
    }
}

impl FileWorker {
    /// Enrich units sequentially, then strip/insert/commit the file, then index
    async fn process(&self, parsed: ParsedFile) -> FileOutcome {
        if self.cancel.load(Ordering::SeqCst) {
            return FileOutcome::untouched(parsed);
        }
        let ParsedFile { file, mut units, .. } = parsed;
        let mut outcome = FileOutcome::default();

        for unit in &mut units {
            let report = self.enricher.enrich(unit).await;
            for error in &report.errors {
                outcome.diagnostics.push(Diagnostic::unit(
                    &file.relative,
                    &unit.id,
                    DiagnosticKind::Enrich,
                    error.clone(),
                ));
            }
            outcome.enrich.push(report);
        }

        if self.cancel.load(Ordering::SeqCst) {
            outcome.units = units;
            outcome.cancelled = true;
            outcome.diagnostics.push(Diagnostic::file(
                &file.relative,
                DiagnosticKind::Cancelled,
                "cancelled before commit",
            ));
            return outcome;
        }

        let synchronizer = self.synchronizer.clone();
        let dry_run = self.dry_run;
        let path = file.path.clone();
        let language = file.language;
        let joined = tokio::task::spawn_blocking(move || {
            // Re-read: the file may have been edited while its units were enriched
            let synced = std::fs::read_to_string(&path).map(|current| {
                let sync = synchronizer.synchronize_text(&current, language, &units);
                let committed = if sync.changed && !dry_run {
                    commit(&path, &sync.text)
                } else {
                    Ok(())
                };
                (sync, committed)
            });
            (units, synced)
        })
        .await;

        let (units, synced) = match joined {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("{}: synchronization task failed: {e}", file.relative);
                outcome.diagnostics.push(Diagnostic::file(
                    &file.relative,
                    DiagnosticKind::Task,
                    e.to_string(),
                ));
                return outcome;
            }
        };
        outcome.units = units;

        match synced {
            Ok((sync, committed)) => {
                for skipped in &sync.skipped {
                    outcome.diagnostics.push(Diagnostic::unit(
                        &file.relative,
                        &skipped.unit_id,
                        DiagnosticKind::Skipped,
                        format!("{}: {}", skipped.name, skipped.reason),
                    ));
                }
                match committed {
                    Ok(()) => outcome.sync = Some(sync),
                    Err(e) => {
                        log::warn!("Failed to write {}: {e}", file.path.display());
                        outcome.diagnostics.push(Diagnostic::file(
                            &file.relative,
                            DiagnosticKind::Write,
                            e.to_string(),
                        ));
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to read {}: {e}", file.path.display());
                outcome.diagnostics.push(Diagnostic::file(
                    &file.relative,
                    DiagnosticKind::Read,
                    e.to_string(),
                ));
            }
        }

        for unit in outcome.units.iter_mut().filter(|u| u.is_reusable()) {
            match self.sink.ingest(unit).await {
                Ok(id) => {
                    unit.index_id = Some(id);
                    outcome.indexed += 1;
                }
                Err(e) => {
                    log::warn!("{}: {} sink failed: {e}", unit.id, self.sink.name());
                    outcome.diagnostics.push(Diagnostic::unit(
                        &file.relative,
                        &unit.id,
                        DiagnosticKind::Index,
                        e.to_string(),
                    ));
                }
            }
        }

        outcome
    }
}
