use crate::error::{PipelineError, Result};
use madl_annotation::DEFAULT_LOOKBACK;
use madl_enrich::LlmConfig;
use madl_segmenter::{Language, SegmenterConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MAX_PARALLELISM: usize = 16;

/// Default number of external model calls per run
pub const DEFAULT_QUOTA: usize = 10;

/// Files larger than this are never read
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576; // 1 MB

/// Manifest location relative to the root when none is configured
pub const DEFAULT_MANIFEST: &str = ".madl/manifest.json";

/// Everything a run needs; loaded from TOML, then overridden by env and flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub root: PathBuf,

    /// Extension (without dot) → language
    pub extensions: BTreeMap<String, Language>,

    /// Path substrings; entries with glob metacharacters are matched as globs
    pub exclude: Vec<String>,

    /// External call budget; `None` is unlimited
    pub quota: Option<usize>,

    /// Lines above an anchor inspected for a surviving block
    pub lookback: usize,

    pub max_file_size: u64,

    /// Honour `.gitignore` files and skip hidden entries
    pub respect_gitignore: bool,

    /// Compute everything but leave source files untouched
    pub dry_run: bool,

    /// Files processed concurrently
    pub parallelism: usize,

    /// Defaults to `<root>/.madl/manifest.json`
    pub manifest_path: Option<PathBuf>,

    /// JSON-lines index output; no path means a null sink
    pub index_path: Option<PathBuf>,

    pub segmenter: SegmenterConfig,

    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: default_extensions(),
            exclude: ["node_modules", "venv", "__pycache__", "build", "dist"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            quota: Some(DEFAULT_QUOTA),
            lookback: DEFAULT_LOOKBACK,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_gitignore: true,
            dry_run: false,
            parallelism: default_parallelism(),
            manifest_path: None,
            index_path: None,
            segmenter: SegmenterConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Check the root and every tunable; these are the only errors that abort a run
    pub fn validate(&self) -> Result<()> {
        validate_root(&self.root)?;

        if self.extensions.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "extension map is empty".to_string(),
            ));
        }
        if let Some(ext) = self.extensions.keys().find(|ext| ext.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(format!(
                "invalid extension key {ext:?}"
            )));
        }
        if self.lookback == 0 {
            return Err(PipelineError::InvalidConfig(
                "lookback must be at least 1".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_file_size must be > 0".to_string(),
            ));
        }
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(PipelineError::InvalidConfig(format!(
                "parallelism ({}) must be within 1..={MAX_PARALLELISM}",
                self.parallelism
            )));
        }

        self.segmenter.validate()?;
        self.llm.validate()?;
        Ok(())
    }

    /// Resolved manifest location
    pub fn manifest_path(&self) -> PathBuf {
        match &self.manifest_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.root.join(path),
            None => self.root.join(DEFAULT_MANIFEST),
        }
    }

    /// Resolved index location, if any
    pub fn index_path(&self) -> Option<PathBuf> {
        self.index_path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path)
            }
        })
    }
}

fn validate_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        PipelineError::InvalidRoot(format!("{}: {e}", root.display()))
    })?;
    if !metadata.is_dir() {
        return Err(PipelineError::InvalidRoot(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

fn default_extensions() -> BTreeMap<String, Language> {
    Language::default_extensions()
        .into_iter()
        .map(|(ext, language)| (ext.to_string(), language))
        .collect()
}

/// Available CPUs clamped to `1..=16`
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_PARALLELISM)
}
