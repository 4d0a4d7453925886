use anyhow::{bail, Context, Result};
use madl_pipeline::PipelineConfig;
use std::path::{Path, PathBuf};

/// Looked up in the project root when `--config` is not given
pub const CONFIG_FILE: &str = "madl.toml";

/// Command-line values that win over the file and the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub quota: Option<usize>,
    pub unlimited_quota: bool,
    pub lookback: Option<usize>,
    pub parallelism: Option<usize>,
    pub manifest: Option<PathBuf>,
    pub index: Option<PathBuf>,
    pub model: Option<String>,
    pub exclude: Vec<String>,
    pub dry_run: bool,
    pub no_gitignore: bool,
}

/// File → environment → flags
pub fn resolve(root: &Path, explicit: Option<&Path>, overrides: &Overrides) -> Result<PipelineConfig> {
    let mut config = load_file(root, explicit)?;
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn load_file(root: &Path, explicit: Option<&Path>) -> Result<PipelineConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(root.join(CONFIG_FILE)).filter(|path| path.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: PipelineConfig = toml::from_str(&raw)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            log::debug!("Loaded config from {}", path.display());
            config
        }
        None => PipelineConfig::default(),
    };
    config.root = root.to_path_buf();
    Ok(config)
}

/// Apply `MADL_*` variables; `lookup` is `std::env::var` outside tests
pub fn apply_env(
    config: &mut PipelineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(raw) = read("MADL_QUOTA") {
        config.quota = parse_quota(&raw).with_context(|| format!("Invalid MADL_QUOTA {raw:?}"))?;
    }
    if let Some(url) = read("MADL_LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = read("MADL_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Some(key) = read("MADL_API_KEY") {
        config.llm.api_key = Some(key);
    }
    Ok(())
}

fn parse_quota(raw: &str) -> Result<Option<usize>> {
    if raw.eq_ignore_ascii_case("unlimited") || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match raw.parse::<usize>() {
        Ok(limit) => Ok(Some(limit)),
        Err(_) => bail!("expected a number or \"unlimited\""),
    }
}

pub fn apply_overrides(config: &mut PipelineConfig, overrides: &Overrides) {
    if overrides.unlimited_quota {
        config.quota = None;
    } else if let Some(quota) = overrides.quota {
        config.quota = Some(quota);
    }
    if let Some(lookback) = overrides.lookback {
        config.lookback = lookback;
    }
    if let Some(parallelism) = overrides.parallelism {
        config.parallelism = parallelism;
    }
    if let Some(manifest) = &overrides.manifest {
        config.manifest_path = Some(manifest.clone());
    }
    if let Some(index) = &overrides.index {
        config.index_path = Some(index.clone());
    }
    if let Some(model) = &overrides.model {
        config.llm.model = model.clone();
    }
    config.exclude.extend(overrides.exclude.iter().cloned());
    config.dry_run |= overrides.dry_run;
    if overrides.no_gitignore {
        config.respect_gitignore = false;
    }
}
