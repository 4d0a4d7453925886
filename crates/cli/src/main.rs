use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Overrides;
use madl_pipeline::Pipeline;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod config;
mod report;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "madl")]
#[command(about = "Extract methods, classify reusability and keep MADL annotation blocks in sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: madl.toml in the project root, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: classify, annotate, rewrite files, write the manifest
    Run(RunArgs),

    /// Walk, segment and resolve calls; prints the units without rewriting anything
    Scan(CommonArgs),

    /// Remove every recognized annotation block under the root
    Strip(StripArgs),
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Run(args) => args.common.json,
            Commands::Scan(args) => args.json,
            Commands::Strip(args) => args.common.json,
        }
    }
}

#[derive(Args)]
struct CommonArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,

    /// Additional exclusions (path substrings or globs)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Walk ignored and hidden files too
    #[arg(long)]
    no_gitignore: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Compute everything but leave source files untouched
    #[arg(long)]
    dry_run: bool,

    /// External model calls allowed this run (overrides MADL_QUOTA)
    #[arg(long, conflicts_with = "unlimited_quota")]
    quota: Option<usize>,

    /// No limit on external model calls
    #[arg(long)]
    unlimited_quota: bool,

    /// Lines above a definition checked for a surviving block
    #[arg(long)]
    lookback: Option<usize>,

    /// Files processed concurrently
    #[arg(long, short = 'j')]
    parallelism: Option<usize>,

    /// Manifest output path
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Append one JSON document per reusable unit to this file
    #[arg(long)]
    index: Option<PathBuf>,

    /// Model name (overrides MADL_LLM_MODEL)
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args)]
struct StripArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Report what would be removed without rewriting files
    #[arg(long)]
    dry_run: bool,
}

impl CommonArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            exclude: self.exclude.clone(),
            no_gitignore: self.no_gitignore,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON
    if cli.command.json() {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => run(args, config_path).await?,
        Commands::Scan(args) => scan(args, config_path).await?,
        Commands::Strip(args) => strip(args, config_path).await?,
    }

    Ok(())
}

async fn open_pipeline(root: &Path, config_path: Option<&Path>, overrides: &Overrides) -> Result<Pipeline> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Invalid project root: {}", root.display()))?;
    let config = config::resolve(&root, config_path, overrides)?;
    let pipeline = Pipeline::new(config)
        .await
        .context("Failed to start pipeline")?;
    cancel_on_ctrl_c(pipeline.cancel_flag());
    Ok(pipeline)
}

fn cancel_on_ctrl_c(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing files already in progress");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

async fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let overrides = Overrides {
        quota: args.quota,
        unlimited_quota: args.unlimited_quota,
        lookback: args.lookback,
        parallelism: args.parallelism,
        manifest: args.manifest.clone(),
        index: args.index.clone(),
        model: args.model.clone(),
        dry_run: args.dry_run,
        ..args.common.overrides()
    };
    let pipeline = open_pipeline(&args.common.root, config_path, &overrides).await?;
    let report = pipeline.run().await?;

    if args.common.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        print_stdout(&report::render_run_summary(&report))?;
    }
    Ok(())
}

async fn scan(args: CommonArgs, config_path: Option<&Path>) -> Result<()> {
    let pipeline = open_pipeline(&args.root, config_path, &args.overrides()).await?;
    let output = pipeline.scan().await?;
    let records = output.records();

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&records)?)?;
    } else {
        print_stdout(&report::render_units(&records))?;
    }
    Ok(())
}

async fn strip(args: StripArgs, config_path: Option<&Path>) -> Result<()> {
    let overrides = Overrides {
        dry_run: args.dry_run,
        ..args.common.overrides()
    };
    let pipeline = open_pipeline(&args.common.root, config_path, &overrides).await?;
    let report = pipeline.strip().await?;

    if args.common.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        print_stdout(&report::render_strip_summary(&report))?;
    }
    Ok(())
}
