//! stimsync: align EEG and auxiliary recordings and synthesize rotation triggers
//!
//! ```bash
//! # Check a trigger definition
//! stimsync check-triggers triggers.ini
//!
//! # Resolve a rotation schedule against the built-in trigger table
//! stimsync check-sequence session1-Pitch-Roll-Yaw.csv
//!
//! # Synchronize eight simulated recording pairs for session 1
//! stimsync simulate --pairs 8 --session 1 --sequence-dir sequences/
//! ```

mod batch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use sync_core::{check_rotation_axes, RecordingLayout};
use sync_processing::{
    SequenceTable, SyncConfig, SyncPipeline, TriggerCodebook, TriggerDictionary, TriggerSchema,
};
use sync_simulation::RecordingConfig;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "stimsync",
    about = "Align EEG and auxiliary recordings and synthesize rotation trigger channels",
    version
)]
struct Cli {
    /// Pipeline configuration (JSON); defaults apply when omitted
    #[arg(long, global = true, env = "STIMSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    Stimulus,
    Epochs,
}

impl From<SchemaArg> for TriggerSchema {
    fn from(schema: SchemaArg) -> Self {
        match schema {
            SchemaArg::Stimulus => TriggerSchema::Stimulus,
            SchemaArg::Epochs => TriggerSchema::Epochs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a trigger definition and print its codes
    CheckTriggers {
        /// INI file; the built-in table when omitted
        path: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "stimulus")]
        schema: SchemaArg,
    },

    /// Resolve a rotation schedule to trigger codes
    CheckSequence {
        path: PathBuf,

        /// Trigger definition; the configured or built-in table when omitted
        #[arg(long)]
        triggers: Option<PathBuf>,

        /// Rotation axes, e.g. `Pitch,Yaw`
        #[arg(long, value_delimiter = ',')]
        axes: Option<Vec<String>>,
    },

    /// Synchronize a batch of simulated recording pairs
    Simulate {
        /// Number of recording pairs
        #[arg(long, default_value = "4")]
        pairs: usize,

        /// Session number (the baseline session needs no schedule)
        #[arg(long, default_value = "2")]
        session: u32,

        /// Seed of the first pair; pair `i` uses `seed + i`
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Directory holding `session{N}-{axes}.csv`
        #[arg(long)]
        sequence_dir: Option<PathBuf>,

        /// Trigger definition file
        #[arg(long)]
        triggers: Option<PathBuf>,
    },

    /// Show where a participant/session is stored under a data root
    Layout {
        root: PathBuf,

        #[arg(long)]
        participant: u32,

        #[arg(long)]
        session: u32,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.to_string())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => SyncConfig::default(),
    };

    match cli.command {
        Commands::CheckTriggers { path, schema } => check_triggers(path, schema.into()),
        Commands::CheckSequence { path, triggers, axes } => {
            check_sequence(&config, path, triggers, axes)
        }
        Commands::Simulate {
            pairs,
            session,
            seed,
            sequence_dir,
            triggers,
        } => simulate(config, pairs, session, seed, sequence_dir, triggers),
        Commands::Layout {
            root,
            participant,
            session,
        } => layout(root, participant, session),
        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn check_triggers(path: Option<PathBuf>, schema: TriggerSchema) -> Result<()> {
    let dictionary = match &path {
        Some(path) => TriggerDictionary::load(path, schema)
            .with_context(|| format!("invalid trigger definition {}", path.display()))?,
        None => TriggerDictionary::builtin().context("built-in trigger table is invalid")?,
    };
    info!(keys = dictionary.len(), "trigger definition is valid");
    println!("{}", serde_json::to_string_pretty(&dictionary)?);
    Ok(())
}

fn check_sequence(
    config: &SyncConfig,
    path: PathBuf,
    triggers: Option<PathBuf>,
    axes: Option<Vec<String>>,
) -> Result<()> {
    let dictionary = match triggers.as_ref().or(config.triggers_path.as_ref()) {
        Some(p) => TriggerDictionary::load(p, TriggerSchema::Stimulus)
            .with_context(|| format!("invalid trigger definition {}", p.display()))?,
        None => TriggerDictionary::builtin()?,
    };
    let axes = match axes {
        Some(names) => check_rotation_axes(&names)?,
        None => config.axes()?,
    };
    let codebook = TriggerCodebook::new(&dictionary, &axes)?;
    let table = SequenceTable::load_with_codebook(&path, &codebook)
        .with_context(|| format!("invalid rotation schedule {}", path.display()))?;

    info!(rows = table.len(), duration = table.total_duration(), "schedule resolved");
    let report = json!({
        "path": path.display().to_string(),
        "axes": axes.iter().map(|a| a.name()).collect::<Vec<_>>(),
        "rows": table.len(),
        "total_duration": table.total_duration(),
        "segments": table.rows(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn simulate(
    mut config: SyncConfig,
    pairs: usize,
    session: u32,
    seed: u64,
    sequence_dir: Option<PathBuf>,
    triggers: Option<PathBuf>,
) -> Result<()> {
    if sequence_dir.is_some() {
        config.sequence_dir = sequence_dir;
    }
    if triggers.is_some() {
        config.triggers_path = triggers;
    }
    let pipeline = Arc::new(SyncPipeline::new(config).context("failed to build the pipeline")?);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let report = runtime.block_on(batch::run_batch(
        pipeline,
        RecordingConfig::default(),
        session,
        pairs,
        seed,
    ))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed > 0 {
        anyhow::bail!("{} of {} pairs failed", report.failed, pairs);
    }
    Ok(())
}

fn layout(root: PathBuf, participant: u32, session: u32) -> Result<()> {
    let layout = RecordingLayout::new(root)?;
    let raw = layout.raw_paths(participant, session)?;
    let stem = layout.derivative_stem(participant, session)?;
    let report = json!({
        "eeg_header": raw.eeg_header.display().to_string(),
        "aux": raw.aux.display().to_string(),
        "derivative_stem": stem.display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
