//! colony-pick CLI: plan colony picks from plate photographs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colony_pick::core::CellKey;
use colony_pick::{load_config, run, DetectionSource, RunConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "colony-pick")]
#[command(about = "Pick isolated colonies from plate photographs into culture-block maps")]
#[command(version)]
struct Cli {
    /// Log debug output (default filter when `RUST_LOG` is unset in tracing builds).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit tracing output as JSON (tracing builds only).
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect colonies, select picks and write block maps.
    Plan(PlanArgs),

    /// Write a default run configuration to edit.
    InitConfig {
        /// Destination JSON file.
        #[arg(long)]
        out: PathBuf,
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the plate-map cell a mask file name resolves to.
    MaskCell {
        /// Mask file name or path, e.g. `plate_b12.png`.
        name: String,
    },
}

#[derive(Debug, Clone, Args)]
struct PlanArgs {
    /// Run configuration (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Replay saved detection tables from this directory instead of running OpenCFU.
    #[arg(long, conflicts_with = "archive_detections")]
    detections: Option<PathBuf>,

    /// Keep OpenCFU's raw tables in this directory for later `--detections` runs.
    #[arg(long)]
    archive_detections: Option<PathBuf>,

    /// Override the configured output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip preview images even if the configuration asks for them.
    #[arg(long)]
    no_previews: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Plan(args) => run_plan(&args),
        Commands::InitConfig { out, force } => run_init_config(&out, force),
        Commands::MaskCell { name } => run_mask_cell(&name),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let default_filter = if cli.verbose { "debug" } else { "info" };
    colony_pick::core::init_tracing(cli.json_log, default_filter);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(err) = colony_pick::core::init_with_level(level) {
        eprintln!("warning: logger already installed: {err}");
    }
}

// ── plan ───────────────────────────────────────────────────────────────

fn run_plan(args: &PlanArgs) -> CliResult<()> {
    let mut config = load_config(&args.config)?;
    if let Some(out) = &args.out {
        config.output_dir = out.clone();
    }
    if args.no_previews {
        config.draw_previews = false;
    }

    let source = match &args.detections {
        Some(dir) => DetectionSource::Saved(dir.clone()),
        None => DetectionSource::OpenCfu {
            archive: args.archive_detections.clone(),
        },
    };
    let outcome = run(&config, &source)?;

    println!(
        "{} picks in {} culture blocks -> {}",
        outcome.plan.total_picks(),
        outcome.plan.blocks.len(),
        config.output_dir.display()
    );
    for path in outcome.reports.block_maps.iter().chain(&outcome.previews) {
        println!("  {}", path.display());
    }
    let warnings = colony_pick::core::warnings_logged();
    if warnings > 0 {
        println!("{warnings} warnings logged, check the cells reported above");
    }
    Ok(())
}

// ── init-config ────────────────────────────────────────────────────────

fn run_init_config(out: &Path, force: bool) -> CliResult<()> {
    if out.exists() && !force {
        return Err(format!("{} already exists (use --force to replace it)", out.display()).into());
    }
    RunConfig::default().write_json(out)?;
    println!("wrote {}", out.display());
    Ok(())
}

// ── mask-cell ──────────────────────────────────────────────────────────

fn run_mask_cell(name: &str) -> CliResult<()> {
    let cell = CellKey::from_mask_name(name)
        .ok_or_else(|| format!("cannot derive a plate-map cell from mask name `{name}`"))?;
    println!("{} (row {}, col {})", cell.label(), cell.row, cell.col);
    Ok(())
}
