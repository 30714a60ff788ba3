//! EEG Event CLI Application
//!
//! This is the command-line interface for the lab's EEG event tooling.
//! It uses the eeg-event-decoder library and adds:
//! - TOML configuration and lab path resolution
//! - Annotation listing and events.tsv export for single recordings
//! - Manifest generation
//! - Manifest-driven batch export with skip/overwrite policy

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eeg_event_decoder::{Decoder, Task};
use std::io;
use std::path::PathBuf;

mod batch;
mod config;
mod report;

use batch::{BatchFilter, BatchRunner};
use config::AppConfig;

/// EEG Event CLI - Decode recording events and drive batch exports
#[derive(Parser, Debug)]
#[command(name = "eeg-event-cli")]
#[command(about = "Decode EEG recording events (MFF) and export annotations", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the annotations of one recording
    Annotate {
        /// Recording directory (.mff)
        recording: PathBuf,

        /// Condition legend, e.g. "1=match,2=mismatch"
        #[arg(long, value_name = "CELL=LABEL,...")]
        conditions: Option<String>,

        /// Event track holding the condition legend
        #[arg(long, value_name = "NAME")]
        legend_track: Option<String>,

        /// Also write an events.tsv here
        #[arg(long, value_name = "FILE")]
        events_tsv: Option<PathBuf>,

        /// Print annotations as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Scan the Listen participant folders and write the recording manifest
    Manifest {
        /// Folder to scan (default: Listen participant folder)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Manifest to write (default: data/eeg_list.csv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Export events.tsv for every manifest row
    Bidsify {
        /// Only this task
        #[arg(long, value_parser = parse_task)]
        task: Option<Task>,

        /// Only this subject
        #[arg(long)]
        subject: Option<String>,

        /// Only this session
        #[arg(long)]
        session: Option<String>,

        /// Manifest to read (default: data/eeg_list.csv)
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// BIDS root (default: data/bids)
        #[arg(long, value_name = "DIR")]
        bids_root: Option<PathBuf>,

        /// Replace existing outputs
        #[arg(long)]
        overwrite: bool,
    },

    /// List Semantics subjects and their condition files
    Semantics {
        /// Folder with the *.set files (default: sem_esrp on the lab share)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

fn parse_task(raw: &str) -> std::result::Result<Task, String> {
    raw.parse::<Task>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("EEG Event CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", eeg_event_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    match args.command {
        Command::Annotate {
            recording,
            conditions,
            legend_track,
            events_tsv,
            json,
        } => annotate(&config, recording, conditions, legend_track, events_tsv, json),
        Command::Manifest { root, output } => manifest(&config, root, output),
        Command::Bidsify {
            task,
            subject,
            session,
            manifest,
            bids_root,
            overwrite,
        } => {
            let filter = BatchFilter {
                subject,
                session,
                task,
                overwrite: overwrite || config.bids.overwrite,
            };
            bidsify(&config, filter, manifest, bids_root)
        }
        Command::Semantics { dir } => semantics(&config, dir),
    }
}

/// Decode one recording and print its annotations
fn annotate(
    config: &AppConfig,
    recording: PathBuf,
    conditions: Option<String>,
    legend_track: Option<String>,
    events_tsv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut annotation_config = config.annotation_config()?;
    if let Some(raw) = conditions {
        annotation_config = annotation_config.with_conditions(config::parse_condition_list(&raw)?);
    }
    if let Some(track) = legend_track {
        annotation_config = annotation_config.with_legend_track(track);
    }

    let decoder = Decoder::with_montages(config.montage_resolver());
    let recording = decoder
        .read_recording(&recording, &annotation_config)
        .with_context(|| format!("Failed to read recording {:?}", recording))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recording.annotations)?);
    } else {
        report::write_recording(&mut io::stdout().lock(), &recording)?;
    }

    if let Some(path) = events_tsv {
        eeg_event_decoder::write_events_tsv(&path, &recording.annotations, &config.event_ids())
            .with_context(|| format!("Failed to write events to {:?}", path))?;
    }
    Ok(())
}

/// Generate the recording manifest
fn manifest(config: &AppConfig, root: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let (root, output) = match (root, output) {
        (Some(root), Some(output)) => (root, output),
        (root, output) => {
            let paths = config.lab_paths()?;
            paths.ensure_mounted()?;
            (
                root.unwrap_or_else(|| paths.listen_dir()),
                output.unwrap_or_else(|| config.manifest_path(&paths)),
            )
        }
    };

    let rows = eeg_event_decoder::generate_manifest(&root)?;
    eeg_event_decoder::write_manifest(&output, &rows)?;
    println!("Wrote {} recordings to {}", rows.len(), output.display());
    Ok(())
}

/// Run the batch export over the manifest
fn bidsify(
    config: &AppConfig,
    filter: BatchFilter,
    manifest: Option<PathBuf>,
    bids_root: Option<PathBuf>,
) -> Result<()> {
    let (manifest, bids_root) = match (manifest, bids_root) {
        (Some(manifest), Some(bids_root)) => (manifest, bids_root),
        (manifest, bids_root) => {
            let paths = config.lab_paths()?;
            paths.ensure_mounted()?;
            (
                manifest.unwrap_or_else(|| config.manifest_path(&paths)),
                bids_root.unwrap_or_else(|| config.bids_root(&paths)),
            )
        }
    };

    let rows = eeg_event_decoder::read_manifest(&manifest)
        .with_context(|| format!("Failed to read manifest {:?}", manifest))?;
    let annotation_config = config.annotation_config()?;
    let event_ids = config.event_ids();
    let decoder = Decoder::with_montages(config.montage_resolver());

    let runner = BatchRunner::new(&decoder, &annotation_config, &event_ids, bids_root);
    let summary = runner.run(&rows, &filter)?;
    report::write_batch_summary(&mut io::stdout().lock(), &summary)?;
    Ok(())
}

/// List Semantics subjects
fn semantics(config: &AppConfig, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => {
            let paths = config.lab_paths()?;
            paths.ensure_mounted()?;
            paths.semantics_epochs_dir()
        }
    };
    let subjects = eeg_event_decoder::studies::group_subject_files(&dir)?;
    report::write_semantics_subjects(&mut io::stdout().lock(), &subjects)?;
    Ok(())
}

/// Level for the -v/-q flags
fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    use log::LevelFilter;

    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Initialize logging; RUST_LOG overrides the flag-derived level
fn init_logging(verbose: u8, quiet: bool) {
    use std::io::Write;

    env_logger::Builder::new()
        .filter_level(log_level(verbose, quiet))
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:<5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
