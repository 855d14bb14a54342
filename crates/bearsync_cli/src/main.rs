//! `bearsync` runner.
//!
//! # Responsibility
//! - Merge config file values with command-line overrides.
//! - Invoke one sync pass per interval, never overlapping.
//! - Keep running across pass failures; the next tick retries.

use bearsync_core::{
    init_logging, open_bear_db, open_bear_db_read_only, NoteTree, PassReport, SqliteBearStore,
    SyncAction, SyncConfig, SyncService,
};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

#[derive(Debug, Parser)]
#[command(
    name = "bearsync",
    version,
    about = "Keep Bear notes and a markdown folder in sync"
)]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path to Bear's database.sqlite.
    #[arg(long = "db")]
    database_path: Option<PathBuf>,
    /// Export root directory (absolute).
    #[arg(long)]
    root: Option<PathBuf>,
    /// Seconds to wait between passes.
    #[arg(long)]
    interval_secs: Option<u64>,
    /// Run a single pass, print its report as JSON, and exit.
    #[arg(long)]
    once: bool,
    /// Print the actions the next pass would take without applying them.
    #[arg(long, conflicts_with = "once")]
    dry_run: bool,
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("bearsync: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli)?;
    init_logging(&config.log_level, &config.log_dir)?;

    if cli.dry_run {
        return dry_run(&config);
    }
    if cli.once {
        let report = run_pass(&config)?;
        let json = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
        println!("{json}");
        return Ok(());
    }

    info!(
        "event=scheduler_start module=cli status=ok interval_secs={} root={}",
        config.interval_secs,
        config.root.display()
    );
    loop {
        if let Err(message) = run_pass(&config) {
            warn!("event=scheduler_tick module=cli status=error error={message}");
        }
        thread::sleep(config.interval());
    }
}

fn load_config(cli: &Cli) -> Result<SyncConfig, String> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => SyncConfig::default(),
    };
    if let Some(path) = &cli.database_path {
        config.database_path = path.clone();
    }
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(interval_secs) = cli.interval_secs {
        config.interval_secs = interval_secs;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = log_dir.clone();
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

/// Opens both stores fresh so a dropped database handle heals on the next tick.
fn run_pass(config: &SyncConfig) -> Result<PassReport, String> {
    let conn = open_bear_db(&config.database_path).map_err(|err| err.to_string())?;
    let store = SqliteBearStore::try_new(&conn).map_err(|err| err.to_string())?;
    let tree = NoteTree::open(&config.root).map_err(|err| err.to_string())?;
    let service = SyncService::new(store, tree);
    let report = service.run_pass().map_err(|err| err.to_string())?;
    Ok(report)
}

fn dry_run(config: &SyncConfig) -> Result<(), String> {
    if !config.root.is_dir() {
        return Err(format!(
            "export root `{}` does not exist; a real pass would create it",
            config.root.display()
        ));
    }
    let conn = open_bear_db_read_only(&config.database_path).map_err(|err| err.to_string())?;
    let store = SqliteBearStore::try_new(&conn).map_err(|err| err.to_string())?;
    let tree = NoteTree::open(&config.root).map_err(|err| err.to_string())?;
    let service = SyncService::new(store, tree);
    let plan = service.plan().map_err(|err| err.to_string())?;

    for group in &plan.groups {
        for action in &group.actions {
            println!("{}\t{}\t{}", group.note_id, action.kind(), describe(action));
        }
    }
    for note_id in &plan.untracked {
        println!("{note_id}\tuntracked\t-");
    }
    for note_id in &plan.held {
        println!("{note_id}\theld\t-");
    }
    Ok(())
}

fn describe(action: &SyncAction) -> String {
    match action {
        SyncAction::DeleteFile { path }
        | SyncAction::CreateFile { path, .. }
        | SyncAction::WriteStoreContentToFile { path, .. } => path.display().to_string(),
        SyncAction::RelocateFile { from, to } => {
            format!("{} -> {}", from.display(), to.display())
        }
        SyncAction::WriteFileContentToStore { content } => format!("{} bytes", content.len()),
        SyncAction::SyncRecordTimestamp { path, recorded } => {
            format!("{} (store {recorded})", path.display())
        }
    }
}
