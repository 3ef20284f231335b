//! uranio-sync CLI
//!
//! Usage: uranio-sync <path-to-repo> <path-to-uranio-monorepo>
//!
//! Validates both paths, reads which Uranio package the repo has
//! installed, then watches every package in that package's dependency
//! chain and mirrors each change into the repo's node_modules until
//! interrupted.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use uranio_sync::config;
use uranio_sync::shutdown::{Coordinator, Registry};
use uranio_sync::spawn::CommandRunner;
use uranio_sync::watcher::event::EventSink;
use uranio_sync::watcher::{Supervisor, SyncEvent, WatchOptions};
use uranio_sync::SyncResult;

/// Watch a Uranio monorepo and mirror edits into a repo's node_modules
#[derive(Parser, Debug)]
#[command(name = "uranio-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the consumer repo (must be `uranio init`ed)
    repo: String,

    /// Path to the Uranio monorepo
    monorepo: String,

    /// Emit NDJSON events instead of human-readable log lines
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("[{}] {}", err.code(), err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> SyncResult<()> {
    let repo_path = config::expand_home(&cli.repo);
    let monorepo_path = config::expand_home(&cli.monorepo);

    config::check_repo_initialized(&repo_path)?;
    config::check_monorepo(&monorepo_path)?;

    let repo_path = repo_path.canonicalize()?;
    let monorepo_path = monorepo_path.canonicalize()?;

    if !cli.json {
        println!("Repo found ............. [{}]", repo_path.display());
        println!("Uranio monorepo found .. [{}]", monorepo_path.display());
    }

    let selected = config::selected_repo(&repo_path)?;
    let binaries: Arc<HashSet<PathBuf>> = Arc::new(config::binary_destinations(
        &repo_path,
        &monorepo_path,
        selected,
    )?);

    let sink = event_sink(cli.json);
    let running = Arc::new(AtomicBool::new(true));
    let registry = Arc::new(Registry::new());

    let coordinator = Arc::new(Coordinator::new(
        registry.clone(),
        running.clone(),
        sink.clone(),
    ));
    let handler = coordinator.clone();
    ctrlc::set_handler(move || handler.notify()).expect("Error setting Ctrl+C handler");

    let supervisor = Supervisor::new(
        WatchOptions {
            repo_path: repo_path.clone(),
            monorepo_path: monorepo_path.clone(),
        },
        binaries,
        registry.clone(),
        running.clone(),
        sink.clone(),
    );
    for (repo, is_final) in selected.sync_chain() {
        supervisor.start(repo, is_final)?;
    }

    let runner = CommandRunner::new(registry, sink);
    for (repo, _) in selected.sync_chain() {
        let package_dir = monorepo_path.join(repo.dir_name());
        runner.execute(&format!("cd {} && yarn dev:sync", package_dir.display()));
    }

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    coordinator.run();

    Ok(())
}

fn event_sink(json: bool) -> EventSink {
    if json {
        return Arc::new(|event: SyncEvent| println!("{}", event.to_json()));
    }
    Arc::new(|event: SyncEvent| {
        let time = chrono::Local::now().format("[T%H:%M:%S:%3f]");
        match event {
            SyncEvent::Started { watched } => {
                println!("Started watching [{}] directories ...", watched.join(", "));
            }
            SyncEvent::Change { kind, path } => {
                println!("{time} {kind} {path}");
            }
            SyncEvent::Copied { from, to } => {
                println!("{time} Copied file [{from}] to [{to}]");
            }
            SyncEvent::Removed { kind, to } => {
                println!("{time} Removed [{to}] ({kind})");
            }
            SyncEvent::Excluded { path } => {
                println!("{time} Skipped excluded file [{path}]");
            }
            SyncEvent::MarkedExecutable { path } => {
                println!("{time} Marked executable [{path}]");
            }
            SyncEvent::Command { line } => {
                println!("{line}");
            }
            SyncEvent::CommandFailed { command } => {
                eprintln!("Error on: {command}");
            }
            SyncEvent::Error { message } => {
                eprintln!("{time} Error: {message}");
            }
            SyncEvent::Interrupted => {
                println!("\r--- Caught interrupt signal ---");
            }
            SyncEvent::Stopped { target } => {
                println!("Stopped {target}");
            }
            SyncEvent::Shutdown => {
                println!("Shutdown complete.");
            }
        }
    })
}
