#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! CLI entrypoint for the posture coach.
//!
//! Responsibilities:
//! - Parse flags and resolve the storage root
//! - Initialize tracing (pretty or JSON lines on stderr)
//! - Dispatch to the daemon loop, the calibration routine, or a supervisor
//!   command (start/stop/restart/status/health/purge-events)
//! - Map domain errors to human-readable text or stable JSON + exit codes

mod calibrate;
mod cli;
mod daemon;
mod error_fmt;
mod supervisor_cmds;
mod tracing_setup;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use deskcoach_config::StorageRoot;

use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use tracing_setup::init_tracing;

fn main() -> eyre::Result<()> {
    // Initialize pretty error reports early
    let _ = color_eyre::install();

    // Set up graceful shutdown handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived shutdown signal, stopping gracefully...");
        shutdown_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        eprintln!("Warning: Failed to set signal handler: {e}");
    }

    if let Err(e) = real_main(shutdown) {
        let json = *JSON_MODE.get().unwrap_or(&false);
        let code = exit_code_for_error(&e);
        if json {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(code);
    }
    Ok(())
}

fn resolve_storage_root(cli: &Cli) -> StorageRoot {
    match &cli.storage_root {
        Some(path) => StorageRoot::new(path.clone()),
        None => StorageRoot::from_env(),
    }
}

fn real_main(shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    init_tracing(cli.json, &cli.log_level);

    let root = resolve_storage_root(&cli);

    match cli.cmd {
        Commands::Run {
            fps,
            camera,
            preset,
            diagnostics,
            perf_profile,
            perf_mode,
            dry_run,
            no_dnd_check,
            cooldowns,
        } => daemon::run(
            root,
            daemon::RunOverrides {
                fps,
                camera,
                preset,
                perf_mode,
                diagnostics,
                perf_profile,
                dry_run,
                no_dnd_check,
                cooldowns,
            },
            shutdown,
        ),
        Commands::Calibrate { duration_sec } => calibrate::run(root, duration_sec, shutdown),
        Commands::Start { run_args } => supervisor_cmds::start(root, &run_args, cli.json),
        Commands::Stop => supervisor_cmds::stop(root, cli.json),
        Commands::Restart => supervisor_cmds::restart(root, cli.json),
        Commands::Status => supervisor_cmds::status(root, cli.json),
        Commands::Health => supervisor_cmds::health(root, cli.json),
        Commands::PurgeEvents => supervisor_cmds::purge_events(root, cli.json),
    }
}
