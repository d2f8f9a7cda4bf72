//! CLI argument definitions and shared statics.
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use deskcoach_config::{PerfMode, SensitivityPreset};

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "deskcoach", version, about = "Local webcam posture coach")]
pub struct Cli {
    /// Override the storage root (otherwise `STORAGE_ROOT` env or the OS data dir)
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPreset {
    Sensitive,
    Standard,
    Conservative,
}

impl From<CliPreset> for SensitivityPreset {
    fn from(p: CliPreset) -> Self {
        match p {
            CliPreset::Sensitive => SensitivityPreset::Sensitive,
            CliPreset::Standard => SensitivityPreset::Standard,
            CliPreset::Conservative => SensitivityPreset::Conservative,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPerfMode {
    Lightweight,
    Quality,
    Performance,
}

impl From<CliPerfMode> for PerfMode {
    fn from(p: CliPerfMode) -> Self {
        match p {
            CliPerfMode::Lightweight => PerfMode::Lightweight,
            CliPerfMode::Quality => PerfMode::Quality,
            CliPerfMode::Performance => PerfMode::Performance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CooldownsFlag {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the posture daemon in the foreground (what the supervisor spawns).
    Run {
        /// Target sampling rate in frames per second (4-15)
        #[arg(long, value_name = "F")]
        fps: Option<u32>,
        /// Camera device index
        #[arg(long, value_name = "N")]
        camera: Option<u32>,
        /// Sensitivity preset
        #[arg(long, value_enum)]
        preset: Option<CliPreset>,
        /// Log extra per-tick diagnostics
        #[arg(long, action = ArgAction::SetTrue)]
        diagnostics: bool,
        /// Print the resolved performance-mode profile and exit without running
        #[arg(long, action = ArgAction::SetTrue)]
        perf_profile: bool,
        /// Capture resolution / accuracy tradeoff
        #[arg(long = "perf-mode", value_enum)]
        perf_mode: Option<CliPerfMode>,
        /// Log decisions but suppress notification side effects
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
        /// Never query the OS do-not-disturb state
        #[arg(long = "no-dnd-check", action = ArgAction::SetTrue)]
        no_dnd_check: bool,
        /// Enable or disable the notification cooldown timers
        #[arg(long, value_enum)]
        cooldowns: Option<CooldownsFlag>,
    },
    /// Run the calibration routine in the foreground and write a new baseline.
    Calibrate {
        /// Capture duration in seconds (clamped to 15-45)
        #[arg(long, value_name = "SEC", default_value_t = 25.0)]
        duration_sec: f64,
    },
    /// Start the daemon as a background process (idempotent).
    Start {
        #[command(flatten)]
        run_args: Box<RunArgs>,
    },
    /// Stop the background daemon, if running.
    Stop,
    /// Stop then start the daemon with its last-known arguments.
    Restart,
    /// Report whether the daemon is running and print its last status snapshot.
    Status,
    /// Quick health check: storage root writable, baseline present.
    Health,
    /// Atomically truncate the event log.
    PurgeEvents,
}

/// The subset of `Run`'s flags accepted by `start`, forwarded verbatim to
/// the spawned child's `run` invocation.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, value_name = "F")]
    pub fps: Option<u32>,
    #[arg(long, value_name = "N")]
    pub camera: Option<u32>,
    #[arg(long, value_enum)]
    pub preset: Option<CliPreset>,
    #[arg(long = "perf-mode", value_enum)]
    pub perf_mode: Option<CliPerfMode>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
    #[arg(long = "no-dnd-check", action = ArgAction::SetTrue)]
    pub no_dnd_check: bool,
    #[arg(long, value_enum)]
    pub cooldowns: Option<CooldownsFlag>,
}

impl RunArgs {
    /// Render back into the flag form `run` itself accepts, for the
    /// supervisor to pass to the spawned child process.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if let Some(fps) = self.fps {
            args.push("--fps".into());
            args.push(fps.to_string());
        }
        if let Some(camera) = self.camera {
            args.push("--camera".into());
            args.push(camera.to_string());
        }
        if let Some(preset) = self.preset {
            args.push("--preset".into());
            args.push(
                match preset {
                    CliPreset::Sensitive => "sensitive",
                    CliPreset::Standard => "standard",
                    CliPreset::Conservative => "conservative",
                }
                .to_string(),
            );
        }
        if let Some(perf_mode) = self.perf_mode {
            args.push("--perf-mode".into());
            args.push(
                match perf_mode {
                    CliPerfMode::Lightweight => "lightweight",
                    CliPerfMode::Quality => "quality",
                    CliPerfMode::Performance => "performance",
                }
                .to_string(),
            );
        }
        if self.dry_run {
            args.push("--dry-run".into());
        }
        if self.no_dnd_check {
            args.push("--no-dnd-check".into());
        }
        if let Some(cooldowns) = self.cooldowns {
            args.push("--cooldowns".into());
            args.push(match cooldowns {
                CooldownsFlag::On => "on",
                CooldownsFlag::Off => "off",
            }.to_string());
        }
        args
    }
}
