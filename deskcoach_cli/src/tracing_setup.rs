//! Tracing subscriber setup: pretty or JSON lines on stderr, level from
//! `--log-level` (overridable by `RUST_LOG`).
//!
//! The daemon itself never manages log files directly — the supervisor
//! redirects a spawned child's stdout/stderr into `daemon.log` (§6).
use tracing_subscriber::EnvFilter;

pub fn init_tracing(json: bool, log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
