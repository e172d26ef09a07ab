//! File-only tracing setup; stdout belongs to the prompt.
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber writing to `<log dir>/<session>/client.log`.
///
/// Returns the log file path.
pub fn setup_logging(session_id: Option<&str>) -> Result<PathBuf> {
    let session_id = match session_id {
        Some(id) => id.to_owned(),
        None => {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default();
            format!("session_{timestamp}")
        }
    };

    let session_log_dir = log_dir().join(&session_id);
    std::fs::create_dir_all(&session_log_dir)?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "client.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()?;

    // Leak the guard to keep the file writer alive for the whole process.
    std::mem::forget(guard);

    let log_file = session_log_dir.join("client.log");
    tracing::info!(session = %session_id, file = %log_file.display(), "logging initialized");
    Ok(log_file)
}

/// Platform cache directory for logs, e.g. `~/.cache/wizard/logs` on Linux.
fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "wizard")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("wizard"))
        .join("logs")
}
