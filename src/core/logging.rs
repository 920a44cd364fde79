use std::io;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Rolled daily as `rag-chatbot.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "rag-chatbot.log";
/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info,tower_http=debug";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: stdout always, plus a daily file under `log_dir`.
///
/// If the directory cannot be created the service keeps running with stdout only.
pub fn init(log_dir: &Path) {
    let (file_layer, file_error) = match file_writer(log_dir) {
        Ok((writer, guard)) => {
            let _ = FILE_GUARD.set(guard);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), None)
        }
        Err(err) => (None, Some(err)),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }
    match file_error {
        Some(err) => tracing::warn!(
            "File logging disabled, cannot use {}: {}",
            log_dir.display(),
            err
        ),
        None => tracing::debug!("Writing logs to {}", log_dir.display()),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn file_writer(log_dir: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn file_writer_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("server");
        let (_writer, _guard) = file_writer(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn file_writer_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        assert!(file_writer(&file).is_err());
    }
}
