//! Logging and tracing configuration
//!
//! Logs go to stderr so that stdout stays reserved for the test report.
//! A run can additionally append full-detail logs to a file.

use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storefront=info,warn"))
}

/// Initialize tracing for a run
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
/// With `log_file` set, logs are also appended to that file (a bare file
/// name is placed in the default log directory). Returns the file path
/// actually used.
pub fn init(log_file: Option<&Path>) -> Option<PathBuf> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let Some(path) = log_file.and_then(resolve_log_path) else {
        tracing_subscriber::registry()
            .with(filter())
            .with(stderr_layer)
            .init();
        return None;
    };

    let (dir, name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_owned()),
        _ => {
            tracing_subscriber::registry()
                .with(filter())
                .with(stderr_layer)
                .init();
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
    }

    let file_layer = fmt::layer()
        .with_writer(tracing_appender::rolling::never(&dir, &name))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter())
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Some(path)
}

fn resolve_log_path(path: &Path) -> Option<PathBuf> {
    if path.parent().map(|p| p.as_os_str().is_empty()).unwrap_or(true) {
        paths::log_dir().map(|dir| dir.join(path))
    } else {
        Some(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_log_path_is_kept() {
        let path = Path::new("/tmp/storefront/run.log");
        assert_eq!(resolve_log_path(path), Some(path.to_path_buf()));
    }

    #[test]
    fn test_bare_log_name_goes_to_log_dir() {
        if let Some(resolved) = resolve_log_path(Path::new("run.log")) {
            assert!(resolved.ends_with("logs/run.log"));
        }
    }
}
