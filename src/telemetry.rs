//! Namespaced logging (spec §3.1, ambient stack): a thin `Logger` seam over
//! `tracing`, matching spec §6's injected `Logger.log(namespace, …)`.
//! Namespaces double as `tracing` targets (`mapruntime::http`,
//! `mapruntime::driver`, ...) so per-module filtering works out of the box.

/// Severity levels a [`Logger`] accepts, mirroring `tracing`'s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// The injected logging seam (spec §6 "`Logger.log(namespace, …)`"). Never
/// passed secret material — callers must pass key names/placements, not
/// values (spec §3.1).
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, namespace: &str, message: &str);
}

/// Default `tracing`-backed logger. `namespace` becomes the `tracing`
/// target, e.g. `mapruntime::http`, `mapruntime::driver`.
#[derive(Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, namespace: &str, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "mapruntime", namespace, "{message}"),
            LogLevel::Debug => tracing::debug!(target: "mapruntime", namespace, "{message}"),
            LogLevel::Info => tracing::info!(target: "mapruntime", namespace, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "mapruntime", namespace, "{message}"),
            LogLevel::Error => tracing::error!(target: "mapruntime", namespace, "{message}"),
        }
    }
}

/// Installs a global `tracing` subscriber reading `RUST_LOG` (or `info` by
/// default), for binaries/tests embedding this crate directly. Libraries
/// should generally leave subscriber installation to the host application.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingLogger(Arc<Mutex<Vec<(LogLevel, String, String)>>>);

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, namespace: &str, message: &str) {
            self.0.lock().unwrap().push((level, namespace.to_string(), message.to_string()));
        }
    }

    #[test]
    fn custom_logger_receives_namespace_and_message() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let logger = RecordingLogger(records.clone());
        logger.log(LogLevel::Warn, "mapruntime::driver", "provider exhausted");

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1, "mapruntime::driver");
        assert_eq!(records[0].2, "provider exhausted");
    }

    #[test]
    fn tracing_logger_does_not_panic_without_a_subscriber() {
        let logger = TracingLogger;
        logger.log(LogLevel::Info, "mapruntime::http", "request sent");
    }
}
