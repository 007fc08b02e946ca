//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Global subscriber can only be installed once per process, so every
// assertion about the installed pipeline lives in this single test.
#[test]
fn test_init_logging_installs_global_pipeline_once() {
    let sink = Arc::new(RecordingSink::default());
    let trait_sink: Arc<dyn LoggerSink> = sink.clone();

    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_filter("debug")
        .with_logger_sink(trait_sink);

    init_logging(config.clone()).expect("first initialization succeeds");

    tracing::debug!(target: "core_session", license_token = "lt-123", "Published credentials");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Published credentials");
        assert_eq!(
            entries[0].fields.get("license_token"),
            Some(&"[REDACTED]".to_string())
        );
    }

    let second = init_logging(config);
    assert!(second.is_err());
    assert!(second
        .unwrap_err()
        .to_string()
        .contains("Failed to initialize logging"));
}

#[test]
fn test_invalid_filter_is_a_config_error() {
    let config = LoggingConfig::default().with_filter("core_stream=notalevel");
    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Invalid log filter"));
}
