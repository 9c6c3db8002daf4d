//! `tracing` integration
//!
//! Code throughout the crate logs with the `tracing` macros. [`RegistryLayer`]
//! turns each event into a [`LogRecord`](super::LogRecord) on the logger named
//! after the event's target, so `tracing` output lands in the same sinks as
//! records emitted through a [`Logger`](super::Logger) directly.
//!
//! The global subscriber can only be installed once per process. Reconfiguring
//! logging therefore swaps sinks inside the registry and leaves the subscriber
//! alone.

use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::level::Severity;
use super::record::Fields;
use super::registry::LoggerRegistry;
use super::topology::APP_LOGGER;

/// Crate name as it appears in `tracing` targets
const CRATE_TARGET: &str = "docman";

/// Directive used when `RUST_LOG` is not set; the registry does the real filtering
const DEFAULT_FILTER: &str = "debug";

/// Layer forwarding `tracing` events into a [`LoggerRegistry`]
pub struct RegistryLayer {
    registry: LoggerRegistry,
}

impl RegistryLayer {
    pub fn new(registry: LoggerRegistry) -> Self {
        Self { registry }
    }
}

impl<S: Subscriber> Layer<S> for RegistryLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let severity = Severity::from(*metadata.level());
        let logger = self.registry.get_logger(&logger_name(metadata.target()));
        if !logger.is_enabled_for(severity) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        logger.log_with(severity, visitor.message, visitor.fields);
    }
}

/// Map a `tracing` target to a logger name
///
/// `docman::http::middleware` becomes `app.http.middleware`; other module paths
/// keep their name with `::` replaced by `.`.
pub fn logger_name(target: &str) -> String {
    if target == CRATE_TARGET {
        return APP_LOGGER.to_string();
    }
    if let Some(rest) = target.strip_prefix(CRATE_TARGET).and_then(|r| r.strip_prefix("::")) {
        return format!("{}.{}", APP_LOGGER, rest.replace("::", "."));
    }
    target.replace("::", ".")
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: Fields,
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.insert(field.name(), format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }
}

/// Install the global subscriber forwarding into `registry`
///
/// Returns `false` if a global subscriber was already installed, which makes
/// repeated calls harmless.
pub fn install_tracing_bridge(registry: &LoggerRegistry) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(RegistryLayer::new(registry.clone()))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::buffer::MemorySink;
    use crate::logging::topology::{FileNaming, LoggerConfig, Topology, ROOT_LOGGER};
    use std::sync::Arc;

    fn registry_with_memory(level: Severity) -> (LoggerRegistry, Arc<MemorySink>) {
        let registry = LoggerRegistry::new();
        let memory = Arc::new(MemorySink::new("memory", Severity::Debug, 100));
        let mut topology = Topology::new(FileNaming::Shared).with_sink("memory", memory.clone());
        for name in [ROOT_LOGGER, APP_LOGGER] {
            topology = topology.with_logger(LoggerConfig {
                name: name.to_string(),
                handlers: vec!["memory".to_string()],
                level,
                propagate: false,
            });
        }
        registry.configure(topology).unwrap();
        (registry, memory)
    }

    #[test]
    fn test_logger_name_mapping() {
        assert_eq!(logger_name("docman"), "app");
        assert_eq!(logger_name("docman::http::middleware"), "app.http.middleware");
        assert_eq!(logger_name("tower_http::cors"), "tower_http.cors");
        assert_eq!(logger_name("docmanager::x"), "docmanager.x");
        assert_eq!(logger_name("app.documents"), "app.documents");
    }

    #[test]
    fn test_events_reach_registry() {
        let (registry, memory) = registry_with_memory(Severity::Info);
        let subscriber = tracing_subscriber::registry().with(RegistryLayer::new(registry));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "docman::db", "below level");
            tracing::info!(target: "docman::db", rows = 3u64, table = "documents", "Query finished");
            tracing::warn!(target: "hyper::proto", "third party warning");
        });

        let records = memory.records();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].logger, "app.db");
        assert_eq!(records[0].severity, Severity::Info);
        assert_eq!(records[0].message, "Query finished");
        assert_eq!(records[0].fields.get("rows"), Some(&Value::from(3u64)));
        assert_eq!(records[0].fields.get("table"), Some(&Value::from("documents")));

        assert_eq!(records[1].logger, "hyper.proto");
        assert_eq!(records[1].severity, Severity::Warning);
    }

    #[test]
    fn test_display_fields_are_strings() {
        let (registry, memory) = registry_with_memory(Severity::Debug);
        let subscriber = tracing_subscriber::registry().with(RegistryLayer::new(registry));

        tracing::subscriber::with_default(subscriber, || {
            let path = std::path::Path::new("/tmp/app.log");
            tracing::info!(target: "docman", path = %path.display(), "Application logs");
        });

        let records = memory.records();
        assert_eq!(records[0].logger, "app");
        assert_eq!(records[0].fields.get("path"), Some(&Value::from("/tmp/app.log")));
    }
}
