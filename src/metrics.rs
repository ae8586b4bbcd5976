//! Metric names and descriptions.
//!
//! Counters are emitted through the `metrics` facade. No exporter is
//! installed here: the host application installs whatever recorder it uses,
//! and until it does every counter is a no-op.

/// Counters emitted by the writer, the resolver and the layer.
pub const COUNTERS: [&str; 5] = [
    "mailsender_mails_recorded_total",
    "mailsender_recipients_recorded_total",
    "mailsender_append_errors_total",
    "mailsender_address_parse_errors_total",
    "mailsender_events_dropped_total",
];

/// Error labels used on `mailsender_append_errors_total`.
const APPEND_ERROR_KINDS: [&str; 3] = ["database", "empty_recipients", "missing_body_id"];

/// Register all metric descriptions.
///
/// Call once after the recorder is installed so exporters can print HELP text.
pub fn register_metric_descriptions() {
    use metrics::describe_counter;

    describe_counter!(
        "mailsender_mails_recorded_total",
        "Total number of events committed as one body row with its headers"
    );
    describe_counter!(
        "mailsender_recipients_recorded_total",
        "Total number of header rows committed (one per recipient)"
    );
    describe_counter!(
        "mailsender_append_errors_total",
        "Total number of events dropped because the append failed"
    );
    describe_counter!(
        "mailsender_address_parse_errors_total",
        "Total number of recipient templates whose output did not parse as addresses"
    );
    describe_counter!(
        "mailsender_events_dropped_total",
        "Total number of matching events dropped because too many appends were pending"
    );
}

/// Initialize every counter to zero.
///
/// Makes all series visible from startup, before any event is recorded.
pub fn initialize_metrics() {
    use metrics::counter;

    counter!("mailsender_mails_recorded_total").absolute(0);
    counter!("mailsender_recipients_recorded_total").absolute(0);
    counter!("mailsender_address_parse_errors_total").absolute(0);
    counter!("mailsender_events_dropped_total").absolute(0);
    for kind in APPEND_ERROR_KINDS {
        counter!("mailsender_append_errors_total", "error_type" => kind).absolute(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::Mutex;

    /// Recorder that keeps described and registered counter names.
    #[derive(Default)]
    struct NameRecorder {
        described: Mutex<Vec<String>>,
        registered: Mutex<Vec<String>>,
    }

    impl Recorder for NameRecorder {
        fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, _description: SharedString) {
            self.described.lock().unwrap().push(key.as_str().to_string());
        }

        fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn describe_histogram(
            &self,
            _key: KeyName,
            _unit: Option<Unit>,
            _description: SharedString,
        ) {
        }

        fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
            self.registered.lock().unwrap().push(key.name().to_string());
            Counter::noop()
        }

        fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn descriptions_cover_every_counter() {
        let recorder = NameRecorder::default();
        metrics::with_local_recorder(&recorder, register_metric_descriptions);

        let described = recorder.described.lock().unwrap();
        for name in COUNTERS {
            assert!(described.iter().any(|d| d == name), "{} not described", name);
        }
    }

    #[test]
    fn initialize_registers_error_label_per_kind() {
        let recorder = NameRecorder::default();
        metrics::with_local_recorder(&recorder, initialize_metrics);

        let registered = recorder.registered.lock().unwrap();
        let errors = registered
            .iter()
            .filter(|name| *name == "mailsender_append_errors_total")
            .count();
        assert_eq!(errors, APPEND_ERROR_KINDS.len());
    }

    #[test]
    fn functions_are_noops_without_recorder() {
        register_metric_descriptions();
        initialize_metrics();
    }
}
