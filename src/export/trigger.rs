//! Snapshot-and-write entry point for the decimated buffer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::export::sink::{SinkError, TableSink};
use crate::telemetry::history::History;

/// Export failed; the history is unaffected and the export can be retried.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// What a successful export wrote and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReport {
    pub rows_written: usize,
    pub destination: PathBuf,
}

/// Stateless adapter between a user command and the table sink.
pub struct ExportTrigger {
    history: Arc<History>,
    sink: Box<dyn TableSink>,
    destination: PathBuf,
}

impl ExportTrigger {
    pub fn new(history: Arc<History>, sink: Box<dyn TableSink>, destination: PathBuf) -> Self {
        Self {
            history,
            sink,
            destination,
        }
    }

    /// Snapshots the export buffer and hands it to the sink.
    ///
    /// An empty buffer is exported as an empty table and succeeds; sink
    /// failures come back to the caller, never swallowed.
    pub fn trigger_export(&self) -> Result<ExportReport, ExportError> {
        let rows = self.history.export_snapshot();
        self.sink.write_table(&rows, &self.destination)?;
        info!(
            rows = rows.len(),
            destination = %self.destination.display(),
            "Export written"
        );
        Ok(ExportReport {
            rows_written: rows.len(),
            destination: self.destination.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::reading::Reading;
    use std::path::Path;
    use std::sync::Mutex;

    /// Captures what the trigger hands over instead of touching disk.
    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<(Vec<Reading>, PathBuf)>>>,
    }

    impl TableSink for RecordingSink {
        fn write_table(&self, rows: &[Reading], destination: &Path) -> Result<(), SinkError> {
            self.calls
                .lock()
                .unwrap()
                .push((rows.to_vec(), destination.to_path_buf()));
            Ok(())
        }
    }

    struct FailingSink;

    impl TableSink for FailingSink {
        fn write_table(&self, _rows: &[Reading], destination: &Path) -> Result<(), SinkError> {
            Err(SinkError {
                destination: destination.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn filled_history(n: usize) -> Arc<History> {
        let history = Arc::new(History::new());
        for i in 0..n {
            history.append(Reading {
                temperature: 98.0 + i as f64,
                pulse: 70.0 + i as f64,
            });
        }
        history
    }

    #[test]
    fn empty_buffer_exports_an_empty_table_successfully() {
        let sink = RecordingSink::default();
        let trigger = ExportTrigger::new(
            Arc::new(History::new()),
            Box::new(sink.clone()),
            PathBuf::from("out.csv"),
        );

        let report = trigger.trigger_export().unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.destination, PathBuf::from("out.csv"));

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.is_empty());
    }

    #[test]
    fn hands_the_decimated_rows_to_the_sink() {
        let history = filled_history(24);
        let expected = history.export_snapshot();
        assert_eq!(expected.len(), 2);

        let sink = RecordingSink::default();
        let trigger = ExportTrigger::new(history, Box::new(sink.clone()), PathBuf::from("out.csv"));
        let report = trigger.trigger_export().unwrap();
        assert_eq!(report.rows_written, 2);

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls[0].0, expected);
        assert_eq!(calls[0].1, PathBuf::from("out.csv"));
    }

    #[test]
    fn repeated_exports_see_the_same_rows() {
        let history = filled_history(24);
        let trigger = ExportTrigger::new(
            Arc::clone(&history),
            Box::new(RecordingSink::default()),
            PathBuf::from("out.csv"),
        );

        let first = trigger.trigger_export().unwrap();
        let second = trigger.trigger_export().unwrap();
        assert_eq!(first, second);
        assert_eq!(history.export_snapshot().len(), 2);
    }

    #[test]
    fn sink_failure_propagates_and_leaves_history_intact() {
        let history = filled_history(24);
        let trigger = ExportTrigger::new(
            Arc::clone(&history),
            Box::new(FailingSink),
            PathBuf::from("out.csv"),
        );

        let err = trigger.trigger_export().unwrap_err();
        assert!(matches!(err, ExportError::Sink(_)));
        assert_eq!(history.export_snapshot().len(), 2);
        assert_eq!(history.len(), 24);
    }
}
