//! Table sinks the export trigger can hand readings to.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::telemetry::reading::Reading;

/// The sink could not write the table.
#[derive(Debug, thiserror::Error)]
#[error("Failed to write export table to {destination:?}: {source}")]
pub struct SinkError {
    pub destination: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Destination for exported reading tables.
///
/// The trigger stays agnostic of the on-disk format behind this seam; the
/// binary ships [`CsvFileSink`], tests substitute recording doubles.
pub trait TableSink: Send + Sync {
    fn write_table(&self, rows: &[Reading], destination: &Path) -> Result<(), SinkError>;
}

/// Writes a `temperature,pulse` CSV file, header included even when empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsvFileSink;

impl TableSink for CsvFileSink {
    fn write_table(&self, rows: &[Reading], destination: &Path) -> Result<(), SinkError> {
        let mut table = String::from("temperature,pulse\n");
        for reading in rows {
            // Infallible on String.
            let _ = writeln!(table, "{},{}", reading.temperature, reading.pulse);
        }
        fs::write(destination, table).map_err(|source| SinkError {
            destination: destination.to_path_buf(),
            source,
        })
    }
}
