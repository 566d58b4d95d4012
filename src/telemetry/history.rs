//! Shared append-only reading history with export decimation.
//!
//! One `History` instance is created at startup and shared by `Arc` between
//! the ingestion task, the presentation task, and the export trigger. All
//! buffer access goes through a single mutex; critical sections are O(1)
//! for appends and a plain copy for snapshots, so no caller is ever blocked
//! for long.

use std::sync::Mutex;

use crate::telemetry::reading::Reading;

/// A capture lands in the export buffer on every 12th successful reading.
///
/// The counter starts at 0 and increments per append; once it exceeds this
/// threshold the reading is captured and the counter resets, which puts
/// captures on readings 12, 24, 36, … of each uninterrupted run.
const CAPTURE_THRESHOLD: u32 = 10;

#[derive(Debug, Default)]
struct Buffers {
    series: Vec<Reading>,
    export_buffer: Vec<Reading>,
    sample_counter: u32,
}

/// Thread-safe store for the full series and the decimated export subset.
///
/// Append-only: nothing is ever evicted or rewritten, so snapshots taken at
/// different times are always prefixes of later ones.
#[derive(Debug, Default)]
pub struct History {
    buffers: Mutex<Buffers>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reading and applies the decimation policy.
    ///
    /// Safe to call concurrently with snapshot reads; the counter only
    /// advances here, so parse failures (which never reach this method)
    /// leave the decimation cadence untouched.
    pub fn append(&self, reading: Reading) {
        let mut buffers = self.lock();
        buffers.series.push(reading);
        if buffers.sample_counter > CAPTURE_THRESHOLD {
            buffers.export_buffer.push(reading);
            buffers.sample_counter = 0;
        } else {
            buffers.sample_counter += 1;
        }
    }

    /// Point-in-time copy of the full series, in arrival order.
    pub fn snapshot_series(&self) -> Vec<Reading> {
        self.lock().series.clone()
    }

    /// Point-in-time copy of the decimated export buffer.
    ///
    /// Read-only; repeated calls without intervening appends return
    /// identical sequences, so exports can be retried freely.
    pub fn export_snapshot(&self) -> Vec<Reading> {
        self.lock().export_buffer.clone()
    }

    /// Current decimation counter, for status display and tests.
    pub fn sample_counter(&self) -> u32 {
        self.lock().sample_counter
    }

    pub fn len(&self) -> usize {
        self.lock().series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffers> {
        // A poisoned lock means an appender panicked; the buffers are
        // append-only and stay well-formed, so keep serving readers.
        match self.buffers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
