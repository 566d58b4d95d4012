//! # Telemetry Module
//!
//! Value types and in-memory state for the smart-band data stream. This is
//! the heart of the pipeline: every payload the listener receives is turned
//! into a [`reading::Reading`] here and accumulated in a shared
//! [`history::History`].
//!
//! ```text
//! telemetry/
//! ├── reading.rs - Reading value type and payload parser
//! └── history.rs - Shared append-only series with export decimation
//! ```
//!
//! The split keeps the pure parsing logic independently testable from the
//! stateful history store.

pub mod history;
pub mod reading;
