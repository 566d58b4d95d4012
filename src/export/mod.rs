//! # Export Module
//!
//! On-demand handoff of the decimated reading buffer to a durable table
//! sink. Nothing here runs on a timer: the trigger fires only on an
//! explicit user command and never mutates the history, so exports can be
//! repeated at will.
//!
//! ```text
//! export/
//! ├── sink.rs    - TableSink trait and the CSV file implementation
//! └── trigger.rs - Snapshot-and-write entry point
//! ```

pub mod sink;
pub mod trigger;
