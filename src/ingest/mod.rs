//! # Ingestion Module
//!
//! Everything between the MQTT broker and the shared history: connection
//! lifecycle, message delivery, and the signal that tells the presentation
//! side new data arrived.
//!
//! ```text
//! ingest/
//! ├── listener.rs - Broker connection state machine and message delivery
//! └── notifier.rs - Coalesced data-available signal for the renderer
//! ```
//!
//! The listener runs on its own tokio task and never waits on the
//! presentation side; the notifier is the only coupling between the two,
//! and it is fire-and-forget.

pub mod listener;
pub mod notifier;
