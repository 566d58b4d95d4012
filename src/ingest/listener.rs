//! MQTT connection lifecycle and message delivery.
//!
//! The listener owns the broker connection end to end: it connects,
//! subscribes to the telemetry topic, and feeds every delivered payload
//! through the parser into the shared history. Connectivity is reported to
//! the rest of the application over a `watch` channel, so the UI side can
//! observe state changes without ever touching the ingestion task.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected ──► Subscribed
//!                      │              │              │
//!                      └──────────────┴──► Disconnected (transport failure)
//!                                     └──────────────┴──► Stopped (shutdown)
//! ```
//!
//! There is no automatic reconnection: a transport failure ends the
//! ingestion loop in `Disconnected` with the reason recorded in the status,
//! and recovery means spawning a fresh listener.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::ingest::notifier::RenderNotifier;
use crate::telemetry::history::History;
use crate::telemetry::reading;

/// How long a stopping listener keeps polling to flush the DISCONNECT
/// packet before giving up and dropping the connection.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    /// Terminal; only reached through [`ListenerHandle::stop`].
    Stopped,
}

/// Connectivity and delivery counters published over the status channel.
#[derive(Clone, Debug, Default)]
pub struct ListenerStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    /// Payloads delivered by the broker, parseable or not.
    pub messages_received: usize,
    pub parse_failures: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// Owns the broker connection and runs the ingestion loop on its own task.
pub struct TelemetryListener {
    client: AsyncClient,
    eventloop: rumqttc::EventLoop,
    topic: String,
    history: Arc<History>,
    notifier: RenderNotifier,
    status_tx: watch::Sender<ListenerStatus>,
    shutdown: CancellationToken,
}

/// Handle for stopping the ingestion task.
pub struct ListenerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Requests shutdown: unsubscribe, disconnect, transition to `Stopped`.
    /// Idempotent; repeated calls are no-ops.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the ingestion task to finish.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

impl TelemetryListener {
    /// Starts the connection asynchronously and returns immediately.
    ///
    /// Connection or subscription failure is reported through the returned
    /// status receiver, not as an error here; the listener simply ends up
    /// `Disconnected` with the reason recorded.
    pub fn spawn(
        config: &MonitorConfig,
        history: Arc<History>,
        notifier: RenderNotifier,
    ) -> (ListenerHandle, watch::Receiver<ListenerStatus>) {
        info!(
            host = %config.broker_host,
            port = config.broker_port,
            topic = %config.topic,
            "Starting telemetry listener"
        );

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, eventloop) = AsyncClient::new(options, 100);
        let (status_tx, status_rx) = watch::channel(ListenerStatus::default());
        let shutdown = CancellationToken::new();

        let listener = TelemetryListener {
            client,
            eventloop,
            topic: config.topic.clone(),
            history,
            notifier,
            status_tx,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(listener.run());

        (ListenerHandle { shutdown, task }, status_rx)
    }

    async fn run(mut self) {
        self.transition(ConnectionState::Connecting);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.shutdown_connection().await;
                    return;
                }
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            info!("Connected to MQTT broker");
                            self.transition(ConnectionState::Connected);
                            if let Err(e) = self
                                .client
                                .subscribe(self.topic.clone(), QoS::AtMostOnce)
                                .await
                            {
                                self.fail(format!("Subscription request failed: {}", e));
                                return;
                            }
                        } else {
                            self.fail(format!(
                                "Broker refused connection, return code {:?}",
                                ack.code
                            ));
                            return;
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        info!(topic = %self.topic, "Subscribed to telemetry topic");
                        self.transition(ConnectionState::Subscribed);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        deliver(
                            &publish.topic,
                            &publish.payload,
                            &self.history,
                            &self.notifier,
                            &self.status_tx,
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.fail(format!("Transport failure: {}", e));
                        return;
                    }
                },
            }
        }
    }

    /// Flushes UNSUBSCRIBE/DISCONNECT to the broker, bounded by
    /// [`SHUTDOWN_DRAIN`] in case the connection never came up.
    async fn shutdown_connection(&mut self) {
        info!("Stopping telemetry listener");
        let _ = self.client.unsubscribe(self.topic.clone()).await;
        let _ = self.client.disconnect().await;

        let drain = async {
            while let Ok(event) = self.eventloop.poll().await {
                if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                    break;
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN, drain).await.is_err() {
            debug!("Dropping broker connection without a clean DISCONNECT");
        }

        self.transition(ConnectionState::Stopped);
    }

    fn transition(&self, state: ConnectionState) {
        info!(state = ?state, "Connection state changed");
        self.status_tx
            .send_modify(|status| status.connection_state = state);
    }

    fn fail(&self, reason: String) {
        error!(reason = %reason, "Listener entering Disconnected");
        self.status_tx.send_modify(|status| {
            status.connection_state = ConnectionState::Disconnected;
            status.error_messages.push(reason);
        });
    }
}

/// Processes one delivered payload: decode, parse, append, signal.
///
/// A malformed payload is logged and counted but never interrupts the
/// subscription; the decimation counter only advances on successful parses
/// because only those reach `History::append`.
fn deliver(
    topic: &str,
    payload: &[u8],
    history: &History,
    notifier: &RenderNotifier,
    status_tx: &watch::Sender<ListenerStatus>,
) {
    status_tx.send_modify(|status| {
        status.messages_received += 1;
        status.last_activity = Some(Local::now());
    });

    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(_) => {
            warn!(topic = %topic, "Skipping payload that is not valid UTF-8");
            status_tx.send_modify(|status| {
                status.parse_failures += 1;
                status
                    .error_messages
                    .push("payload is not valid UTF-8".to_string());
            });
            return;
        }
    };
    debug!(topic = %topic, payload = %text, "Received message");

    match reading::parse(text) {
        Ok(reading) => {
            history.append(reading);
            notifier.signal();
        }
        Err(e) => {
            warn!(error = %e, "Skipping malformed payload");
            status_tx.send_modify(|status| {
                status.parse_failures += 1;
                status.error_messages.push(e.to_string());
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery_fixture() -> (
        Arc<History>,
        RenderNotifier,
        watch::Sender<ListenerStatus>,
        watch::Receiver<ListenerStatus>,
    ) {
        let (status_tx, status_rx) = watch::channel(ListenerStatus::default());
        (
            Arc::new(History::new()),
            RenderNotifier::new(),
            status_tx,
            status_rx,
        )
    }

    #[test]
    fn bad_payload_is_skipped_without_breaking_the_run() {
        let (history, notifier, status_tx, status_rx) = delivery_fixture();
        for payload in ["98.6,72", "99.1,75", "bad", "97.0,68"] {
            deliver("SB_PI_DATA", payload.as_bytes(), &history, &notifier, &status_tx);
        }

        let series = history.snapshot_series();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].temperature, 98.6);
        assert_eq!(series[2].pulse, 68.0);
        assert_eq!(history.sample_counter(), 3);
        assert!(history.export_snapshot().is_empty());

        let status = status_rx.borrow();
        assert_eq!(status.messages_received, 4);
        assert_eq!(status.parse_failures, 1);
        assert_eq!(status.error_messages.len(), 1);
        assert!(status.error_messages[0].contains("bad"));
    }

    #[test]
    fn twelve_valid_messages_capture_one_export_entry() {
        let (history, notifier, status_tx, _status_rx) = delivery_fixture();
        for n in 0..12 {
            let payload = format!("{},{}", 98.0 + n as f64, 70 + n);
            deliver("SB_PI_DATA", payload.as_bytes(), &history, &notifier, &status_tx);
        }

        let exported = history.export_snapshot();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0], history.snapshot_series()[11]);
        assert_eq!(history.sample_counter(), 0);
    }

    #[tokio::test]
    async fn successful_delivery_signals_the_renderer() {
        let (history, notifier, status_tx, _status_rx) = delivery_fixture();
        deliver("SB_PI_DATA", b"98.6,72", &history, &notifier, &status_tx);

        let woken =
            tokio::time::timeout(Duration::from_millis(100), notifier.notified()).await;
        assert!(woken.is_ok());
    }

    #[test]
    fn non_utf8_payload_counts_as_parse_failure() {
        let (history, notifier, status_tx, status_rx) = delivery_fixture();
        deliver("SB_PI_DATA", &[0xff, 0xfe], &history, &notifier, &status_tx);

        assert!(history.is_empty());
        let status = status_rx.borrow();
        assert_eq!(status.parse_failures, 1);
        assert_eq!(status.messages_received, 1);
    }

    #[test]
    fn parse_failures_leave_the_decimation_cadence_alone() {
        let (history, notifier, status_tx, _status_rx) = delivery_fixture();
        for n in 0..11 {
            let payload = format!("98.{},{}", n, 70);
            deliver("SB_PI_DATA", payload.as_bytes(), &history, &notifier, &status_tx);
        }
        deliver("SB_PI_DATA", b"garbage", &history, &notifier, &status_tx);
        assert!(history.export_snapshot().is_empty());

        // The failure did not consume position 12; the next good reading does.
        deliver("SB_PI_DATA", b"98.6,72", &history, &notifier, &status_tx);
        assert_eq!(history.export_snapshot().len(), 1);
    }
}
