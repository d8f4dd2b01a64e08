//! Outbound side of the transport boundary: cues and status heartbeats.
//!
//! The processing loop never blocks on a publish. Outbound messages go
//! through a bounded mpsc channel into a writer task; a full channel or a
//! failed write is logged and the message discarded. Cues are best-effort: a
//! missed cue is recovered by the next confirmed state change or the red
//! re-announcement.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coach::CoachState;
use crate::types::{Cue, StatusReport};

/// Anything headed out to the transport.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Cue(Cue),
    Status(StatusReport),
}

/// Trait abstracting where outbound messages go.
#[async_trait]
pub trait CueSink: Send + 'static {
    async fn publish(&mut self, msg: &OutboundMessage) -> Result<()>;
}

/// Writes one JSON object per line to any async writer (stdout, a file, a
/// TCP socket).
pub struct JsonLineSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send + 'static> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> CueSink for JsonLineSink<W> {
    async fn publish(&mut self, msg: &OutboundMessage) -> Result<()> {
        let mut line = serde_json::to_vec(msg)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Cheap handle for enqueueing outbound messages from the pipeline side.
#[derive(Clone)]
pub struct EgressHandle {
    tx: mpsc::Sender<OutboundMessage>,
}

impl EgressHandle {
    /// Fire-and-forget cue publish.
    pub fn publish_cue(&self, cue: Cue) {
        if let Err(e) = self.tx.try_send(OutboundMessage::Cue(cue)) {
            warn!(error = %e, "cue publish dropped");
        }
    }

    /// Fire-and-forget status publish.
    pub fn publish_status(&self, report: StatusReport) {
        if let Err(e) = self.tx.try_send(OutboundMessage::Status(report)) {
            debug!(error = %e, "status publish dropped");
        }
    }
}

/// Create the egress channel and spawn the writer task.
///
/// The task drains the channel until every handle is dropped, so in-flight
/// messages still go out during shutdown.
pub fn spawn_egress<S: CueSink>(mut sink: S, queue_depth: usize) -> (EgressHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(queue_depth);
    let task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sink.publish(&msg).await {
                warn!(error = %e, "outbound publish failed, message discarded");
            }
        }
        info!("Egress writer finished");
    });
    (EgressHandle { tx }, task)
}

/// Spawn the periodic heartbeat task.
///
/// Publishes a status report every `interval_secs` from the shared snapshot
/// the processing loop maintains. Independent of cue logic by design.
pub fn spawn_heartbeat(
    egress: EgressHandle,
    shared: Arc<RwLock<CoachState>>,
    interval_secs: f64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = tokio::time::Duration::from_secs_f64(interval_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            let report = {
                let state = shared.read().await;
                StatusReport {
                    timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
                    status: "alive".to_string(),
                    gate_open: state.gate_open,
                    stats: state.stats,
                }
            };
            egress.publish_status(report);
        }
        info!("Heartbeat task finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cue, CueKind, DrivingState, EvaluationResult, PipelineStats, ZoneKind};

    fn test_cue() -> Cue {
        let eval = EvaluationResult {
            zone_id: "TURN_1".to_string(),
            zone_kind: ZoneKind::Turn,
            state: DrivingState::Red,
            deviation: 2.0,
            speed_dev: 2.0,
            power_dev: 0.0,
            timestamp: 10.0,
        };
        Cue::new(&eval, DrivingState::Red, CueKind::Coast)
    }

    /// Sink that captures published messages for assertions.
    struct CaptureSink {
        tx: mpsc::UnboundedSender<OutboundMessage>,
    }

    #[async_trait]
    impl CueSink for CaptureSink {
        async fn publish(&mut self, msg: &OutboundMessage) -> Result<()> {
            self.tx.send(msg.clone()).map_err(|e| anyhow::anyhow!("{e}"))
        }
    }

    #[tokio::test]
    async fn egress_delivers_and_drains_on_shutdown() {
        let (capture_tx, mut capture_rx) = mpsc::unbounded_channel();
        let (handle, task) = spawn_egress(CaptureSink { tx: capture_tx }, 8);

        handle.publish_cue(test_cue());
        handle.publish_status(StatusReport {
            timestamp: 1.0,
            status: "alive".to_string(),
            gate_open: true,
            stats: PipelineStats::default(),
        });
        drop(handle);
        task.await.unwrap();

        assert!(matches!(capture_rx.recv().await.unwrap(), OutboundMessage::Cue(_)));
        assert!(matches!(capture_rx.recv().await.unwrap(), OutboundMessage::Status(_)));
        assert!(capture_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn json_line_sink_writes_tagged_lines() {
        let mut sink = JsonLineSink::new(std::io::Cursor::new(Vec::new()));
        sink.publish(&OutboundMessage::Cue(test_cue())).await.unwrap();
        let line = String::from_utf8(sink.writer.into_inner()).unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"cue""#));
        assert!(line.contains(r#""zone_id":"TURN_1""#));
    }

    #[tokio::test]
    async fn heartbeat_publishes_until_cancelled() {
        let (capture_tx, mut capture_rx) = mpsc::unbounded_channel();
        let (handle, egress_task) = spawn_egress(CaptureSink { tx: capture_tx }, 8);

        let shared = Arc::new(RwLock::new(CoachState::default()));
        let cancel = CancellationToken::new();
        let hb = spawn_heartbeat(handle, shared, 0.01, cancel.clone());

        let first = capture_rx.recv().await.unwrap();
        assert!(matches!(first, OutboundMessage::Status(_)));

        cancel.cancel();
        hb.await.unwrap();
        egress_task.await.unwrap();
    }
}
