//! Concrete sample sources: JSONL replay, stdin, and TCP line streams.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use super::{parse_event, SampleSource, SourceEvent};

// ============================================================================
// JSONL Source (file replay with pacing)
// ============================================================================

/// Replays a JSONL telemetry log, pacing events by their recorded
/// timestamps scaled down by a speedup factor.
pub struct JsonlSource {
    events: std::vec::IntoIter<SourceEvent>,
    speedup: f64,
    last_ts: Option<f64>,
}

impl JsonlSource {
    /// Load and parse the whole log up front. Malformed lines are counted
    /// and skipped.
    pub fn load(path: &Path, speedup: f64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read telemetry log {}", path.display()))?;

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_event(line) {
                Some(ev) => events.push(ev),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "skipped malformed lines in telemetry log");
        }
        info!(path = %path.display(), events = events.len(), speedup, "Telemetry log loaded");

        Ok(Self {
            events: events.into_iter(),
            speedup: if speedup > 0.0 { speedup } else { 1.0 },
            last_ts: None,
        })
    }
}

#[async_trait]
impl SampleSource for JsonlSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        let Some(event) = self.events.next() else {
            return Ok(SourceEvent::Eof);
        };

        // Sleep the scaled inter-sample gap, clamped so a log with a clock
        // jump cannot stall the replay.
        if let SourceEvent::Telemetry(ref sample) = event {
            if let Some(ts) = sample.timestamp {
                if let Some(last) = self.last_ts {
                    let gap = ((ts - last) / self.speedup).clamp(0.0, 5.0);
                    if gap > 0.0 {
                        tokio::time::sleep(tokio::time::Duration::from_secs_f64(gap)).await;
                    }
                }
                self.last_ts = Some(ts);
            }
        }
        Ok(event)
    }

    fn source_name(&self) -> &str {
        "JSONL"
    }
}

// ============================================================================
// Stdin Source (one JSON object per line)
// ============================================================================

/// Reads JSON events from stdin.
///
/// Used with a simulator or a broker bridge:
/// `telemetry_bridge | paceline --stdin`
pub struct StdinSource {
    reader: BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(2048),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for StdinSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SourceEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match parse_event(line) {
                Some(event) => return Ok(event),
                None => {
                    warn!("[StdinSource] skipping malformed line");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// TCP Source (newline-delimited JSON with reconnection)
// ============================================================================

/// Maximum reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial reconnection delay (doubles each attempt).
const INITIAL_RECONNECT_DELAY_SECS: u64 = 2;

/// Maximum reconnection delay cap (seconds).
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Reads newline-delimited JSON events from a TCP connection, reconnecting
/// with exponential backoff on disconnect.
pub struct TcpSource {
    addr: String,
    reader: Option<BufReader<TcpStream>>,
    line_buffer: String,
    reconnect_attempts: u32,
}

impl TcpSource {
    /// Connect to a telemetry server and return a ready source.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to telemetry server {addr}"))?;
        info!(addr, "Connected to telemetry server");
        Ok(Self {
            addr: addr.to_string(),
            reader: Some(BufReader::new(stream)),
            line_buffer: String::with_capacity(2048),
            reconnect_attempts: 0,
        })
    }

    /// Reconnect with exponential backoff. Errors once attempts are
    /// exhausted.
    async fn reconnect(&mut self) -> Result<()> {
        self.reader = None;
        loop {
            if self.reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
                anyhow::bail!(
                    "giving up on {} after {} reconnection attempts",
                    self.addr,
                    self.reconnect_attempts
                );
            }
            let delay = (INITIAL_RECONNECT_DELAY_SECS << self.reconnect_attempts.min(5))
                .min(MAX_RECONNECT_DELAY_SECS);
            self.reconnect_attempts += 1;
            warn!(
                addr = %self.addr,
                attempt = self.reconnect_attempts,
                delay_secs = delay,
                "telemetry connection lost, reconnecting"
            );
            tokio::time::sleep(tokio::time::Duration::from_secs(delay)).await;

            match TcpStream::connect(&self.addr).await {
                Ok(stream) => {
                    info!(addr = %self.addr, "Reconnected to telemetry server");
                    self.reader = Some(BufReader::new(stream));
                    self.reconnect_attempts = 0;
                    return Ok(());
                }
                Err(e) => {
                    warn!(addr = %self.addr, error = %e, "reconnect attempt failed");
                }
            }
        }
    }
}

#[async_trait]
impl SampleSource for TcpSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        loop {
            if self.reader.is_none() {
                self.reconnect().await?;
            }
            let Some(reader) = self.reader.as_mut() else {
                continue;
            };

            self.line_buffer.clear();
            match reader.read_line(&mut self.line_buffer).await {
                Ok(0) => {
                    // Peer closed; try to pick the stream back up.
                    self.reader = None;
                }
                Ok(_) => {
                    let line = self.line_buffer.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(event) = parse_event(line) {
                        return Ok(event);
                    }
                    warn!("[TcpSource] skipping malformed line");
                }
                Err(e) => {
                    warn!(error = %e, "telemetry read error");
                    self.reader = None;
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "TCP"
    }
}
