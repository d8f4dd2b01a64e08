//! Sample source abstraction for telemetry ingestion.
//!
//! Provides a unified trait for reading telemetry and control events from
//! different transports: JSONL files (replay), stdin, TCP line streams, and
//! a synthetic lap generator. Implementations handle format parsing,
//! reconnection, and pacing internally; the processing loop calls
//! [`SampleSource::next_event`] in a select! with cancellation.
//!
//! A single inbound stream carries both telemetry and control payloads.
//! Control payloads are recognized by shape and accept both styles:
//! `{"action": "enable"|"disable"}` and `{"enabled": true|false}`.

mod sim;
mod source;

pub use sim::SyntheticSource;
pub use source::{JsonlSource, StdinSource, TcpSource};

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ControlCommand, TelemetrySample};

/// Events produced by a sample source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A telemetry sample was read.
    Telemetry(TelemetrySample),
    /// A session control command was read.
    Control(ControlCommand),
    /// Source reached end of data (EOF for files/stdin, permanent
    /// disconnect for TCP).
    Eof,
}

/// Trait abstracting where telemetry events come from.
#[async_trait]
pub trait SampleSource: Send {
    /// Read the next event from the source.
    ///
    /// Returns `SourceEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable errors (e.g. failed reconnection).
    async fn next_event(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging (e.g. "JSONL", "stdin", "TCP").
    fn source_name(&self) -> &str;
}

/// Parse one inbound JSON line into a source event.
///
/// Returns `None` for lines that are neither valid control nor valid
/// telemetry payloads; sources skip those and keep reading.
pub fn parse_event(line: &str) -> Option<SourceEvent> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if !value.is_object() {
        return None;
    }

    // Control payloads are routed by shape: either key marks the line as
    // control, and `action` wins over `enabled` when both are present.
    let action = value.get("action").and_then(|a| a.as_str());
    let enabled = value.get("enabled").and_then(serde_json::Value::as_bool);
    if action.is_some() || enabled.is_some() {
        let open = match action.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
            Some("enable") => Some(true),
            Some("disable") => Some(false),
            _ => enabled,
        };
        return open.map(|o| SourceEvent::Control(ControlCommand::SetSession(o)));
    }

    serde_json::from_value::<TelemetrySample>(value)
        .ok()
        .map(SourceEvent::Telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_line_parses() {
        let ev = parse_event(r#"{"ts": 1.0, "latitude": 40.0, "longitude": -77.0, "speed": 30.0}"#)
            .unwrap();
        match ev {
            SourceEvent::Telemetry(sample) => assert_eq!(sample.speed, Some(30.0)),
            other => panic!("expected telemetry, got {other:?}"),
        }
    }

    #[test]
    fn control_action_styles_parse() {
        assert_eq!(
            parse_event(r#"{"action": "enable"}"#),
            Some(SourceEvent::Control(ControlCommand::SetSession(true)))
        );
        assert_eq!(
            parse_event(r#"{"action": "DISABLE"}"#),
            Some(SourceEvent::Control(ControlCommand::SetSession(false)))
        );
        assert_eq!(
            parse_event(r#"{"enabled": false}"#),
            Some(SourceEvent::Control(ControlCommand::SetSession(false)))
        );
    }

    #[test]
    fn action_wins_over_enabled() {
        assert_eq!(
            parse_event(r#"{"action": "enable", "enabled": false}"#),
            Some(SourceEvent::Control(ControlCommand::SetSession(true)))
        );
    }

    #[test]
    fn unknown_action_with_enabled_falls_back() {
        assert_eq!(
            parse_event(r#"{"action": "restart", "enabled": true}"#),
            Some(SourceEvent::Control(ControlCommand::SetSession(true)))
        );
        // Unknown action alone is dropped rather than misread as telemetry.
        assert_eq!(parse_event(r#"{"action": "restart"}"#), None);
    }

    #[test]
    fn garbage_lines_are_skipped() {
        assert_eq!(parse_event("not json"), None);
        assert_eq!(parse_event("[1, 2, 3]"), None);
    }
}
