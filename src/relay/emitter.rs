// SPDX-License-Identifier: MIT

//! Out-of-band progress notifications
//!
//! Steps publish status text and state snapshots to an observer. The channel
//! is fire-and-forget: nothing here participates in the state merge or in
//! routing, and a run behaves identically with no observer attached.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// A notification published on the side channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Free-text status message
    Status { text: String },
    /// Structured snapshot of selected state fields
    Snapshot { fields: Value },
}

/// Observer interface handed to steps through the run context
pub trait ProgressEmitter: Send + Sync {
    fn emit_status(&self, text: &str);
    fn emit_snapshot(&self, fields: Value);
}

/// Emitter backed by an unbounded channel; sends never block and a dropped
/// receiver is ignored
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressEmitter for ChannelEmitter {
    fn emit_status(&self, text: &str) {
        let _ = self.tx.send(ProgressEvent::Status {
            text: text.to_string(),
        });
    }

    fn emit_snapshot(&self, fields: Value) {
        let _ = self.tx.send(ProgressEvent::Snapshot { fields });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_emitter_delivers_events() {
        let (emitter, mut rx) = ChannelEmitter::new();

        emitter.emit_status("Classifying search intent");
        emitter.emit_snapshot(json!({"needs_search": true}));

        match rx.recv().await.unwrap() {
            ProgressEvent::Status { text } => assert_eq!(text, "Classifying search intent"),
            other => panic!("expected status, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            ProgressEvent::Snapshot { fields } => {
                assert_eq!(fields, json!({"needs_search": true}))
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (emitter, rx) = ChannelEmitter::new();
        drop(rx);

        // Must not panic or error
        emitter.emit_status("late");
        emitter.emit_snapshot(json!({}));
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::Status {
            text: "Routing: SEARCH".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["text"], "Routing: SEARCH");
    }
}
