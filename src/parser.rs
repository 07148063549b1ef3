//! JSON decoder for inbound feed frames.

use serde::Deserialize;
use thiserror::Error;

use crate::model::StatePayload;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Current reading plus the latest alerts.
    State(StatePayload),
    /// Any other message kind, e.g. the feed's `pong`.
    Ignored { kind: String },
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("malformed frame envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed state payload: {0}")]
    StatePayload(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decodes a `{type, payload}` envelope.
///
/// # Errors
///
/// Returns an error if the text is not a JSON envelope with a `type`, or if
/// a `state` frame carries a payload that does not decode.
pub fn decode_frame(text: &str) -> Result<FeedMessage, FrameError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Envelope)?;

    match envelope.kind.as_str() {
        "state" => {
            let payload = if envelope.payload.is_null() {
                StatePayload::default()
            } else {
                serde_json::from_value(envelope.payload).map_err(FrameError::StatePayload)?
            };
            Ok(FeedMessage::State(payload))
        }
        _ => Ok(FeedMessage::Ignored {
            kind: envelope.kind,
        }),
    }
}
