use serde_json::{Map, Value};

use super::types::{RelayError, Role};

const TYPE_SENDER: &str = "sender";
const TYPE_RECEIVER: &str = "receiver";
const TYPE_SIGN_PREDICTION: &str = "signPrediction";
const TYPE_TRANSCRIPTION: &str = "transcription";

/// Inbound message, classified by its `type` field.
///
/// Only the fields needed for routing and logging are lifted out; the relay
/// always forwards the frame exactly as it arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Role claim for the sender slot
    Sender,

    /// Role claim for the receiver slot
    Receiver,

    /// Sign-language prediction, only ever delivered to the receiver
    SignPrediction {
        target: Option<Role>,
        label: Option<String>,
        confidence: Option<f64>,
    },

    /// Live transcription text, delivered to whichever role `target` names
    Transcription {
        target: Option<Role>,
        text: Option<String>,
        is_final: Option<bool>,
    },

    /// Anything else: offer/answer/ICE candidate or an unknown type.
    /// `kind` is `None` when `type` is missing or not a string.
    Signaling {
        kind: Option<String>,
        target: Option<Role>,
        payload: Map<String, Value>,
    },
}

/// Where an envelope goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Occupy the given slot, nothing is forwarded
    Claim(Role),
    /// Deliver to a single slot
    Forward(Role),
    /// Deliver to the sender slot, then the receiver slot
    Broadcast,
    /// Deliver to nobody
    Discard,
}

impl Envelope {
    /// Parse a raw frame.
    ///
    /// Invalid JSON and `null` are rejected. Any other non-object value has
    /// neither `type` nor `target`, so it is untyped signaling and broadcasts.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let mut fields = match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => fields,
            Value::Null => return Err(RelayError::NullEnvelope),
            _ => Map::new(),
        };

        let kind = match fields.remove("type") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        // an unrecognized target routes the same as a missing one
        let target = fields
            .get("target")
            .and_then(Value::as_str)
            .and_then(Role::from_wire);

        match kind.as_deref() {
            Some(TYPE_SENDER) => return Ok(Envelope::Sender),
            Some(TYPE_RECEIVER) => return Ok(Envelope::Receiver),
            Some(TYPE_SIGN_PREDICTION) => {
                return Ok(Envelope::SignPrediction {
                    target,
                    label: string_field(&fields, "label"),
                    confidence: fields.get("confidence").and_then(Value::as_f64),
                });
            }
            Some(TYPE_TRANSCRIPTION) => {
                return Ok(Envelope::Transcription {
                    target,
                    text: string_field(&fields, "text"),
                    is_final: fields.get("isFinal").and_then(Value::as_bool),
                });
            }
            _ => {}
        }

        fields.remove("target");
        Ok(Envelope::Signaling {
            kind,
            target,
            payload: fields,
        })
    }

    /// The `type` string, or `"<untyped>"` for signaling without one
    pub fn kind(&self) -> &str {
        match self {
            Envelope::Sender => TYPE_SENDER,
            Envelope::Receiver => TYPE_RECEIVER,
            Envelope::SignPrediction { .. } => TYPE_SIGN_PREDICTION,
            Envelope::Transcription { .. } => TYPE_TRANSCRIPTION,
            Envelope::Signaling { kind, .. } => kind.as_deref().unwrap_or("<untyped>"),
        }
    }

    pub fn target(&self) -> Option<Role> {
        match self {
            Envelope::Sender | Envelope::Receiver => None,
            Envelope::SignPrediction { target, .. }
            | Envelope::Transcription { target, .. }
            | Envelope::Signaling { target, .. } => *target,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Envelope::Sender => Route::Claim(Role::Sender),
            Envelope::Receiver => Route::Claim(Role::Receiver),
            // unidirectional: sign predictions never flow towards the sender
            Envelope::SignPrediction {
                target: Some(Role::Receiver),
                ..
            } => Route::Forward(Role::Receiver),
            Envelope::SignPrediction { .. } => Route::Discard,
            Envelope::Transcription {
                target: Some(role),
                ..
            } => Route::Forward(*role),
            Envelope::Transcription { target: None, .. } => Route::Discard,
            Envelope::Signaling {
                target: Some(role),
                ..
            } => Route::Forward(*role),
            Envelope::Signaling { target: None, .. } => Route::Broadcast,
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_owned)
}
