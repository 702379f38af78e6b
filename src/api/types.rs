//! API request and response types

use crate::geo::{GeoError, GeoPoint};
use crate::state_machine::{Command, Event};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chat update posted by the transport adapter
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Text {
        text: String,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    /// Uploaded file, base64 encoded
    Document {
        file_name: String,
        data: String,
    },
    /// Inline keyboard callback data
    Button {
        data: String,
    },
    /// Command name without the leading `/`
    Command {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum InboundError {
    #[error("document data is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error(transparent)]
    Geometry(#[from] GeoError),
}

impl InboundEvent {
    /// Decode into a state machine event
    pub fn into_event(self) -> Result<Event, InboundError> {
        let event = match self {
            // Plain text may still be a `/command` typed by the user
            InboundEvent::Text { text } => Event::from_message(&text),
            InboundEvent::Location {
                latitude,
                longitude,
            } => Event::Location {
                point: GeoPoint::checked(latitude, longitude)?,
            },
            InboundEvent::Document { file_name, data } => Event::Document {
                file_name,
                data: BASE64.decode(data.trim())?,
            },
            InboundEvent::Button { data } => Event::button(&data),
            InboundEvent::Command { name, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                let name = name.trim_start_matches('/');
                Event::Command(Command::from_parts(name, &args))
            }
        };
        Ok(event)
    }
}

/// Response for a posted event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub queued: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
