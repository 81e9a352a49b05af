//! Request-level error taxonomy.
//!
//! Each layer has its own error type; [`BridgeError`] gathers them at the
//! request boundary and decides the HTTP status.

use crate::codec::{DecodeError, EncodeError};
use crate::placer::PlacementError;
use crate::protocol::ErrorResponse;
use crate::world::WorldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Could not parse query parameter: {0}")]
    Input(String),

    #[error("Method not allowed. Only POST and GET requests are supported.")]
    MethodNotAllowed,

    #[error("No handler for {0}")]
    NotFound(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Capture of {volume} blocks exceeds the limit of {limit}")]
    CaptureTooLarge { volume: u64, limit: u64 },

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Could not place structure: {0}")]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Could not encode structure: {0}")]
    Encode(#[from] EncodeError),

    #[error("World error: {0}")]
    World(#[from] WorldError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Input(_)
            | BridgeError::Malformed(_)
            | BridgeError::CaptureTooLarge { .. }
            | BridgeError::Placement(_)
            | BridgeError::Decode(_) => 400,
            BridgeError::NotFound(_) => 404,
            BridgeError::MethodNotAllowed => 405,
            BridgeError::PayloadTooLarge(_) => 413,
            BridgeError::Encode(_) | BridgeError::World(_) | BridgeError::Internal(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status: self.status_code(),
            message: self.to_string(),
        }
    }
}
