//! HTTP wire protocol.
//!
//! This module owns **every record that crosses the HTTP boundary** between
//! the bridge and an external tool, plus the path and header names the
//! request adapter dispatches on.
//!
//! ## Endpoints
//!
//! | Path         | Method | Request body            | Response body                  |
//! |--------------|--------|-------------------------|--------------------------------|
//! | `/structure` | POST   | structure container     | [`StatusResponse`]             |
//! | `/structure` | GET    | *(none)*                | structure container or text    |
//! | `/players`   | GET    | *(none)*                | `[`[`PlayerInfo`]`]`           |
//!
//! ## Design rules
//!
//! 1. Every JSON record is `Serialize + Deserialize` with the field names the
//!    existing tooling expects.
//! 2. Failures always answer with an [`ErrorResponse`] and a non-2xx status.
//! 3. Binary responses are never JSON-wrapped.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Response records
// ---------------------------------------------------------------------------

/// Outcome of a structure placement.
///
/// `status` is true when at least one block in the world changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: bool,
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code, repeated for clients that only read the body.
    pub status: u16,
    pub message: String,
}

/// One online player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ---------------------------------------------------------------------------
// Paths, headers, content types
// ---------------------------------------------------------------------------

pub mod paths {
    pub const STRUCTURE: &str = "/structure";
    pub const PLAYERS: &str = "/players";
}

/// Header names, lower-cased as the adapter stores them.
pub mod headers {
    pub const ACCEPT: &str = "accept";
    pub const ACCEPT_ENCODING: &str = "accept-encoding";
    pub const CONTENT_ENCODING: &str = "content-encoding";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
}

pub mod content_types {
    pub const JSON: &str = "application/json; charset=UTF-8";
    pub const TEXT: &str = "text/plain; charset=UTF-8";
    pub const BINARY: &str = "application/octet-stream";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_shape() {
        let json = serde_json::to_string(&StatusResponse { status: true }).unwrap();
        assert_eq!(json, r#"{"status":true}"#);
    }

    #[test]
    fn player_info_round_trips() {
        let p = PlayerInfo {
            name: "alex".into(),
            x: 1.5,
            y: 64.0,
            z: -3.25,
        };
        let back: PlayerInfo = serde_json::from_str(&serde_json::to_string(&p).unwrap()).unwrap();
        assert_eq!(back, p);
    }
}
