//! Transport-independent request adapter.
//!
//! [`ApiRequest`] is what the HTTP layer hands over after framing; this
//! module turns its query string and headers into typed placement and
//! capture parameters and decides the response format.  [`ApiResponse`] is
//! what goes back.

use crate::capture::CaptureRegion;
use crate::codec::{CompressionHint, OutputFormat};
use crate::error::BridgeError;
use crate::placer::PlacementRequest;
use crate::protocol::{content_types, headers};
use crate::transform::{Mirror, Rotation, TransformSettings};
use crate::types::BlockPos;
use crate::world::BlockFlags;
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Method {
        if method.eq_ignore_ascii_case("GET") {
            Method::Get
        } else if method.eq_ignore_ascii_case("POST") {
            Method::Post
        } else {
            Method::Other
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Header names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// `target` is the request target as sent: path plus optional query.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, BTreeMap::new()),
        };
        Self {
            method: Method::parse(method),
            path: path.to_string(),
            query,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Content-Encoding: gzip` asserts a compressed body.
    pub fn compression_hint(&self) -> CompressionHint {
        CompressionHint::from_content_encoding(self.header(headers::CONTENT_ENCODING))
    }

    /// `Accept: text/plain` selects the text dump; otherwise binary,
    /// compressed unless `Accept-Encoding` leaves out gzip.
    pub fn output_format(&self) -> OutputFormat {
        let accept = self.header(headers::ACCEPT).unwrap_or("*/*");
        if accept.trim().eq_ignore_ascii_case("text/plain") {
            return OutputFormat::Text;
        }
        let accept_encoding = self.header(headers::ACCEPT_ENCODING).unwrap_or("gzip");
        OutputFormat::Binary {
            compressed: accept_encoding.to_ascii_lowercase().contains("gzip"),
        }
    }

    pub fn query(&self) -> Query<'_> {
        Query(&self.query)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![
                (headers::ALLOW_ORIGIN.to_string(), "*".to_string()),
                (headers::CONTENT_TYPE.to_string(), content_type.to_string()),
            ],
            body,
        }
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, content_types::JSON, body),
            Err(e) => Self::error(&BridgeError::Internal(e.to_string())),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, content_types::TEXT, body.into().into_bytes())
    }

    /// Structure bytes in `format`; binary compressed output is labelled
    /// with `Content-Encoding: gzip`.
    pub fn structure(body: Vec<u8>, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::new(200, content_types::TEXT, body),
            OutputFormat::Binary { compressed } => {
                let mut response = Self::new(200, content_types::BINARY, body);
                if compressed {
                    response
                        .headers
                        .push((headers::CONTENT_ENCODING.to_string(), "gzip".to_string()));
                }
                response
            }
        }
    }

    pub fn error(err: &BridgeError) -> Self {
        let body = err.to_response();
        let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| body.message.into_bytes());
        Self::new(body.status, content_types::JSON, bytes)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Query parsing
// ---------------------------------------------------------------------------

/// Split `a=1&b=2` into a map, percent-decoding keys and values.  Later
/// duplicates win.
pub fn parse_query(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi * 16 + lo) as u8);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Typed view over the query map.
#[derive(Clone, Copy)]
pub struct Query<'a>(&'a BTreeMap<String, String>);

impl<'a> Query<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn int(&self, name: &str, default: i32) -> Result<i32, BridgeError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| BridgeError::Input(format!("{}={}", name, raw))),
        }
    }

    /// Only `true` (any case) is true.  Absent parameters take `default`.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            None => default,
            Some(raw) => raw.trim().eq_ignore_ascii_case("true"),
        }
    }

    /// Integer written in base 2, optionally signed.
    pub fn binary(&self, name: &str, default: i32) -> Result<i32, BridgeError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => i32::from_str_radix(raw.trim(), 2)
                .map_err(|_| BridgeError::Input(format!("{}={}", name, raw))),
        }
    }

    pub fn text(&self, name: &str) -> Option<&'a str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Typed parameters
// ---------------------------------------------------------------------------

/// Parameters of `POST /structure`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementParams {
    pub origin: BlockPos,
    pub settings: TransformSettings,
    pub flags: BlockFlags,
    pub dimension: Option<String>,
}

impl PlacementParams {
    pub fn from_query(query: Query<'_>) -> Result<Self, BridgeError> {
        let origin = BlockPos::new(query.int("x", 0)?, query.int("y", 0)?, query.int("z", 0)?);
        let rotation = Rotation::from_steps(query.int("rotate", 0)?);
        let pivot = (query.int("pivotx", 0)?, query.int("pivotz", 0)?);
        let mirror = query
            .get("mirror")
            .and_then(Mirror::from_query)
            .unwrap_or(Mirror::None);
        let settings = TransformSettings::identity()
            .with_mirror(mirror)
            .with_rotation(rotation)
            .with_pivot(pivot.0, pivot.1)
            .with_entities(query.flag("entities", false));

        let custom = query.binary("customFlags", -1)?;
        let flags = if custom >= 0 {
            BlockFlags::from_bits(custom as u32)
        } else {
            BlockFlags::from_options(
                query.flag("doBlockUpdates", true),
                query.flag("spawnDrops", false),
            )
        };

        Ok(Self {
            origin,
            settings,
            flags,
            dimension: query.text("dimension").map(str::to_string),
        })
    }

    pub fn request(&self) -> PlacementRequest {
        PlacementRequest::new(self.origin)
            .with_settings(self.settings)
            .with_flags(self.flags)
    }
}

/// Parameters of `GET /structure`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureParams {
    pub origin: BlockPos,
    pub delta: BlockPos,
    pub include_entities: bool,
    pub dimension: Option<String>,
}

impl CaptureParams {
    pub fn from_query(query: Query<'_>) -> Result<Self, BridgeError> {
        Ok(Self {
            origin: BlockPos::new(query.int("x", 0)?, query.int("y", 0)?, query.int("z", 0)?),
            delta: BlockPos::new(
                query.int("dx", 1)?,
                query.int("dy", 1)?,
                query.int("dz", 1)?,
            ),
            include_entities: query.flag("entities", false),
            dimension: query.text("dimension").map(str::to_string),
        })
    }

    pub fn region(&self) -> Result<CaptureRegion, BridgeError> {
        CaptureRegion::from_deltas(self.origin, self.delta).ok_or_else(|| {
            BridgeError::Input(format!(
                "{}+{} leaves the coordinate range",
                self.origin, self.delta
            ))
        })
    }
}
