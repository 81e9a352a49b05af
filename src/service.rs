//! BridgeService – one structure or roster operation per request.

use crate::capture::StructureCapturer;
use crate::codec;
use crate::error::BridgeError;
use crate::placer::StructurePlacer;
use crate::protocol::{paths, StatusResponse};
use crate::request::{ApiRequest, ApiResponse, CaptureParams, Method, PlacementParams};
use crate::types::BridgeConfig;
use crate::world::WorldHost;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub requests: u64,
    pub placements: u64,
    pub captures: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    placements: AtomicU64,
    captures: AtomicU64,
    failures: AtomicU64,
}

/// Owns the world host and the service configuration; shared between
/// connections behind an `Arc`.
pub struct BridgeService {
    config: BridgeConfig,
    host: Arc<dyn WorldHost>,
    counters: Counters,
}

impl BridgeService {
    pub fn new(config: BridgeConfig, host: Arc<dyn WorldHost>) -> Self {
        Self {
            config,
            host,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn WorldHost> {
        &self.host
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Route a request and turn every failure into a JSON error response.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("{:?} {} failed: {}", request.method, request.path, e);
                ApiResponse::error(&e)
            }
        }
    }

    fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, BridgeError> {
        match (request.path.as_str(), request.method) {
            (paths::STRUCTURE, Method::Post) => self.place_structure(request),
            (paths::STRUCTURE, Method::Get) => self.capture_structure(request),
            (paths::PLAYERS, Method::Get) => Ok(ApiResponse::json(200, &self.host.players())),
            (paths::STRUCTURE | paths::PLAYERS, _) => Err(BridgeError::MethodNotAllowed),
            (other, _) => Err(BridgeError::NotFound(other.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Structure operations
    // -----------------------------------------------------------------------

    /// `POST /structure`: decode the body and place it.
    pub fn place_structure(&self, request: &ApiRequest) -> Result<ApiResponse, BridgeError> {
        let params = PlacementParams::from_query(request.query())?;
        let template = codec::decode(&request.body, request.compression_hint())?;
        let level = self.host.level(params.dimension.as_deref())?;

        debug!(
            "placing {} at {} ({:?}, flags {})",
            template.size(),
            params.origin,
            params.settings,
            params.flags.bits()
        );
        let result = StructurePlacer::new(level.as_ref()).place(&template, &params.request())?;
        self.counters.placements.fetch_add(1, Ordering::Relaxed);

        Ok(ApiResponse::json(
            200,
            &StatusResponse {
                status: result.has_placed,
            },
        ))
    }

    /// `GET /structure`: capture a box and encode it in the negotiated format.
    pub fn capture_structure(&self, request: &ApiRequest) -> Result<ApiResponse, BridgeError> {
        let params = CaptureParams::from_query(request.query())?;
        let region = params.region()?;
        let volume = region.size.volume();
        if volume > self.config.max_capture_volume {
            return Err(BridgeError::CaptureTooLarge {
                volume,
                limit: self.config.max_capture_volume,
            });
        }
        let level = self.host.level(params.dimension.as_deref())?;

        let template = StructureCapturer::new(level.as_ref(), self.config.data_version)
            .capture(region, params.include_entities)?;
        let format = request.output_format();
        let body = codec::encode(&template, format)?;
        self.counters.captures.fetch_add(1, Ordering::Relaxed);

        Ok(ApiResponse::structure(body, format))
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            placements: self.counters.placements.load(Ordering::Relaxed),
            captures: self.counters.captures.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let s = self.stats();
        info!(
            "{} requests: {} placements, {} captures, {} failures",
            s.requests, s.placements, s.captures, s.failures
        );
    }
}
