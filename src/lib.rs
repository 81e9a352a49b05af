//! World Bridge
//!
//! HTTP access to a live block world: import structures with mirror,
//! rotation and pivot, export regions back to the structure container
//! format, and list online players.
//!
//! ## Architecture
//!
//! ```text
//! BridgeServer  (server.rs)          ← TCP accept loop, Ctrl-C shutdown
//!   ├── http.rs                      ← HTTP/1.1 framing
//!   └── BridgeService  (service.rs)  ← one operation per request
//!         ├── request.rs             ← query/header parsing, negotiation
//!         ├── codec.rs               ← gzip / raw / text container codec
//!         │     └── nbt.rs           ← tree access over quartz_nbt
//!         ├── StructurePlacer   (placer.rs)   ← place + block entity stitch
//!         ├── StructureCapturer (capture.rs)  ← capture + block entity stitch
//!         │     └── StructureTemplate (template.rs)
//!         │           └── transform.rs        ← mirror / rotation / pivot
//!         └── WorldHost → WorldRegion (world.rs)
//!               └── MemoryHost / MemoryWorld (memory.rs)
//! ```
//!
//! The pipeline only touches the world through [`WorldRegion`]; any engine
//! that implements it can sit behind the service.

// Structure pipeline and protocol types are always available (no server feature needed).
pub mod block;
pub mod capture;
pub mod codec;
pub mod error;
pub mod nbt;
pub mod placer;
pub mod protocol;
pub mod request;
pub mod template;
pub mod transform;
pub mod types;
pub mod world;

// Server-side modules require the `server` feature.
#[cfg(feature = "server")]
pub mod http;
#[cfg(feature = "server")]
pub mod memory;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod service;

// Convenience re-exports (server only)
#[cfg(feature = "server")]
pub use memory::{MemoryHost, MemoryWorld};
#[cfg(feature = "server")]
pub use server::BridgeServer;
#[cfg(feature = "server")]
pub use service::{BridgeService, ServiceStats};

pub use block::{BlockState, Direction};
pub use capture::{CaptureRegion, StructureCapturer};
pub use codec::{decode, encode, CompressionHint, DecodeError, EncodeError, OutputFormat};
pub use error::BridgeError;
pub use placer::{PlacementError, PlacementRequest, PlacementResult, StructurePlacer};
pub use template::{BlockEntry, EntityEntry, StructureTemplate, TemplateError};
pub use transform::{Mirror, Rotation, TransformSettings};
pub use types::{BlockPos, BridgeConfig, Size, Vec3};
pub use world::{BlockFlags, EntityRecord, WorldError, WorldHost, WorldRegion};
