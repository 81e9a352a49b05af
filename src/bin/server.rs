//! world-bridge-server binary
//!
//! Serves the structure and player endpoints over HTTP on top of an
//! in-memory world.
//!
//! ## Configuration (TOML via `--config`, env, then flags)
//!
//! | Key                               | Default           | Description                        |
//! |-----------------------------------|-------------------|------------------------------------|
//! | `WORLD_BRIDGE_BIND`               | `127.0.0.1:9000`  | HTTP listen address                |
//! | `WORLD_BRIDGE_MAX_BODY_BYTES`     | `67108864`        | Largest accepted request body      |
//! | `WORLD_BRIDGE_MAX_CAPTURE_VOLUME` | `16777216`        | Most blocks one capture may cover  |
//! | `WORLD_BRIDGE_DATA_VERSION`       | `3465`            | `DataVersion` of captured structures |
//! | `WORLD_BRIDGE_DEFAULT_DIMENSION`  | `overworld`       | Dimension used when none is named  |

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use world_bridge::{BridgeConfig, BridgeServer, BridgeService, MemoryHost};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "world-bridge-server", about = "World Bridge HTTP server", version)]
struct Args {
    /// Optional TOML config file
    #[arg(long, env = "WORLD_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    bind: Option<String>,

    /// Largest accepted request body in bytes
    #[arg(long)]
    max_body_bytes: Option<usize>,

    /// Most blocks a single capture may cover
    #[arg(long)]
    max_capture_volume: Option<u64>,

    /// DataVersion stamped on captured structures
    #[arg(long)]
    data_version: Option<i32>,

    /// Dimension used when a request names none
    #[arg(long)]
    default_dimension: Option<String>,
}

impl Args {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(max) = self.max_body_bytes {
            config.max_body_bytes = max;
        }
        if let Some(volume) = self.max_capture_volume {
            config.max_capture_volume = volume;
        }
        if let Some(version) = self.data_version {
            config.data_version = version;
        }
        if let Some(dimension) = self.default_dimension {
            config.default_dimension = dimension;
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder
        .add_source(config::Environment::with_prefix("WORLD_BRIDGE").try_parsing(true))
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("world_bridge=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    log::info!(
        "Starting world-bridge-server (bind='{}', max_body={}B, max_capture={}, data_version={}, dimension='{}')",
        config.bind,
        config.max_body_bytes,
        config.max_capture_volume,
        config.data_version,
        config.default_dimension,
    );

    let host = Arc::new(MemoryHost::new(&config.default_dimension));
    let service = Arc::new(BridgeService::new(config, host));

    // Run until Ctrl-C
    BridgeServer::new(service).run().await
}
