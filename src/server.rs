//! BridgeServer – TCP accept loop in front of [`BridgeService`].
//!
//! ## Connection lifecycle
//!
//! Every accepted connection runs in its own Tokio task with a tracing span
//! naming the peer.  Requests on one connection are served in order; the
//! structure work itself runs on the blocking pool so the accept loop and
//! other connections keep moving.
//!
//! | Framing failure         | Response | Connection |
//! |-------------------------|----------|------------|
//! | malformed request       | 400      | closed     |
//! | body over the limit     | 413      | closed     |
//! | I/O error               | *(none)* | dropped    |

use crate::error::BridgeError;
use crate::http::{self, HttpError};
use crate::request::ApiResponse;
use crate::service::BridgeService;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::Instrument;

/// Binds the configured address and serves until shutdown.
pub struct BridgeServer {
    service: Arc<BridgeService>,
}

impl BridgeServer {
    pub fn new(service: Arc<BridgeService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<BridgeService> {
        &self.service
    }

    /// Serve on the configured address until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let bind = self.service.config().bind.clone();
        let listener = TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", bind))?;
        info!("world bridge listening on http://{}", listener.local_addr()?);

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl-C handler failed: {}", e);
            }
        })
        .await
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            continue;
                        }
                    };
                    let service = self.service.clone();
                    let span = tracing::info_span!("connection", %peer);
                    tokio::spawn(
                        async move {
                            if let Err(e) = handle_connection(stream, service).await {
                                debug!("connection closed with error: {}", e);
                            }
                        }
                        .instrument(span),
                    );
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }
        self.service.log_stats();
        Ok(())
    }
}

/// Serve every request on one byte stream until the peer closes it or asks
/// for `Connection: close`.
pub async fn handle_connection<S>(stream: S, service: Arc<BridgeService>) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let max_body = service.config().max_body_bytes;
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    loop {
        let incoming = match http::read_request(&mut reader, max_body).await {
            Ok(Some(incoming)) => incoming,
            Ok(None) => return Ok(()),
            Err(HttpError::Io(e)) => return Err(e),
            Err(HttpError::PayloadTooLarge(limit)) => {
                let response = ApiResponse::error(&BridgeError::PayloadTooLarge(limit));
                return http::write_response(&mut write_half, &response, false).await;
            }
            Err(HttpError::Malformed(reason)) => {
                warn!("malformed request: {}", reason);
                let response = ApiResponse::error(&BridgeError::Malformed(reason));
                return http::write_response(&mut write_half, &response, false).await;
            }
        };

        let keep_alive = incoming.keep_alive;
        let request = incoming.request;
        debug!("{:?} {} ({} body bytes)", request.method, request.path, request.body.len());

        let svc = service.clone();
        let response = match tokio::task::spawn_blocking(move || svc.handle(&request)).await {
            Ok(response) => response,
            Err(e) => ApiResponse::error(&BridgeError::Internal(e.to_string())),
        };
        http::write_response(&mut write_half, &response, keep_alive).await?;
        if !keep_alive {
            return Ok(());
        }
    }
}
