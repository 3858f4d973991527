//! HTTP relay for browser clients: fetches RSS feeds server-side and
//! receives session broadcasts from sibling sites.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use session_sync::{MemorySessionStore, PeerOrigins, SessionListener, SYNC_PATH};
use tokio::net::TcpListener;
use tracing::info;

use crate::errors::PodfeedResult;
use crate::sources::HttpFetch;

pub const FETCH_RSS_PATH: &str = "/fetch-rss";

#[derive(Clone)]
pub struct RelayState {
    pub fetcher: Arc<dyn HttpFetch>,
    pub sessions: Arc<SessionListener<MemorySessionStore>>,
}

impl RelayState {
    pub fn new(fetcher: Arc<dyn HttpFetch>, peers: PeerOrigins) -> Self {
        Self {
            fetcher,
            sessions: Arc::new(SessionListener::new(peers, MemorySessionStore::new())),
        }
    }
}

async fn cors_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    resp
}

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route(
            FETCH_RSS_PATH,
            post(handlers::fetch_rss)
                .get(handlers::fetch_rss)
                .options(handlers::preflight),
        )
        .route(
            SYNC_PATH,
            post(handlers::auth_sync).options(handlers::preflight),
        )
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down relay");
    }
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: RelayState) -> PodfeedResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "relay listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
