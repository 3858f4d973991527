//! Session sharing between sibling sites.
//! Broadcasts a login to every peer origin and applies the ones it receives.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use reqwest::header::ORIGIN;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const SYNC_PATH: &str = "/auth/sync";

/// Production sites, by name.
pub const PRODUCTION_DOMAINS: &[(&str, &str)] = &[
    ("main", "https://repspheres.com"),
    ("marketdata", "https://marketdata.repspheres.com"),
    ("canvas", "https://canvas.repspheres.com"),
    ("crm", "https://crm.repspheres.com"),
    ("podcast", "https://podcast.repspheres.com"),
];

/// Local development ports, by site name.
pub const DEV_PORTS: &[(&str, u16)] = &[
    ("main", 3000),
    ("marketdata", 3001),
    ("canvas", 3002),
    ("crm", 3003),
    ("podcast", 3004),
];

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),
    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMessage {
    /// A peer logged in (`Some`) or out (`None`).
    AuthStateSync { session: Option<Session> },
    AuthCheckRequest,
    AuthCheckResponse {
        session: Option<Session>,
        authenticated: bool,
    },
}

fn origin_of(url: &str) -> Result<String, SyncError> {
    let parsed = Url::parse(url).map_err(|_| SyncError::InvalidOrigin(url.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(SyncError::InvalidOrigin(url.to_string()));
    }
    Ok(parsed.origin().ascii_serialization())
}

/// The set of sibling origins allowed to exchange sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerOrigins {
    peers: Vec<(String, String)>,
}

impl PeerOrigins {
    pub fn new<I, N, O>(peers: I) -> Self
    where
        I: IntoIterator<Item = (N, O)>,
        N: Into<String>,
        O: Into<String>,
    {
        Self {
            peers: peers
                .into_iter()
                .map(|(name, origin)| {
                    let origin = origin.into();
                    let origin = origin_of(&origin).unwrap_or(origin);
                    (name.into(), origin)
                })
                .collect(),
        }
    }

    pub fn production() -> Self {
        Self::new(PRODUCTION_DOMAINS.iter().copied())
    }

    pub fn development() -> Self {
        Self::new(
            DEV_PORTS
                .iter()
                .map(|(name, port)| (*name, format!("http://localhost:{}", port))),
        )
    }

    /// Production and development origins together.
    pub fn all_known() -> Self {
        let mut peers = Self::production();
        peers.peers.extend(Self::development().peers);
        peers
    }

    /// The peer group `own_origin` belongs to: development when it is on
    /// localhost, production otherwise.
    pub fn for_origin(own_origin: &str) -> Self {
        let local = Url::parse(own_origin)
            .ok()
            .and_then(|u| u.host_str().map(|h| h == "localhost"))
            .unwrap_or(false);
        if local {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// True when `url` shares an origin with one of the peers.
    pub fn is_valid(&self, url: &str) -> bool {
        match origin_of(url) {
            Ok(origin) => self.peers.iter().any(|(_, peer)| *peer == origin),
            Err(_) => false,
        }
    }

    /// Site name for `url`, "main" when it is not a known peer.
    pub fn site_name(&self, url: &str) -> &str {
        origin_of(url)
            .ok()
            .and_then(|origin| {
                self.peers
                    .iter()
                    .find(|(_, peer)| *peer == origin)
                    .map(|(name, _)| name.as_str())
            })
            .unwrap_or("main")
    }

    /// Where centralized login lives.
    pub fn main_origin(&self) -> Option<&str> {
        self.peers
            .iter()
            .find(|(name, _)| name == "main")
            .map(|(_, origin)| origin.as_str())
    }

    /// Every peer origin except `own_origin`.
    pub fn targets(&self, own_origin: &str) -> Vec<&str> {
        let own = origin_of(own_origin).unwrap_or_else(|_| own_origin.to_string());
        self.peers
            .iter()
            .map(|(_, origin)| origin.as_str())
            .filter(|origin| *origin != own)
            .collect()
    }
}

/// Where a site keeps the session it was handed.
pub trait SessionStore: Send + Sync {
    fn current(&self) -> Option<Session>;
    fn set(&self, session: Session);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Applies messages that arrive from peers.
pub struct SessionListener<S: SessionStore> {
    peers: PeerOrigins,
    store: S,
}

impl<S: SessionStore> SessionListener<S> {
    pub fn new(peers: PeerOrigins, store: S) -> Self {
        Self { peers, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.peers.is_valid(origin)
    }

    /// Handle one message from `origin`. Check requests get a reply;
    /// everything else is applied silently.
    pub fn handle(
        &self,
        origin: &str,
        message: SyncMessage,
    ) -> Result<Option<SyncMessage>, SyncError> {
        if !self.is_allowed(origin) {
            return Err(SyncError::OriginNotAllowed(origin.to_string()));
        }

        match message {
            SyncMessage::AuthStateSync { session: Some(session) } => {
                debug!(origin, "session received");
                self.store.set(session);
                Ok(None)
            }
            SyncMessage::AuthStateSync { session: None } => {
                debug!(origin, "sign-out received");
                self.store.clear();
                Ok(None)
            }
            SyncMessage::AuthCheckRequest => {
                let session = self.store.current();
                Ok(Some(SyncMessage::AuthCheckResponse {
                    authenticated: session.is_some(),
                    session,
                }))
            }
            SyncMessage::AuthCheckResponse { .. } => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// Pushes this site's session to every peer.
pub struct SessionBroadcaster {
    client: Client,
    own_origin: String,
    peers: PeerOrigins,
}

impl SessionBroadcaster {
    pub fn new(own_origin: &str) -> Result<Self, SyncError> {
        Self::with_peers(own_origin, PeerOrigins::for_origin(own_origin))
    }

    pub fn with_peers(own_origin: &str, peers: PeerOrigins) -> Result<Self, SyncError> {
        let own_origin = origin_of(own_origin)?;
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        Ok(Self {
            client,
            own_origin,
            peers,
        })
    }

    pub fn targets(&self) -> Vec<&str> {
        self.peers.targets(&self.own_origin)
    }

    /// Send `session` (or a sign-out for `None`) to every peer at once.
    /// Delivery is best effort: failures are logged and counted, never
    /// returned, and no order is implied.
    pub async fn broadcast(&self, session: Option<&Session>) -> BroadcastReport {
        let message = SyncMessage::AuthStateSync {
            session: session.cloned(),
        };
        let targets = self.targets();

        let sends = targets.iter().map(|target| {
            let request = self
                .client
                .post(format!("{}{}", target, SYNC_PATH))
                .header(ORIGIN, self.own_origin.as_str())
                .json(&message);
            async move {
                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(peer = *target, error = %e, "session sync failed");
                        false
                    }
                }
            }
        });

        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        BroadcastReport {
            attempted: targets.len(),
            delivered,
        }
    }
}
