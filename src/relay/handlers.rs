use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use session_sync::SyncMessage;
use tracing::{debug, warn};
use url::Url;

use super::RelayState;
use crate::errors::PodfeedError;
use crate::sources::FetchRequest;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest {
    feed_url: Option<String>,
}

fn relay_failure(details: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to fetch RSS feed",
            "details": details,
        })),
    )
        .into_response()
}

pub(super) async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fetch `feedUrl` and hand back the raw feed body.
pub(super) async fn fetch_rss(State(state): State<RelayState>, body: String) -> Response {
    let request = if body.trim().is_empty() {
        RelayRequest::default()
    } else {
        match serde_json::from_str::<RelayRequest>(&body) {
            Ok(request) => request,
            Err(e) => return relay_failure(e.to_string()),
        }
    };

    let Some(feed_url) = request.feed_url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Feed URL is required" })),
        )
            .into_response();
    };

    let parsed = match Url::parse(&feed_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return relay_failure(PodfeedError::InvalidUrl(feed_url).to_string()),
    };

    match state.fetcher.fetch(FetchRequest::get(parsed.as_str())).await {
        Ok(feed) => {
            debug!(url = %parsed, bytes = feed.len(), "relayed feed");
            ([(CONTENT_TYPE, "application/xml")], feed).into_response()
        }
        Err(e) => {
            warn!(url = %parsed, error = %e, "relay fetch failed");
            relay_failure(e.to_string())
        }
    }
}

/// Receive a session message from a sibling site.
pub(super) async fn auth_sync(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.sessions.is_allowed(origin) {
        warn!(origin, "session sync from unknown origin");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Origin not allowed" })),
        )
            .into_response();
    }

    let message: SyncMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid sync message", "details": e.to_string() })),
            )
                .into_response()
        }
    };

    match state.sessions.handle(origin, message) {
        Ok(Some(reply)) => Json(reply).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
