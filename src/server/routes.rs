use axum::extract::{Query, State};
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::SignedCookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};
use url::Url;

use super::cookies;
use super::error::ApiError;
use super::state::AppState;
use crate::{Error, TimelinePage};

/// 302 with a `Location` header.
fn found(url: &Url) -> Response {
    (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

// ── Handshake ──────────────────────────────────────────────────────

pub(super) async fn begin_auth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Response), ApiError> {
    let (jar, session_id) = cookies::ensure_session(jar, &state.cookies);
    let authorize_url = state.flow.begin(&session_id).await.map_err(|e| {
        error!(error = %e, "request token failed");
        ApiError::Internal("Failed to get request token")
    })?;
    Ok((jar, found(&authorize_url)))
}

#[derive(Deserialize)]
pub(super) struct CallbackParams {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
}

pub(super) async fn callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let (Some(token), Some(verifier)) = (params.oauth_token, params.oauth_verifier) else {
        warn!("callback without oauth_token or oauth_verifier");
        return Err(ApiError::BadRequest("Missing oauth_token or oauth_verifier"));
    };
    let session_id = cookies::session_id(&jar, &state.cookies).ok_or_else(|| {
        warn!("callback without a session");
        ApiError::BadRequest("No pending authorization for this session")
    })?;

    let redirect = state
        .flow
        .complete(&session_id, &token, &verifier)
        .await
        .map_err(|e| match e {
            Error::NoPendingRequestToken => {
                warn!("callback for a session that never began");
                ApiError::BadRequest("No pending authorization for this session")
            }
            Error::TokenMismatch => {
                warn!("callback token does not match the session");
                ApiError::BadRequest("oauth_token does not match this session")
            }
            other => {
                error!(error = %other, "access token exchange failed");
                ApiError::Internal("Failed to exchange access token")
            }
        })?;
    Ok(found(&redirect))
}

// ── Proxy ──────────────────────────────────────────────────────────

pub(super) async fn fetch_timeline(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<TimelinePage>, ApiError> {
    let session_id =
        cookies::session_id(&jar, &state.cookies).ok_or(ApiError::Unauthenticated)?;
    match state.timeline.fetch(&session_id).await {
        Ok(page) => Ok(Json(page)),
        Err(Error::Unauthenticated) => Err(ApiError::Unauthenticated),
        Err(e) => {
            error!(error = %e, "timeline fetch failed");
            Err(ApiError::Internal("Failed to fetch tweets"))
        }
    }
}

#[derive(Deserialize)]
pub(super) struct AnalyzeRequest {
    #[serde(default)]
    text: String,
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .classifier
        .classify(&request.text)
        .await
        .map(Json)
        .map_err(|e| ApiError::Analysis(e.details()))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
