//! HTTP surface of the proxy.
//!
//! | route | |
//! |---|---|
//! | `GET /auth/twitter` | start the handshake, 302 to Twitter |
//! | `GET /callback` | finish the handshake, 302 to the frontend |
//! | `GET /fetch-twitter`, `GET /api/fetch-twitter` | timeline of the session's account |
//! | `POST /analyze-tweet`, `POST /api/analyze-tweet` | raw classifier output for `{text}` |
//! | `GET /health` | liveness |

mod cookies;
mod error;
mod routes;
mod state;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::ProxyConfig;

pub use error::{ApiError, ServeError};
pub use state::AppState;

/// Build the router with CORS restricted to the frontend origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(state.cors_origin.clone()))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/auth/twitter", get(routes::begin_auth))
        .route("/callback", get(routes::callback))
        .route("/fetch-twitter", get(routes::fetch_timeline))
        .route("/api/fetch-twitter", get(routes::fetch_timeline))
        .route("/analyze-tweet", post(routes::analyze))
        .route("/api/analyze-tweet", post(routes::analyze))
        .route("/health", get(routes::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: ProxyConfig) -> Result<(), ServeError> {
    let addr = config.bind_addr();
    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, frontend = %config.frontend_url(), "clearpost proxy listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
