use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::HeaderValue;
use axum_extra::extract::cookie::Key;

use super::error::ServeError;
use crate::store::{MemorySessionStore, SessionStore};
use crate::{ClassifierGateway, ConfigError, CookieSettings, OAuthFlow, ProxyConfig};
use crate::{TimelineFetcher, TwitterClient};

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub(super) flow: Arc<OAuthFlow>,
    pub(super) timeline: Arc<TimelineFetcher>,
    pub(super) classifier: Arc<ClassifierGateway>,
    pub(super) cookies: CookieSettings,
    pub(super) cors_origin: HeaderValue,
}

impl AppState {
    /// Wire every component to an in-memory session store.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServeError> {
        Self::with_store(config, Arc::new(MemorySessionStore::new()))
    }

    /// One upstream client, with the configured timeout, serves every call.
    pub fn with_store(
        config: &ProxyConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ServeError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let twitter = TwitterClient::new(
            http.clone(),
            config.consumer.clone(),
            config.twitter_api_url.clone(),
        );
        let flow = OAuthFlow::new(
            twitter.clone(),
            store.clone(),
            config.callback_url.clone(),
            config.frontend_url.clone(),
        );
        let timeline = TimelineFetcher::new(twitter, store);
        let classifier = ClassifierGateway::new(
            http,
            config.classifier_url.clone(),
            config.classifier_token.clone(),
        );
        let origin = config.frontend_url.origin().ascii_serialization();
        let cors_origin = HeaderValue::from_str(&origin).map_err(|e| ConfigError::Invalid {
            var: "FRONTEND_ORIGIN",
            reason: e.to_string(),
        })?;

        Ok(AppState {
            flow: Arc::new(flow),
            timeline: Arc::new(timeline),
            classifier: Arc::new(classifier),
            cookies: config.cookies.clone(),
            cors_origin,
        })
    }
}

// SignedCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookies.key.clone()
    }
}
