//! The three-legged handshake, bound to a session.
//!
//! ```text
//! Unauthenticated --begin--> RequestTokenObtained --complete--> Authenticated
//! ```
//!
//! A failed step leaves the session where it was.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use crate::store::{SessionRecord, SessionState, SessionStore, StoreError};
use crate::types::AccessToken;
use crate::{Error, Result, TwitterClient};

pub struct OAuthFlow {
    client: TwitterClient,
    store: Arc<dyn SessionStore>,
    callback_url: Url,
    frontend_url: Url,
}

impl OAuthFlow {
    pub fn new(
        client: TwitterClient,
        store: Arc<dyn SessionStore>,
        callback_url: Url,
        frontend_url: Url,
    ) -> Self {
        OAuthFlow {
            client,
            store,
            callback_url,
            frontend_url,
        }
    }

    async fn record(&self, session_id: &str) -> Result<SessionRecord> {
        Ok(self
            .store
            .get(session_id)
            .await
            .map_err(store_error)?
            .unwrap_or_default())
    }

    pub async fn state(&self, session_id: &str) -> Result<SessionState> {
        Ok(self.record(session_id).await?.state())
    }

    /// The session's access token, or [`Error::Unauthenticated`].
    pub async fn access_token(&self, session_id: &str) -> Result<AccessToken> {
        self.record(session_id)
            .await?
            .access_token
            .ok_or(Error::Unauthenticated)
    }

    /// Obtain a request token and return the URL the user must visit.
    #[instrument(skip(self))]
    pub async fn begin(&self, session_id: &str) -> Result<Url> {
        let request_token = self.client.request_token(self.callback_url.as_str()).await?;
        if !request_token.callback_confirmed {
            warn!("provider did not confirm the callback url");
        }
        let authorize_url = self.client.authorize_url(&request_token)?;

        let mut record = self.record(session_id).await?;
        record.request_token = Some(request_token);
        self.store
            .set(session_id, record)
            .await
            .map_err(store_error)?;

        info!("request token obtained");
        Ok(authorize_url)
    }

    /// Exchange the verifier for an access token; returns the frontend URL.
    ///
    /// `token` must be the request token this session obtained in
    /// [`begin`](Self::begin).
    #[instrument(skip(self, verifier))]
    pub async fn complete(&self, session_id: &str, token: &str, verifier: &str) -> Result<Url> {
        let mut record = self.record(session_id).await?;
        let request_token = record
            .request_token
            .as_ref()
            .ok_or(Error::NoPendingRequestToken)?;
        if request_token.token != token {
            return Err(Error::TokenMismatch);
        }

        let access_token = self.client.access_token(request_token, verifier).await?;
        info!(
            account_id = %access_token.account_id,
            screen_name = %access_token.account_handle,
            "access token obtained"
        );

        record.request_token = None;
        record.access_token = Some(access_token);
        self.store
            .set(session_id, record)
            .await
            .map_err(store_error)?;

        Ok(self.frontend_url.clone())
    }
}

fn store_error(err: StoreError) -> Error {
    Error::Store(err.to_string())
}
