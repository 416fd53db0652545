use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secrets::TokenSecretsProvider;

/// Short-lived pair issued by the request-token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub token: String,
    pub token_secret: String,
    /// `oauth_callback_confirmed` as reported by the provider.
    pub callback_confirmed: bool,
}

/// Long-lived pair issued after the user approved the application.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub token_secret: String,
    pub account_id: String,
    pub account_handle: String,
}

impl TokenSecretsProvider for RequestToken {
    fn get_token_pair(&self) -> (&str, &str) {
        (&self.token, &self.token_secret)
    }
}

impl TokenSecretsProvider for AccessToken {
    fn get_token_pair(&self) -> (&str, &str) {
        (&self.token, &self.token_secret)
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .field("callback_confirmed", &self.callback_confirmed)
            .finish()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("account_handle", &self.account_handle)
            .finish()
    }
}

/// A single tweet as returned by the timeline endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub text: String,
}

/// Account a timeline page belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineUser {
    pub id: String,
    pub screen_name: String,
}

/// Body of `GET /fetch-twitter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePage {
    pub user: TimelineUser,
    pub tweets: Vec<TimelineItem>,
}

/// What a component does when its upstream call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and answer with labeled placeholder data.
    #[default]
    MaskAndFallback,
    /// Report the failure to the caller.
    Surface,
}
