//! Authenticated timeline reads.

use std::sync::Arc;

use tracing::{info, warn};

use crate::store::SessionStore;
use crate::types::{AccessToken, FailurePolicy, TimelineItem, TimelinePage, TimelineUser};
use crate::{Error, Result, TwitterClient};

/// Tweets requested per fetch.
pub const PAGE_SIZE: u8 = 5;

const MOCK_ACCOUNT_ID: &str = "mock";
const MOCK_SCREEN_NAME: &str = "mockuser";

pub struct TimelineFetcher {
    client: TwitterClient,
    store: Arc<dyn SessionStore>,
    policy: FailurePolicy,
}

impl TimelineFetcher {
    /// Reads degrade to [`fallback_page`] unless another policy is chosen.
    pub fn new(client: TwitterClient, store: Arc<dyn SessionStore>) -> Self {
        TimelineFetcher {
            client,
            store,
            policy: FailurePolicy::MaskAndFallback,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Timeline of the account bound to `session_id`.
    ///
    /// A session without an access token fails with
    /// [`Error::Unauthenticated`] whatever the policy.
    pub async fn fetch(&self, session_id: &str) -> Result<TimelinePage> {
        let access_token = self
            .store
            .get(session_id)
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .and_then(|record| record.access_token)
            .ok_or(Error::Unauthenticated)?;
        self.fetch_for(&access_token).await
    }

    pub async fn fetch_for(&self, access_token: &AccessToken) -> Result<TimelinePage> {
        match self.client.user_tweets(access_token, PAGE_SIZE).await {
            Ok(tweets) => {
                info!(
                    count = tweets.len(),
                    screen_name = %access_token.account_handle,
                    "timeline retrieved"
                );
                Ok(TimelinePage {
                    user: account_of(access_token),
                    tweets,
                })
            }
            Err(err) => match self.policy {
                FailurePolicy::MaskAndFallback => {
                    warn!(error = %err, "timeline fetch failed, serving mock tweets");
                    Ok(fallback_page(access_token))
                }
                FailurePolicy::Surface => Err(err),
            },
        }
    }
}

fn account_of(access_token: &AccessToken) -> TimelineUser {
    TimelineUser {
        id: access_token.account_id.clone(),
        screen_name: access_token.account_handle.clone(),
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_owned()
    } else {
        value.to_owned()
    }
}

/// Placeholder page served when Twitter cannot be read.
pub fn fallback_page(access_token: &AccessToken) -> TimelinePage {
    TimelinePage {
        user: TimelineUser {
            id: or_placeholder(&access_token.account_id, MOCK_ACCOUNT_ID),
            screen_name: or_placeholder(&access_token.account_handle, MOCK_SCREEN_NAME),
        },
        tweets: vec![
            TimelineItem {
                id: "1".into(),
                text: "⚠️ Twitter v2 access still blocked or buggy. This is a mock tweet.".into(),
            },
            TimelineItem {
                id: "2".into(),
                text: "🧪 Using dummy tweet data for now.".into(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use url::Url;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::store::SessionRecord;
    use crate::{ConsumerKeypair, MemorySessionStore};

    fn fetcher(server: &MockServer, store: Arc<MemorySessionStore>) -> TimelineFetcher {
        let client = TwitterClient::new(
            reqwest::Client::new(),
            ConsumerKeypair::new("ck", "cs"),
            Url::parse(&format!("{}/", server.uri())).unwrap(),
        );
        TimelineFetcher::new(client, store)
    }

    fn access_token(account_id: &str, account_handle: &str) -> AccessToken {
        AccessToken {
            token: "at".into(),
            token_secret: "ats".into(),
            account_id: account_id.into(),
            account_handle: account_handle.into(),
        }
    }

    async fn authenticated_store(token: AccessToken) -> Arc<MemorySessionStore> {
        let store = Arc::new(MemorySessionStore::new());
        store
            .set(
                "s1",
                SessionRecord {
                    request_token: None,
                    access_token: Some(token),
                },
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn unauthenticated_session_is_not_masked() {
        let server = MockServer::start().await;
        let fetcher = fetcher(&server, Arc::new(MemorySessionStore::new()));

        assert!(matches!(
            fetcher.fetch("nobody").await,
            Err(Error::Unauthenticated)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn returns_timeline_of_session_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/42/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "9", "text": "hello"}]
            })))
            .mount(&server)
            .await;
        let store = authenticated_store(access_token("42", "alice")).await;

        let page = fetcher(&server, store).fetch("s1").await.unwrap();
        assert_eq!(page.user.id, "42");
        assert_eq!(page.user.screen_name, "alice");
        assert_eq!(page.tweets, vec![TimelineItem { id: "9".into(), text: "hello".into() }]);
    }

    #[tokio::test]
    async fn upstream_500_yields_mock_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = authenticated_store(access_token("", "")).await;

        let page = fetcher(&server, store).fetch("s1").await.unwrap();
        assert_eq!(page.tweets.len(), 2);
        assert_eq!(page.tweets[0].id, "1");
        assert_eq!(page.tweets[1].id, "2");
        assert_eq!(page.user.id, "mock");
        assert_eq!(page.user.screen_name, "mockuser");
        assert_eq!(
            page.tweets[0].text,
            "⚠️ Twitter v2 access still blocked or buggy. This is a mock tweet."
        );
        assert_eq!(page.tweets[1].text, "🧪 Using dummy tweet data for now.");
    }

    #[tokio::test]
    async fn malformed_body_keeps_real_identity_in_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let store = authenticated_store(access_token("42", "alice")).await;

        let page = fetcher(&server, store).fetch("s1").await.unwrap();
        assert_eq!(page.user.id, "42");
        assert_eq!(page.user.screen_name, "alice");
        assert!(page.tweets[0].text.contains("mock tweet"));
    }

    #[tokio::test]
    async fn surface_policy_propagates_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let store = authenticated_store(access_token("42", "alice")).await;

        let fetcher = fetcher(&server, store).with_policy(FailurePolicy::Surface);
        assert!(matches!(
            fetcher.fetch("s1").await,
            Err(Error::Upstream { status: 503, .. })
        ));
    }
}
