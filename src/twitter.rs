//! Signed calls to the Twitter endpoints the proxy relies on.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::types::{AccessToken, RequestToken, TimelineItem};
use crate::{
    ConsumerKeypair, Error, OAuthClientProvider, OAuthParameters, Result, TokenReader,
    OAUTH_TOKEN_KEY,
};

const REQUEST_TOKEN_PATH: &str = "oauth/request_token";
const AUTHORIZE_PATH: &str = "oauth/authorize";
const ACCESS_TOKEN_PATH: &str = "oauth/access_token";

/// Default REST base.
pub const DEFAULT_API_URL: &str = "https://api.twitter.com/";

#[derive(Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    data: Vec<TimelineItem>,
}

/// Consumer-authenticated client for the Twitter endpoints.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    inner: reqwest::Client,
    consumer: ConsumerKeypair,
    api_base: Url,
}

impl TwitterClient {
    pub fn new(inner: reqwest::Client, consumer: ConsumerKeypair, api_base: Url) -> Self {
        TwitterClient {
            inner,
            consumer,
            api_base,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_base.join(path)?)
    }

    /// `{base}/oauth/authorize?oauth_token=...`, where the user approves the app.
    pub fn authorize_url(&self, request_token: &RequestToken) -> Result<Url> {
        let mut url = self.endpoint(AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair(OAUTH_TOKEN_KEY, &request_token.token);
        Ok(url)
    }

    /// Step one: obtain a request token, signed with the consumer pair only.
    pub async fn request_token(&self, callback: &str) -> Result<RequestToken> {
        let url = self.endpoint(REQUEST_TOKEN_PATH)?;
        let secrets = self.consumer.secrets();
        let response = self
            .inner
            .oauth1_with_params(&secrets, OAuthParameters::new().callback(callback))
            .post(url)
            .send()
            .await?;
        Ok(response.parse_oauth_token().await?.into_request_token())
    }

    /// Step three: trade the request token and verifier for an access token.
    pub async fn access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken> {
        let url = self.endpoint(ACCESS_TOKEN_PATH)?;
        let secrets = self.consumer.secrets().with_token_of(request_token);
        let response = self
            .inner
            .oauth1_with_params(&secrets, OAuthParameters::new().verifier(verifier))
            .post(url)
            .send()
            .await?;
        Ok(response.parse_oauth_token().await?.into_access_token()?)
    }

    /// Most recent tweets of the access token's account, text field only.
    pub async fn user_tweets(
        &self,
        access_token: &AccessToken,
        max_results: u8,
    ) -> Result<Vec<TimelineItem>> {
        let url = self.endpoint(&format!("2/users/{}/tweets", access_token.account_id))?;
        let secrets = self.consumer.secrets().with_token_of(access_token);
        let max_results = max_results.to_string();
        let request = self
            .inner
            .oauth1(&secrets)
            .get(url)
            .query(&[
                ("max_results", max_results.as_str()),
                ("tweet.fields", "text"),
            ])?;
        debug!(account_id = %access_token.account_id, "fetching timeline");

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let body: TweetsResponse = response.json().await?;
        Ok(body.data)
    }
}
