//! Forwarding to the hosted toxicity model.
//!
//! Failures here always reach the caller
//! ([`FailurePolicy::Surface`](crate::FailurePolicy::Surface)); the timeline
//! fetcher is the one that masks.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::ClassifyError;

/// Default model endpoint.
pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/unitary/toxic-bert";

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Clone)]
pub struct ClassifierGateway {
    inner: reqwest::Client,
    endpoint: Url,
    api_token: String,
}

impl ClassifierGateway {
    pub fn new(inner: reqwest::Client, endpoint: Url, api_token: impl Into<String>) -> Self {
        ClassifierGateway {
            inner,
            endpoint,
            api_token: api_token.into(),
        }
    }

    /// Score `text`; the upstream body is returned untouched.
    pub async fn classify(&self, text: &str) -> Result<Value, ClassifyError> {
        debug!(len = text.len(), "classifying text");
        let response = self
            .inner
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_token)
            .json(&ClassifyRequest { inputs: text })
            .send()
            .await
            .inspect_err(|e| error!(error = %e, "classifier unreachable"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str(&body).unwrap_or(Value::String(body));
            error!(status = status.as_u16(), %details, "classifier returned an error");
            return Err(ClassifyError::Upstream {
                status: status.as_u16(),
                details,
            });
        }
        Ok(response.json().await?)
    }
}
