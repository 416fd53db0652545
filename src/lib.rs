/*!
clearpost: an OAuth 1.0a proxy for Twitter timelines and toxicity scoring.

# Overview

The proxy performs the three-legged OAuth 1.0a handshake on behalf of a browser
session, keeps the resulting credentials server-side keyed by a signed session
cookie, and forwards two kinds of calls upstream:

* timeline reads, signed with the session's access token, which degrade to a
  labeled fallback payload when Twitter misbehaves;
* toxicity classification through a bearer-authenticated inference endpoint,
  whose failures are always reported to the caller.

The [`pipeline`] module is the client half: it drives one fetch, then classifies
every timeline item in order with a pause between calls, derives a risk tier
for each one and hands the records to a persistence collaborator.

# Signing a request

```rust,no_run
use clearpost::{OAuthClientProvider, OAuthParameters, Secrets};

# async fn run() -> Result<(), reqwest::Error> {
let secrets = Secrets::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");

let response = reqwest::Client::new()
    .oauth1_with_params(&secrets, OAuthParameters::new().callback("oob"))
    .post(url::Url::parse("https://api.twitter.com/oauth/request_token").unwrap())
    .send()
    .await?;
# let _ = response;
# Ok(())
# }
```

# Running the proxy

```rust,no_run
use clearpost::{server, ProxyConfig};

# async fn run() -> anyhow::Result<()> {
let config = ProxyConfig::from_env()?;
server::serve(config).await?;
# Ok(())
# }
```
*/
mod client;
mod error;
mod request;
mod secrets;
mod signer;
mod token_reader;

pub mod classifier;
pub mod config;
pub mod flow;
pub mod logging;
pub mod pipeline;
pub mod risk;
pub mod server;
pub mod store;
pub mod timeline;
pub mod twitter;
pub mod types;

// exposed to external program
pub use classifier::ClassifierGateway;
pub use client::{Client, OAuthClientProvider};
pub use config::{CookieSettings, ProxyConfig};
pub use error::{
    ClassifyError, ConfigError, Error, PipelineError, Result, TokenReaderError, TokenReaderResult,
};
pub use flow::OAuthFlow;
pub use request::RequestBuilder;
pub use secrets::{ConsumerKeypair, Secrets, SecretsProvider, TokenPair, TokenSecretsProvider};
pub use signer::{sign, OAuthParameters, Signer};
pub use store::{MemorySessionStore, SessionRecord, SessionState, SessionStore};
pub use timeline::TimelineFetcher;
pub use token_reader::{TokenReader, TokenResponse};
pub use twitter::TwitterClient;
pub use types::{AccessToken, FailurePolicy, RequestToken, TimelineItem, TimelinePage, TimelineUser};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
pub(crate) const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const SCREEN_NAME_KEY: &str = "screen_name";
