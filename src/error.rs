use serde_json::Value;
use thiserror::Error;

use crate::risk::AnalyzedItem;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("upstream responded with {status} : {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid endpoint url : {0}")]
    Url(#[from] url::ParseError),
    #[error("query encoding failed : {0}")]
    QueryEncoding(#[from] serde_urlencoded::ser::Error),
    #[error("session is not authenticated")]
    Unauthenticated,
    #[error("session has no pending request token")]
    NoPendingRequestToken,
    #[error("oauth_token does not match the session's request token")]
    TokenMismatch,
    #[error("session store failed : {0}")]
    Store(String),
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

/// Classification failures. These are never masked.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("classifier responded with {status}")]
    Upstream { status: u16, details: Value },
    #[error("classifier request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl ClassifyError {
    /// Upstream error detail, as reported back to the caller.
    pub fn details(&self) -> Value {
        match self {
            Self::Upstream { details, .. } => details.clone(),
            Self::Reqwest(err) => Value::String(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var} is invalid : {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("not authenticated with Twitter")]
    Unauthenticated,
    #[error("proxy responded with {status} : {message}")]
    Proxy { status: u16, message: String },
    #[error("timeline not received correctly : {0}")]
    MalformedTimeline(String),
    #[error("proxy request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid proxy url : {0}")]
    Url(#[from] url::ParseError),
    /// The timeline could not be read. `stored` is what the store already
    /// held for the user, reconciled as usual.
    #[error("timeline fetch failed : {source}")]
    FetchFailed {
        source: Box<PipelineError>,
        stored: Vec<AnalyzedItem>,
    },
}
