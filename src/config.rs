//! Proxy configuration, resolved once at startup.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum_extra::extract::cookie::{Key, SameSite};
use url::Url;

use crate::classifier::DEFAULT_CLASSIFIER_URL;
use crate::twitter::DEFAULT_API_URL;
use crate::{ConfigError, ConsumerKeypair};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SESSION_COOKIE: &str = "clearpost_session";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How the session cookie is issued.
#[derive(Clone)]
pub struct CookieSettings {
    pub(crate) key: Key,
    pub(crate) name: String,
    pub(crate) domain: Option<String>,
    pub(crate) secure: bool,
    pub(crate) same_site: SameSite,
}

impl Default for CookieSettings {
    fn default() -> Self {
        CookieSettings {
            key: Key::generate(),
            name: DEFAULT_SESSION_COOKIE.into(),
            domain: None,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

impl fmt::Debug for CookieSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSettings")
            .field("key", &"<redacted>")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .finish()
    }
}

impl CookieSettings {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

/// Everything the proxy needs to run.
///
/// Use [`from_env()`](ProxyConfig::from_env) for deployment, or
/// [`new()`](ProxyConfig::new) with `with_*` methods in tests.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub(crate) consumer: ConsumerKeypair,
    pub(crate) callback_url: Url,
    pub(crate) frontend_url: Url,
    pub(crate) twitter_api_url: Url,
    pub(crate) classifier_url: Url,
    pub(crate) classifier_token: String,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) cookies: CookieSettings,
    pub(crate) http_timeout: Duration,
}

impl ProxyConfig {
    /// Create config from the required values; the rest use defaults.
    pub fn new(
        consumer: ConsumerKeypair,
        callback_url: Url,
        frontend_url: Url,
        classifier_token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(ProxyConfig {
            consumer,
            callback_url,
            frontend_url,
            twitter_api_url: parse_url("TWITTER_API_URL", DEFAULT_API_URL)?,
            classifier_url: parse_url("CLASSIFIER_URL", DEFAULT_CLASSIFIER_URL)?,
            classifier_token: classifier_token.into(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            cookies: CookieSettings::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `TWITTER_CONSUMER_KEY`, `TWITTER_CONSUMER_SECRET`
    /// - `TWITTER_CALLBACK_URL`: registered callback, must be a valid URL
    /// - `FRONTEND_ORIGIN`: where the browser lands after the callback
    /// - `CLASSIFIER_API_TOKEN`: bearer token for the inference endpoint
    ///
    /// # Optional env vars
    /// - `TWITTER_API_URL`, `CLASSIFIER_URL`: upstream overrides
    /// - `BIND_ADDR` (`0.0.0.0`), `PORT` (`3001`)
    /// - `SESSION_COOKIE_NAME`, `COOKIE_DOMAIN`
    /// - `COOKIE_SECURE`: `"0"` or `"false"` to allow plain http
    /// - `COOKIE_SAME_SITE`: `lax`, `strict` or `none`
    /// - `SESSION_SECRET`: cookie signing key, at least 64 bytes; an
    ///   ephemeral key is generated when unset
    /// - `HTTP_TIMEOUT_SECS`: upstream request timeout
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let consumer = ConsumerKeypair::new(
            required("TWITTER_CONSUMER_KEY")?,
            required("TWITTER_CONSUMER_SECRET")?,
        );
        let callback_url = parse_url("TWITTER_CALLBACK_URL", &required("TWITTER_CALLBACK_URL")?)?;
        let frontend_url = parse_url("FRONTEND_ORIGIN", &required("FRONTEND_ORIGIN")?)?;
        let mut config = Self::new(
            consumer,
            callback_url,
            frontend_url,
            required("CLASSIFIER_API_TOKEN")?,
        )?;

        if let Some(url) = lookup("TWITTER_API_URL") {
            config = config.with_twitter_api_url(parse_url("TWITTER_API_URL", &url)?);
        }
        if let Some(url) = lookup("CLASSIFIER_URL") {
            config = config.with_classifier_url(parse_url("CLASSIFIER_URL", &url)?);
        }

        let ip = match lookup("BIND_ADDR") {
            Some(addr) => addr.parse::<IpAddr>().map_err(|e| invalid("BIND_ADDR", e))?,
            None => config.bind_addr.ip(),
        };
        let port = match lookup("PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| invalid("PORT", e))?,
            None => DEFAULT_PORT,
        };
        config = config.with_bind_addr(SocketAddr::new(ip, port));

        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| invalid("HTTP_TIMEOUT_SECS", e))?;
            config = config.with_http_timeout(Duration::from_secs(secs));
        }

        let mut cookies = CookieSettings::default();
        if let Some(secret) = lookup("SESSION_SECRET") {
            let key = Key::try_from(secret.as_bytes()).map_err(|_| ConfigError::Invalid {
                var: "SESSION_SECRET",
                reason: "must be at least 64 bytes".into(),
            })?;
            cookies = cookies.with_key(key);
        }
        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            cookies = cookies.with_name(name);
        }
        if let Some(domain) = lookup("COOKIE_DOMAIN") {
            cookies = cookies.with_domain(domain);
        }
        if let Some(secure) = lookup("COOKIE_SECURE") {
            cookies = cookies.with_secure(!matches!(secure.as_str(), "0" | "false"));
        }
        if let Some(same_site) = lookup("COOKIE_SAME_SITE") {
            cookies = cookies.with_same_site(parse_same_site(&same_site)?);
        }

        Ok(config.with_cookies(cookies))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn frontend_url(&self) -> &Url {
        &self.frontend_url
    }

    pub fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    #[must_use]
    pub fn with_twitter_api_url(mut self, url: Url) -> Self {
        self.twitter_api_url = url;
        self
    }

    #[must_use]
    pub fn with_classifier_url(mut self, url: Url) -> Self {
        self.classifier_url = url;
        self
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: CookieSettings) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

fn invalid(var: &'static str, err: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: err.to_string(),
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| invalid(var, e))
}

fn parse_same_site(value: &str) -> Result<SameSite, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => Err(invalid(
            "COOKIE_SAME_SITE",
            format!("expected lax, strict or none, got {other:?}"),
        )),
    }
}
