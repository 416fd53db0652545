use std::borrow::Cow;
use std::fmt;

/// Supplies the key pairs a request is signed with.
pub trait SecretsProvider {
    fn get_consumer_key_pair(&self) -> (&str, &str);

    fn get_token_pair_option(&self) -> Option<(&str, &str)>;

    fn get_token_option_pair(&self) -> (Option<&str>, Option<&str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or((None, None))
    }
}

/// Anything holding a token and its secret: request tokens, access tokens.
pub trait TokenSecretsProvider {
    fn get_token_pair(&self) -> (&str, &str);
}

/// The application credential identifying the proxy to Twitter.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerKeypair {
    pub key: String,
    pub secret: String,
}

impl ConsumerKeypair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        ConsumerKeypair {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Borrow the pair as consumer-only signing secrets.
    pub fn secrets(&self) -> Secrets<'_, ()> {
        Secrets::new(self.key.as_str(), self.secret.as_str())
    }
}

impl fmt::Debug for ConsumerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerKeypair")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token half of a [`Secrets`] value.
#[derive(Clone)]
pub struct TokenPair<'a> {
    token: Cow<'a, str>,
    token_secret: Cow<'a, str>,
}

impl fmt::Debug for TokenPair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

/// Signing secrets: the consumer pair, optionally completed by a token pair.
///
/// `Secrets<'_, ()>` signs with the consumer pair alone (request-token step);
/// `Secrets<'_, TokenPair>` adds a request or access token.
#[derive(Clone)]
pub struct Secrets<'a, T> {
    token: T,
    consumer_key: Cow<'a, str>,
    consumer_secret: Cow<'a, str>,
}

impl<'a> Secrets<'a, ()> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: (),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    pub fn token<TKey, TSecret>(
        self,
        token: TKey,
        token_secret: TSecret,
    ) -> Secrets<'a, TokenPair<'a>>
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: TokenPair {
                token: token.into(),
                token_secret: token_secret.into(),
            },
            consumer_key: self.consumer_key,
            consumer_secret: self.consumer_secret,
        }
    }

    /// Attach the pair held by a request or access token.
    pub fn with_token_of<P>(self, provider: &'a P) -> Secrets<'a, TokenPair<'a>>
    where
        P: TokenSecretsProvider,
    {
        let (token, token_secret) = provider.get_token_pair();
        self.token(token, token_secret)
    }
}

impl<T> fmt::Debug for Secrets<'_, T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token", &self.token)
            .finish()
    }
}

impl SecretsProvider for Secrets<'_, ()> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        None
    }
}

impl SecretsProvider for Secrets<'_, TokenPair<'_>> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        Some((&self.token.token, &self.token.token_secret))
    }
}

impl TokenSecretsProvider for Secrets<'_, TokenPair<'_>> {
    fn get_token_pair(&self) -> (&str, &str) {
        (&self.token.token, &self.token.token_secret)
    }
}
