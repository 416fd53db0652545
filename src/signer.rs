use std::borrow::Cow;

use http::Method;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use url::Url;

use crate::{SecretsProvider, OAUTH_KEY_PREFIX, REALM_KEY};

/// Produces the `Authorization` header for one request.
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Sign `method url` carrying `params` (form body or extra query pairs).
    ///
    /// Query pairs already present on `url` are part of the signature and the
    /// query is dropped from the base string URI. Protocol parameters
    /// (`oauth_*`) in `params` are ignored; pass them through
    /// [`OAuthParameters`] instead.
    pub fn generate_signature<K, V>(&self, method: &Method, url: &Url, params: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let options = self.parameters.build_options(token);

        let mut base_uri = url.clone();
        base_uri.set_query(None);
        base_uri.set_fragment(None);

        // oauth1-request expects parameters in ascending order, with the
        // oauth_* block emitted at its sorted position
        let mut sorted: Vec<(Cow<str>, Cow<str>)> = url
            .query_pairs()
            .chain(
                params
                    .iter()
                    .map(|(k, v)| (Cow::from(k.as_ref()), Cow::from(v.as_ref()))),
            )
            .filter(|(k, _)| !k.starts_with(OAUTH_KEY_PREFIX))
            .collect();
        sorted.sort();
        let split_at = sorted.partition_point(|(k, _)| k.as_ref() < OAUTH_KEY_PREFIX);
        let (before_oauth, after_oauth) = sorted.split_at(split_at);

        let form_encoded = !matches!(*method, Method::GET | Method::HEAD | Method::DELETE);
        let mut signer = if form_encoded {
            OAuthSigner::form_with_signature_method(
                HmacSha1,
                method.as_str(),
                base_uri,
                consumer_secret,
                token_secret,
            )
        } else {
            OAuthSigner::with_signature_method(
                HmacSha1,
                method.as_str(),
                base_uri,
                consumer_secret,
                token_secret,
            )
        };

        for (key, value) in before_oauth {
            signer.parameter(key, value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in after_oauth {
            signer.parameter(key, value);
        }

        let authorization = signer.finish().authorization;
        match self.parameters.realm {
            // realm is never part of the signature base string
            Some(ref realm) => format!("{},{}=\"{}\"", authorization, REALM_KEY, realm),
            None => authorization,
        }
    }
}

/// Sign with a fresh nonce and the current timestamp.
pub fn sign<P, K, V>(method: &Method, url: &Url, params: &[(K, V)], secrets: &P) -> String
where
    P: SecretsProvider,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Signer::new(secrets, OAuthParameters::new()).generate_signature(method, url, params)
}

/// Protocol parameters that are not derived from the secrets.
///
/// Leaving `nonce` or `timestamp` unset lets the signer generate them.
#[derive(Debug, Clone, Default)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value
    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value
    pub fn realm<T>(self, realm: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp(self, timestamp: u64) -> Self {
        OAuthParameters {
            timestamp: Some(timestamp),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// Emit `oauth_version="1.0"` when `true`; omit it otherwise.
    pub fn version(self, version: bool) -> Self {
        OAuthParameters { version, ..self }
    }

    fn build_options<'b>(&'b self, token: Option<&'b str>) -> Options<'b> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_ref());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_ref());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_ref());
        }
        opt.version(self.version);

        opt
    }
}
