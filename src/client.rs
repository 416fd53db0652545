use reqwest::{Client as ReqwestClient, Method};
use url::Url;

use crate::{OAuthParameters, SecretsProvider, Signer};

use super::request::RequestBuilder;

/// Adds OAuth 1.0a signing to `reqwest::Client`.
pub trait OAuthClientProvider {
    fn oauth1<'a, T>(&'a self, secrets: &'a T) -> Client<'a, T>
    where
        T: SecretsProvider,
    {
        self.oauth1_with_params(secrets, OAuthParameters::new())
    }

    fn oauth1_with_params<'a, T>(
        &'a self,
        secrets: &'a T,
        params: OAuthParameters<'a>,
    ) -> Client<'a, T>
    where
        T: SecretsProvider;
}

/// A `reqwest::Client` paired with the signer for one credential set.
#[derive(Debug)]
pub struct Client<'a, T>
where
    T: SecretsProvider,
{
    inner: &'a ReqwestClient,
    signer: Signer<'a, T>,
}

impl OAuthClientProvider for ReqwestClient {
    fn oauth1_with_params<'a, T>(
        &'a self,
        secrets: &'a T,
        parameters: OAuthParameters<'a>,
    ) -> Client<'a, T>
    where
        T: SecretsProvider,
    {
        Client {
            inner: self,
            signer: Signer::new(secrets, parameters),
        }
    }
}

impl<'a, T> Client<'a, T>
where
    T: SecretsProvider,
{
    /// Convenience method to make a signed `GET` request.
    pub fn get(self, url: Url) -> RequestBuilder<'a, T> {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a signed `POST` request.
    pub fn post(self, url: Url) -> RequestBuilder<'a, T> {
        self.request(Method::POST, url)
    }

    /// Start building a signed request with the `Method` and `Url`.
    pub fn request(self, method: Method, url: Url) -> RequestBuilder<'a, T> {
        RequestBuilder::new(self.inner, method, url, self.signer)
    }
}
