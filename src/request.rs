use http::header::AUTHORIZATION;
use reqwest::{Client as ReqwestClient, Method, Request, Response, Url};
use serde::Serialize;

use crate::{SecretsProvider, Signer};

/// Builds a request whose `Authorization` header is generated at send time.
pub struct RequestBuilder<'a, T>
where
    T: SecretsProvider,
{
    client: &'a ReqwestClient,
    method: Method,
    url: Url,
    form: Vec<(String, String)>,
    signer: Signer<'a, T>,
}

impl<'a, T> RequestBuilder<'a, T>
where
    T: SecretsProvider,
{
    pub(crate) fn new(
        client: &'a ReqwestClient,
        method: Method,
        url: Url,
        signer: Signer<'a, T>,
    ) -> Self {
        RequestBuilder {
            client,
            method,
            url,
            form: Vec::new(),
            signer,
        }
    }

    /// Modify the query string of the URL.
    ///
    /// Parameters are appended to any already present; all of them take
    /// part in the signature.
    ///
    /// # Errors
    /// Fails if `query` cannot be serialized into a query string.
    pub fn query<Q: Serialize + ?Sized>(
        mut self,
        query: &Q,
    ) -> Result<Self, serde_urlencoded::ser::Error> {
        {
            let mut pairs = self.url.query_pairs_mut();
            let serializer = serde_urlencoded::Serializer::new(&mut pairs);
            query.serialize(serializer)?;
        }
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        Ok(self)
    }

    /// Send a form body. The pairs take part in the signature.
    pub fn form<K, V>(mut self, pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.form.extend(
            pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// The `Authorization` header value this request will carry.
    pub fn authorization(&self) -> String {
        self.signer
            .generate_signature(&self.method, &self.url, &self.form)
    }

    /// Sign and build the underlying `reqwest::Request`.
    pub fn build(self) -> reqwest::Result<Request> {
        let authorization = self.authorization();
        let mut builder = self
            .client
            .request(self.method, self.url)
            .header(AUTHORIZATION, authorization);
        if !self.form.is_empty() {
            builder = builder.form(&self.form);
        }
        builder.build()
    }

    /// Sign the request and send it.
    pub async fn send(self) -> reqwest::Result<Response> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }
}
