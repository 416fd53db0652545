use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;

use crate::types::{AccessToken, RequestToken};
use crate::{
    Error, Result, TokenReaderError, TokenReaderResult, OAUTH_CALLBACK_CONFIRMED_KEY,
    OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY, SCREEN_NAME_KEY, USER_ID_KEY,
};

/// Represents the url-encoded body of a token endpoint response.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl TokenResponse {
    /// Interpret the response of the request-token endpoint.
    pub fn into_request_token(self) -> RequestToken {
        let callback_confirmed = self
            .remain
            .get(OAUTH_CALLBACK_CONFIRMED_KEY)
            .is_some_and(|v| v == "true");
        RequestToken {
            token: self.oauth_token,
            token_secret: self.oauth_token_secret,
            callback_confirmed,
        }
    }

    /// Interpret the response of the access-token endpoint.
    ///
    /// `user_id` is required since every authenticated read is scoped to it;
    /// a missing `screen_name` is kept as an empty handle.
    pub fn into_access_token(mut self) -> TokenReaderResult<AccessToken> {
        let account_id = self.remain.remove(USER_ID_KEY).ok_or_else(|| {
            TokenReaderError::TokenKeyNotFound(USER_ID_KEY, format!("{:?}", self.remain.keys()))
        })?;
        let account_handle = self.remain.remove(SCREEN_NAME_KEY).unwrap_or_default();
        Ok(AccessToken {
            token: self.oauth_token,
            token_secret: self.oauth_token_secret,
            account_id,
            account_handle,
        })
    }
}

/// Add parse_oauth_token feature to reqwest::Response.
// this trait is sealed
#[async_trait]
pub trait TokenReader: private::Sealed {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait]
impl TokenReader for Response {
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        let status = self.status();
        let text = self.text().await?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(read_oauth_token(text)?)
    }
}

fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

mod private {
    use reqwest::Response;

    pub trait Sealed {}
    impl Sealed for Response {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_request_token_response() {
        let resp_str_sample = "oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik&oauth_token_secret=Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM&oauth_callback_confirmed=true";
        for parsed in [
            read_oauth_token(resp_str_sample.to_string()).unwrap(),
            serde_urlencoded::from_str::<TokenResponse>(resp_str_sample).unwrap(),
        ] {
            assert_eq!(parsed.remain.len(), 1);
            let request_token = parsed.into_request_token();
            assert_eq!(
                request_token.token,
                "Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik"
            );
            assert_eq!(
                request_token.token_secret,
                "Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM"
            );
            assert!(request_token.callback_confirmed);
        }
    }

    #[test]
    fn parse_access_token_response() {
        let resp_str_sample =
            "oauth_token=6253282-eWudHldSbIaelX7swmsiHImEL4KinwaGloHANdrY&oauth_token_secret=2EEfA6BG3ly3sR3RjE0IBSnlQu4ZrUzPiYKmrkVU&user_id=6253282&screen_name=twitterapi";
        let access_token = read_oauth_token(resp_str_sample.to_string())
            .unwrap()
            .into_access_token()
            .unwrap();
        assert_eq!(
            access_token.token,
            "6253282-eWudHldSbIaelX7swmsiHImEL4KinwaGloHANdrY"
        );
        assert_eq!(access_token.account_id, "6253282");
        assert_eq!(access_token.account_handle, "twitterapi");
    }

    #[test]
    fn access_token_requires_user_id() {
        let parsed = read_oauth_token("oauth_token=a&oauth_token_secret=b&screen_name=x".into())
            .unwrap()
            .into_access_token();
        assert!(matches!(
            parsed,
            Err(TokenReaderError::TokenKeyNotFound(USER_ID_KEY, _))
        ));
    }

    #[test]
    fn callback_not_confirmed() {
        let request_token = read_oauth_token("oauth_token=a&oauth_token_secret=b".into())
            .unwrap()
            .into_request_token();
        assert!(!request_token.callback_confirmed);
    }

    #[test]
    fn parse_response_edge() {
        let resp_str_sample = "oauth_token==&oauth_token_secret=&keyonly=&keyonly2&=&&";
        for parsed in [
            read_oauth_token(resp_str_sample.to_string()).unwrap(),
            serde_urlencoded::from_str::<TokenResponse>(resp_str_sample).unwrap(),
        ] {
            assert_eq!(parsed.oauth_token, "=");
            assert_eq!(parsed.oauth_token_secret, "");
            assert_eq!(parsed.remain.len(), 3);
            assert_eq!(parsed.remain.get("keyonly").unwrap(), "");
            assert_eq!(parsed.remain.get("keyonly2").unwrap(), "");
            assert_eq!(parsed.remain.get("").unwrap(), "");
        }
    }

    #[test]
    fn parse_percent_encoded_values() {
        let parsed =
            read_oauth_token("oauth_token=a%2Bb&oauth_token_secret=c%3Dd&screen_name=x+y".into())
                .unwrap();
        assert_eq!(parsed.oauth_token, "a+b");
        assert_eq!(parsed.oauth_token_secret, "c=d");
        assert_eq!(parsed.remain.get("screen_name").unwrap(), "x y");
    }

    #[test]
    fn parse_token_notfound() {
        let resp_str_sample = "oauth_token_secret=";
        let parsed = read_oauth_token(resp_str_sample.to_string());
        if let Err(TokenReaderError::TokenKeyNotFound(key, resp_str)) = parsed {
            assert_eq!(key, OAUTH_TOKEN_KEY);
            assert_eq!(resp_str, resp_str_sample)
        } else {
            panic!("expected missing oauth_token")
        }
    }

    #[test]
    fn parse_token_secret_notfound() {
        let resp_str_sample = "oauth_token=";
        let parsed = read_oauth_token(resp_str_sample.to_string());
        if let Err(TokenReaderError::TokenKeyNotFound(key, resp_str)) = parsed {
            assert_eq!(key, OAUTH_TOKEN_SECRET_KEY);
            assert_eq!(resp_str, resp_str_sample)
        } else {
            panic!("expected missing oauth_token_secret")
        }
    }
}
