//! Request Signing
//!
//! Per-token-type authorization of protected-resource requests. Each token
//! type implements [`TokenSigner`], a table of one operation per HTTP verb;
//! [`TokenType::signer`] picks the implementation for a stored token.

pub mod bearer;
pub mod mac;

pub use bearer::BearerSigner;
pub use mac::{MacAlgorithm, MacSigner};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::core::{HttpMethod, HttpRequest, NonceGenerator};
use crate::error::{OAuthError, OAuthResult};
use crate::response::FORM_CONTENT_TYPE;
use crate::types::{append_query, ParameterList, Token, TokenKind};

/// Access token types understood by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Bearer,
    Mac,
}

impl TokenType {
    /// `token_type` value used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::Mac => "mac",
        }
    }

    /// HTTP authentication scheme.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
            Self::Mac => "MAC",
        }
    }

    /// Token kind produced for this type.
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Bearer => TokenKind::Bearer,
            Self::Mac => TokenKind::Mac,
        }
    }

    /// Signer for `token`, failing when the token is not of this type.
    pub fn signer<'a>(
        self,
        token: &'a Token,
        nonces: &'a dyn NonceGenerator,
    ) -> OAuthResult<Box<dyn TokenSigner + 'a>> {
        Ok(match self {
            Self::Bearer => Box::new(BearerSigner::from_token(token)?),
            Self::Mac => Box::new(MacSigner::from_token(token, nonces)?),
        })
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("bearer") {
            Ok(Self::Bearer)
        } else if s.trim().eq_ignore_ascii_case("mac") {
            Ok(Self::Mac)
        } else {
            Err(OAuthError::invalid_token_type(format!(
                "unrecognized token type {:?}",
                s
            )))
        }
    }
}

impl TryFrom<TokenKind> for TokenType {
    type Error = OAuthError;

    fn try_from(kind: TokenKind) -> Result<Self, Self::Error> {
        match kind {
            TokenKind::Bearer => Ok(Self::Bearer),
            TokenKind::Mac => Ok(Self::Mac),
            TokenKind::Refresh => Err(OAuthError::invalid_token_type(
                "a refresh token cannot authorize resource requests",
            )),
        }
    }
}

/// Check that `token` is of `expected` kind before it is used.
pub(crate) fn ensure_kind(token: &Token, expected: TokenKind) -> OAuthResult<()> {
    if token.kind() != expected {
        return Err(OAuthError::invalid_token_type(format!(
            "expected a {} token, found {}",
            expected,
            token.kind()
        )));
    }
    if token.is_empty() {
        return Err(OAuthError::invalid_token_type(format!(
            "the stored {} token is empty",
            expected
        )));
    }
    Ok(())
}

/// A pending protected-resource request.
#[derive(Clone, Copy, Debug)]
pub struct ResourceRequest<'a> {
    /// Resource server base URL, without trailing slash.
    pub base_url: &'a str,
    /// Request path; a leading `/` is added when missing.
    pub path: &'a str,
    /// Caller-supplied parameters.
    pub params: &'a ParameterList,
    /// Carry credentials in the `Authorization` header rather than inline.
    pub use_header: bool,
}

impl<'a> ResourceRequest<'a> {
    pub fn new(base_url: &'a str, path: &'a str, params: &'a ParameterList) -> Self {
        Self {
            base_url,
            path,
            params,
            use_header: true,
        }
    }

    pub fn with_header(mut self, use_header: bool) -> Self {
        self.use_header = use_header;
        self
    }

    /// Resource URL without parameters.
    pub fn url(&self) -> String {
        if self.path.starts_with('/') {
            format!("{}{}", self.base_url, self.path)
        } else {
            format!("{}/{}", self.base_url, self.path)
        }
    }

    /// URL with `params` in the query string.
    pub(crate) fn url_with_query(&self, params: &ParameterList) -> String {
        append_query(&self.url(), params)
    }
}

/// An authorized request, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl SignedRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a form body. Empty parameter lists leave the body unset.
    pub fn with_form_body(mut self, params: &ParameterList) -> Self {
        if !params.is_empty() {
            self.headers
                .insert("content-type".to_string(), FORM_CONTENT_TYPE.to_string());
            self.body = Some(params.to_encoded());
        }
        self
    }

    /// `Authorization` header value, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("authorization").map(String::as_str)
    }

    pub fn into_http_request(self, timeout: Duration) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            timeout: Some(timeout),
        }
    }
}

/// Authorization capability of a token type, one operation per HTTP verb.
pub trait TokenSigner: Send + Sync {
    /// Token type this signer presents.
    fn token_type(&self) -> TokenType;

    fn authorize_get(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest>;

    fn authorize_post(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest>;

    fn authorize_put(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest>;

    fn authorize_delete(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest>;

    /// Dispatch on `method`.
    fn authorize(
        &self,
        method: HttpMethod,
        request: &ResourceRequest<'_>,
    ) -> OAuthResult<SignedRequest> {
        match method {
            HttpMethod::Get => self.authorize_get(request),
            HttpMethod::Post => self.authorize_post(request),
            HttpMethod::Put => self.authorize_put(request),
            HttpMethod::Delete => self.authorize_delete(request),
        }
    }
}
