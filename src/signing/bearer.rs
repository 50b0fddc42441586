//! Bearer Signer
//!
//! Presents the token as-is, either as `Authorization: Bearer <token>` or as an
//! `access_token` parameter.

use super::{ensure_kind, ResourceRequest, SignedRequest, TokenSigner, TokenType};
use crate::core::HttpMethod;
use crate::error::OAuthResult;
use crate::types::{Token, TokenKind};

/// Parameter carrying the token when the header is disabled.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Signer for bearer tokens.
#[derive(Debug)]
pub struct BearerSigner<'a> {
    token: &'a Token,
}

impl<'a> BearerSigner<'a> {
    /// Fails with `InvalidTokenType` unless `token` is a non-empty bearer token.
    pub fn from_token(token: &'a Token) -> OAuthResult<Self> {
        ensure_kind(token, TokenKind::Bearer)?;
        Ok(Self { token })
    }

    fn header_value(&self) -> String {
        format!("{} {}", TokenType::Bearer.scheme(), self.token.value())
    }

    /// GET/DELETE: parameters and inline token go in the query.
    fn sign_query(
        &self,
        method: HttpMethod,
        request: &ResourceRequest<'_>,
    ) -> OAuthResult<SignedRequest> {
        if request.use_header {
            let url = request.url_with_query(request.params);
            return Ok(SignedRequest::new(method, url)
                .with_header("authorization", self.header_value()));
        }

        let mut params = request.params.clone();
        params.push(ACCESS_TOKEN_PARAM, self.token.value());
        Ok(SignedRequest::new(method, request.url_with_query(&params)))
    }

    /// POST/PUT: parameters and inline token go in the form body.
    fn sign_body(
        &self,
        method: HttpMethod,
        request: &ResourceRequest<'_>,
    ) -> OAuthResult<SignedRequest> {
        if request.use_header {
            return Ok(SignedRequest::new(method, request.url())
                .with_header("authorization", self.header_value())
                .with_form_body(request.params));
        }

        let mut params = request.params.clone();
        params.push(ACCESS_TOKEN_PARAM, self.token.value());
        Ok(SignedRequest::new(method, request.url()).with_form_body(&params))
    }
}

impl TokenSigner for BearerSigner<'_> {
    fn token_type(&self) -> TokenType {
        TokenType::Bearer
    }

    fn authorize_get(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_query(HttpMethod::Get, request)
    }

    fn authorize_post(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_body(HttpMethod::Post, request)
    }

    fn authorize_put(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_body(HttpMethod::Put, request)
    }

    fn authorize_delete(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_query(HttpMethod::Delete, request)
    }
}
