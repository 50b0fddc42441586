//! Refresh Request
//!
//! RFC 6749 Section 6 - exchanging a refresh token for a new access token.
//! The client authenticates with HTTP Basic; the parameters travel in the
//! query for GET and in a form body for POST.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{HttpMethod, HttpRequest};
use crate::error::{ConfigurationError, OAuthResult};
use crate::response::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::signing::ensure_kind;
use crate::types::{append_query, ClientCredentials, ParameterList, Token, TokenKind};

/// Refresh request for `refresh_token`.
///
/// Fails with `InvalidTokenType` when the token is not a refresh token, and
/// with a configuration error for methods other than GET and POST.
pub fn build_refresh_request(
    access_token_endpoint: &str,
    credentials: &ClientCredentials,
    refresh_token: &Token,
    method: HttpMethod,
    timeout: Duration,
) -> OAuthResult<HttpRequest> {
    ensure_kind(refresh_token, TokenKind::Refresh)?;

    let params = ParameterList::new()
        .with("grant_type", "refresh_token")
        .with("client_id", credentials.client_id())
        .with("refresh_token", refresh_token.value());

    let mut headers = HashMap::new();
    headers.insert("authorization".to_string(), basic_authorization(credentials));
    headers.insert("accept".to_string(), JSON_CONTENT_TYPE.to_string());

    let (url, body) = match method {
        HttpMethod::Get => (append_query(access_token_endpoint, &params), None),
        HttpMethod::Post => {
            headers.insert("content-type".to_string(), FORM_CONTENT_TYPE.to_string());
            (access_token_endpoint.to_string(), Some(params.to_encoded()))
        }
        other => {
            return Err(ConfigurationError::UnsupportedMethod {
                method: other.to_string(),
            }
            .into())
        }
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
        timeout: Some(timeout),
    })
}

fn basic_authorization(credentials: &ClientCredentials) -> String {
    let pair = format!("{}:{}", credentials.client_id(), credentials.client_secret());
    format!("Basic {}", STANDARD.encode(pair))
}
