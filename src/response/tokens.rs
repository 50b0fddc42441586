//! Token Extraction
//!
//! Builds access and refresh tokens from a parsed success payload.

use super::Payload;
use crate::error::{OAuthError, OAuthResult, ProtocolError};
use crate::signing::TokenType;
use crate::types::{Token, MAC_ALGORITHM, MAC_SECRET};

pub(crate) const ACCESS_TOKEN: &str = "access_token";
pub(crate) const REFRESH_TOKEN: &str = "refresh_token";
pub(crate) const TOKEN_TYPE: &str = "token_type";
pub(crate) const EXPIRES_IN: &str = "expires_in";
pub(crate) const SCOPE: &str = "scope";

/// Access token carried by `payload`, if any.
///
/// The token type is `pinned` when given, otherwise read from `token_type`.
pub(crate) fn extract_access_token(
    payload: &Payload,
    pinned: Option<TokenType>,
) -> OAuthResult<Option<Token>> {
    let value = match payload.parameter(ACCESS_TOKEN).filter(|v| !v.is_empty()) {
        Some(value) => value,
        None => return Ok(None),
    };

    let token_type = match pinned {
        Some(token_type) => token_type,
        None => payload
            .parameter(TOKEN_TYPE)
            .ok_or_else(|| OAuthError::invalid_token_type("response carries no token_type"))?
            .parse::<TokenType>()?,
    };

    let lifetime = parse_expires_in(payload.parameter(EXPIRES_IN).as_deref())?;

    let token = match token_type {
        TokenType::Bearer => Token::bearer(value),
        TokenType::Mac => {
            let secret = required_mac_field(payload, MAC_SECRET)?;
            let algorithm = required_mac_field(payload, MAC_ALGORITHM)?;
            Token::mac(value, secret, algorithm)
        }
    };

    let token = match payload.parameter(SCOPE) {
        Some(scope) => token.with_scope(scope),
        None => token,
    };

    Ok(Some(token.with_lifetime(lifetime)))
}

/// Refresh token carried by `payload`, if any.
pub(crate) fn extract_refresh_token(payload: &Payload) -> Option<Token> {
    payload
        .parameter(REFRESH_TOKEN)
        .filter(|v| !v.is_empty())
        .map(Token::refresh)
}

fn required_mac_field(payload: &Payload, name: &str) -> OAuthResult<String> {
    payload
        .parameter(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            OAuthError::invalid_token_type(format!("MAC token response carries no {}", name))
        })
}

/// `expires_in` as whole seconds, at most [`Token::MAX_LIFETIME`]; absent
/// means unlimited.
fn parse_expires_in(raw: Option<&str>) -> OAuthResult<i64> {
    let raw = match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw,
        None => return Ok(Token::UNLIMITED),
    };
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|secs| secs as i64))
        .map(|secs| secs.min(Token::MAX_LIFETIME))
        .map_err(|_| {
            ProtocolError::InvalidResponse {
                message: format!("expires_in is not a number: {:?}", raw),
            }
            .into()
        })
}
