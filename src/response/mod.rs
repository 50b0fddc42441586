//! Wire Response Interpreter
//!
//! Classifies raw HTTP responses by content type, lifts the structured payload
//! and maps OAuth2 error payloads onto [`OAuthError`]. Interpretation never
//! touches session state; the session decides what to do with the tokens.

pub mod form;
mod tokens;

pub use form::parse_form_parameters;

use std::collections::HashMap;

use crate::core::HttpResponse;
use crate::error::{
    http_status_error, ErrorDetail, OAuthError, OAuthErrorResponse, OAuthResult, ProtocolError,
};
use crate::signing::TokenType;
use crate::types::{ParameterList, Token};

/// JSON content type.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Form content type.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Structured content of a response body.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// JSON object body.
    Json(serde_json::Map<String, serde_json::Value>),
    /// Form-encoded body.
    Form(ParameterList),
    /// Anything else, including malformed JSON; the text stays in `body`.
    Raw,
}

impl Payload {
    /// Classify `body` by its `Content-Type`.
    pub fn from_body(content_type: Option<&str>, body: &str) -> Self {
        let media_type = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match media_type.as_str() {
            JSON_CONTENT_TYPE => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(serde_json::Value::Object(map)) => Self::Json(map),
                _ => Self::Raw,
            },
            FORM_CONTENT_TYPE if !body.trim().is_empty() => {
                Self::Form(parse_form_parameters(body))
            }
            _ => Self::Raw,
        }
    }

    /// Scalar parameter as text; JSON numbers and booleans are stringified.
    pub fn parameter(&self, name: &str) -> Option<String> {
        match self {
            Self::Json(map) => match map.get(name)? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            Self::Form(params) => params.get(name).map(str::to_string),
            Self::Raw => None,
        }
    }

    /// OAuth2 error carried by the payload.
    fn error(&self) -> Option<OAuthError> {
        let error = self.parameter("error").filter(|c| !c.is_empty())?;
        let response = OAuthErrorResponse {
            error,
            error_description: self.parameter("error_description"),
            error_uri: self.parameter("error_uri"),
        };
        Some(response.into_error())
    }
}

/// An interpreted response.
#[derive(Clone, Debug)]
pub struct ParsedResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: String,
    pub payload: Payload,
    access_token: Option<Token>,
    refresh_token: Option<Token>,
}

impl ParsedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Payload parameter, see [`Payload::parameter`].
    pub fn parameter(&self, name: &str) -> Option<String> {
        self.payload.parameter(name)
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn access_token(&self) -> Option<&Token> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&Token> {
        self.refresh_token.as_ref()
    }

    /// Extract `access_token` and `refresh_token` from the payload.
    ///
    /// A missing `access_token` is not an error here; a present one must have a
    /// recognised type (`pinned`, or the payload's `token_type`).
    pub fn extract_tokens(&mut self, pinned: Option<TokenType>) -> OAuthResult<()> {
        self.access_token = tokens::extract_access_token(&self.payload, pinned)?;
        self.refresh_token = tokens::extract_refresh_token(&self.payload);
        Ok(())
    }

    /// Decode the JSON payload into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> OAuthResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ProtocolError::InvalidResponse {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Classify `response` and fail on error signals.
///
/// An `error` parameter in the payload is mapped to its typed error, whatever
/// the status. A `401` without one yields `UnauthorizedClient` described by
/// `WWW-Authenticate` (or the body's description when the header is absent).
pub fn interpret(response: HttpResponse) -> OAuthResult<ParsedResponse> {
    let payload = Payload::from_body(response.header("content-type"), &response.body);

    if let Some(error) = payload.error() {
        tracing::debug!(
            status = response.status,
            error = error.wire_error().unwrap_or_default(),
            "Response carries an OAuth2 error"
        );
        return Err(error);
    }

    if response.status == 401 {
        let description = response
            .header("www-authenticate")
            .map(str::to_string)
            .or_else(|| payload.parameter("error_description"));
        tracing::debug!(status = response.status, "Response rejected the client");
        return Err(OAuthError::UnauthorizedClient(ErrorDetail::new(
            description,
            payload.parameter("error_uri"),
        )));
    }

    Ok(ParsedResponse {
        status: response.status,
        headers: response.headers,
        body: response.body,
        payload,
        access_token: None,
        refresh_token: None,
    })
}

/// Interpret a token endpoint response and extract its tokens.
///
/// Non-2xx responses without an OAuth2 error body fail with
/// [`http_status_error`].
pub fn interpret_token_response(
    response: HttpResponse,
    pinned: Option<TokenType>,
) -> OAuthResult<ParsedResponse> {
    let mut parsed = interpret(response)?;
    if !parsed.is_success() {
        return Err(http_status_error(parsed.status));
    }
    parsed.extract_tokens(pinned)?;
    Ok(parsed)
}
