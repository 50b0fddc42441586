//! OAuth2 Error Types
//!
//! Closed error taxonomy for the session, signers and response interpreter.
//! Server-reported `error` codes map onto one variant each; everything else the
//! crate can fail with is folded in through nested enums.

use std::time::Duration;
use thiserror::Error;

/// Description and URI lifted from an OAuth2 error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Human-readable `error_description`.
    pub description: Option<String>,
    /// `error_uri` pointing at provider documentation.
    pub uri: Option<String>,
}

impl ErrorDetail {
    pub fn new(description: Option<String>, uri: Option<String>) -> Self {
        Self {
            description: description.filter(|d| !d.is_empty()),
            uri: uri.filter(|u| !u.is_empty()),
        }
    }

    /// Detail carrying only a description.
    pub fn described(description: impl Into<String>) -> Self {
        Self::new(Some(description.into()), None)
    }

    fn suffix(&self) -> String {
        match &self.description {
            Some(description) => format!(": {}", description),
            None => String::new(),
        }
    }
}

/// Root error type.
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Invalid request{}", .0.suffix())]
    InvalidRequest(ErrorDetail),

    #[error("Invalid client{}", .0.suffix())]
    InvalidClient(ErrorDetail),

    #[error("Invalid grant{}", .0.suffix())]
    InvalidGrant(ErrorDetail),

    #[error("The client is not authorized{}", .0.suffix())]
    UnauthorizedClient(ErrorDetail),

    #[error("Unsupported grant type{}", .0.suffix())]
    UnsupportedGrantType(ErrorDetail),

    #[error("Invalid scope{}", .0.suffix())]
    InvalidScope(ErrorDetail),

    #[error("Invalid token type: {message}")]
    InvalidTokenType { message: String },

    /// Base case for unmapped error codes.
    #[error("Request failed ({error}){}", .detail.suffix())]
    Other { error: String, detail: ErrorDetail },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl OAuthError {
    /// Shorthand for [`OAuthError::InvalidTokenType`].
    pub fn invalid_token_type(message: impl Into<String>) -> Self {
        Self::InvalidTokenType {
            message: message.into(),
        }
    }

    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "OAUTH2_INVALID_REQUEST",
            Self::InvalidClient(_) => "OAUTH2_INVALID_CLIENT",
            Self::InvalidGrant(_) => "OAUTH2_INVALID_GRANT",
            Self::UnauthorizedClient(_) => "OAUTH2_UNAUTHORIZED_CLIENT",
            Self::UnsupportedGrantType(_) => "OAUTH2_UNSUPPORTED_GRANT_TYPE",
            Self::InvalidScope(_) => "OAUTH2_INVALID_SCOPE",
            Self::InvalidTokenType { .. } => "OAUTH2_TOKEN_TYPE",
            Self::Other { .. } => "OAUTH2_OTHER",
            Self::Configuration(_) => "OAUTH2_CONFIG",
            Self::Network(_) => "OAUTH2_NETWORK",
            Self::Protocol(_) => "OAUTH2_PROTOCOL",
        }
    }

    /// The OAuth2 wire code, when the error was reported by the server.
    pub fn wire_error(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest(_) => Some("invalid_request"),
            Self::InvalidClient(_) => Some("invalid_client"),
            Self::InvalidGrant(_) => Some("invalid_grant"),
            Self::UnauthorizedClient(_) => Some("unauthorized_client"),
            Self::UnsupportedGrantType(_) => Some("unsupported_grant_type"),
            Self::InvalidScope(_) => Some("invalid_scope"),
            Self::Other { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    /// Description and URI reported alongside the error, if any.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            Self::InvalidRequest(detail)
            | Self::InvalidClient(detail)
            | Self::InvalidGrant(detail)
            | Self::UnauthorizedClient(detail)
            | Self::UnsupportedGrantType(detail)
            | Self::InvalidScope(detail) => Some(detail),
            Self::Other { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Other { error, .. } => {
                error == "temporarily_unavailable" || error == "server_error"
            }
            _ => false,
        }
    }

    /// Check if error requires the user to authorize again.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::InvalidGrant(_) | Self::UnauthorizedClient(_))
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Scope entry {scope:?} contains the scope divider {divider:?}")]
    InvalidScope { scope: String, divider: char },

    #[error("Unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Failed to create HTTP client: {message}")]
    ClientBuild { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientBuild { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

/// Result type for OAuth2 operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// OAuth2 error response body.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

impl OAuthErrorResponse {
    /// Convert into the typed error.
    pub fn into_error(self) -> OAuthError {
        map_error_code(
            &self.error,
            ErrorDetail::new(self.error_description, self.error_uri),
        )
    }
}

/// Map an OAuth2 `error` wire value to its typed error.
///
/// Codes compare case-insensitively; unknown codes fall through to
/// [`OAuthError::Other`].
pub fn map_error_code(error: &str, detail: ErrorDetail) -> OAuthError {
    match error.to_ascii_lowercase().as_str() {
        "invalid_request" => OAuthError::InvalidRequest(detail),
        "invalid_client" => OAuthError::InvalidClient(detail),
        "invalid_grant" => OAuthError::InvalidGrant(detail),
        "unauthorized_client" => OAuthError::UnauthorizedClient(detail),
        "unsupported_grant_type" => OAuthError::UnsupportedGrantType(detail),
        "invalid_scope" => OAuthError::InvalidScope(detail),
        _ => OAuthError::Other {
            error: error.to_string(),
            detail,
        },
    }
}

/// Error for a token endpoint response that failed without an OAuth2 error body.
pub fn http_status_error(status: u16) -> OAuthError {
    OAuthError::Other {
        error: format!("http_{}", status),
        detail: ErrorDetail::described(format!("HTTP {}", status)),
    }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &OAuthError) -> String {
    match error {
        OAuthError::InvalidGrant(_) => {
            "Your authorization is no longer valid. Please sign in again.".to_string()
        }
        OAuthError::InvalidClient(_) | OAuthError::UnauthorizedClient(_) => {
            "This application is not authorized with the service. Please contact support."
                .to_string()
        }
        OAuthError::InvalidScope(_) => {
            "The requested permissions are not available. Please try again.".to_string()
        }
        OAuthError::InvalidTokenType { .. } => {
            "The service issued a credential this application cannot use.".to_string()
        }
        OAuthError::Network(NetworkError::Timeout { .. }) => {
            "The request timed out. Please check your connection and try again.".to_string()
        }
        OAuthError::Network(_) => {
            "The service could not be reached. Please check your connection and try again."
                .to_string()
        }
        _ => "An authentication error occurred. Please try again.".to_string(),
    }
}
