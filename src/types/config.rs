//! Configuration Types
//!
//! Client registration, provider endpoints and session settings.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::core::HttpMethod;
use crate::error::{ConfigurationError, OAuthResult};
use crate::signing::TokenType;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default scope divider.
pub const DEFAULT_SCOPE_DIVIDER: char = ' ';

/// Client registration with the provider.
#[derive(Clone)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: Option<SecretString>,
    redirect_uri: String,
}

impl ClientCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.map(SecretString::new),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Client secret, empty for public clients.
    pub fn client_secret(&self) -> &str {
        self.client_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .unwrap_or("")
    }

    pub fn has_client_secret(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Redirect URI, echoed verbatim in authorization and token requests.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Provider endpoints and request preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServerEndpoints")]
pub struct ServerEndpoints {
    authorization_endpoint: String,
    access_token_endpoint: String,
    resource_endpoint: String,
    preferred_method: HttpMethod,
    use_authorization_header: bool,
}

/// Unvalidated endpoint document, as read from configuration.
#[derive(Deserialize)]
struct RawServerEndpoints {
    authorization_endpoint: String,
    access_token_endpoint: String,
    resource_endpoint: String,
    #[serde(default)]
    preferred_method: HttpMethod,
    #[serde(default = "default_use_authorization_header")]
    use_authorization_header: bool,
}

fn default_use_authorization_header() -> bool {
    true
}

impl TryFrom<RawServerEndpoints> for ServerEndpoints {
    type Error = ConfigurationError;

    fn try_from(raw: RawServerEndpoints) -> Result<Self, Self::Error> {
        Ok(Self {
            authorization_endpoint: normalize_endpoint(&raw.authorization_endpoint)?,
            access_token_endpoint: normalize_endpoint(&raw.access_token_endpoint)?,
            resource_endpoint: normalize_endpoint(&raw.resource_endpoint)?,
            preferred_method: raw.preferred_method,
            use_authorization_header: raw.use_authorization_header,
        })
    }
}

/// Validate an absolute http(s) URL and drop one trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<String, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidEndpoint {
        url: endpoint.to_string(),
    };
    let parsed = Url::parse(endpoint).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(endpoint.strip_suffix('/').unwrap_or(endpoint).to_string())
}

impl ServerEndpoints {
    /// Create endpoints with default preferences (POST, header authorization).
    pub fn new(
        authorization_endpoint: &str,
        access_token_endpoint: &str,
        resource_endpoint: &str,
    ) -> OAuthResult<Self> {
        Ok(RawServerEndpoints {
            authorization_endpoint: authorization_endpoint.to_string(),
            access_token_endpoint: access_token_endpoint.to_string(),
            resource_endpoint: resource_endpoint.to_string(),
            preferred_method: HttpMethod::Post,
            use_authorization_header: true,
        }
        .try_into()?)
    }

    pub fn with_preferred_method(mut self, method: HttpMethod) -> Self {
        self.preferred_method = method;
        self
    }

    pub fn with_authorization_header(mut self, use_header: bool) -> Self {
        self.use_authorization_header = use_header;
        self
    }

    pub fn authorization_endpoint(&self) -> &str {
        &self.authorization_endpoint
    }

    pub fn access_token_endpoint(&self) -> &str {
        &self.access_token_endpoint
    }

    pub fn resource_endpoint(&self) -> &str {
        &self.resource_endpoint
    }

    pub fn preferred_method(&self) -> HttpMethod {
        self.preferred_method
    }

    pub fn use_authorization_header(&self) -> bool {
        self.use_authorization_header
    }
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Client registration.
    pub credentials: ClientCredentials,
    /// Provider endpoints.
    pub endpoints: ServerEndpoints,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Refresh an expired access token before protected-resource requests.
    pub auto_refresh: bool,
    /// Character joining scope entries.
    pub scope_divider: char,
    /// Token type fixed in advance; `None` resolves it from each token response.
    pub token_type: Option<TokenType>,
}

impl SessionConfig {
    pub fn new(credentials: ClientCredentials, endpoints: ServerEndpoints) -> Self {
        Self {
            credentials,
            endpoints,
            timeout: DEFAULT_TIMEOUT,
            auto_refresh: true,
            scope_divider: DEFAULT_SCOPE_DIVIDER,
            token_type: None,
        }
    }
}
