//! Configuration Builder
//!
//! Fluent builder for session configuration.

use std::time::Duration;

use crate::core::HttpMethod;
use crate::error::{ConfigurationError, OAuthError, OAuthResult};
use crate::signing::TokenType;
use crate::types::{
    ClientCredentials, ServerEndpoints, SessionConfig, DEFAULT_SCOPE_DIVIDER, DEFAULT_TIMEOUT,
};

/// Session configuration builder.
pub struct SessionConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    authorization_endpoint: Option<String>,
    access_token_endpoint: Option<String>,
    resource_endpoint: Option<String>,
    preferred_method: HttpMethod,
    use_authorization_header: bool,
    timeout: Duration,
    auto_refresh: bool,
    scope_divider: char,
    token_type: Option<TokenType>,
}

impl SessionConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            authorization_endpoint: None,
            access_token_endpoint: None,
            resource_endpoint: None,
            preferred_method: HttpMethod::default(),
            use_authorization_header: true,
            timeout: DEFAULT_TIMEOUT,
            auto_refresh: true,
            scope_divider: DEFAULT_SCOPE_DIVIDER,
            token_type: None,
        }
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set authorization endpoint.
    pub fn authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = Some(endpoint.into());
        self
    }

    /// Set access token endpoint.
    pub fn access_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.access_token_endpoint = Some(endpoint.into());
        self
    }

    /// Set protected resource endpoint.
    pub fn resource_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.resource_endpoint = Some(endpoint.into());
        self
    }

    /// Set the method used for resource requests that do not name one.
    pub fn preferred_method(mut self, method: HttpMethod) -> Self {
        self.preferred_method = method;
        self
    }

    /// Send credentials in the `Authorization` header (default) or inline.
    pub fn use_authorization_header(mut self, use_header: bool) -> Self {
        self.use_authorization_header = use_header;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable refresh before resource requests.
    pub fn auto_refresh(mut self, enable: bool) -> Self {
        self.auto_refresh = enable;
        self
    }

    /// Set scope divider.
    pub fn scope_divider(mut self, divider: char) -> Self {
        self.scope_divider = divider;
        self
    }

    /// Pin the token type instead of reading `token_type` from responses.
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    /// Build the session configuration.
    pub fn build(self) -> OAuthResult<SessionConfig> {
        let client_id = required(self.client_id, "client_id")?;
        let redirect_uri = required(self.redirect_uri, "redirect_uri")?;
        let authorization_endpoint =
            required(self.authorization_endpoint, "authorization_endpoint")?;
        let access_token_endpoint = required(self.access_token_endpoint, "access_token_endpoint")?;
        let resource_endpoint = required(self.resource_endpoint, "resource_endpoint")?;

        let endpoints = ServerEndpoints::new(
            &authorization_endpoint,
            &access_token_endpoint,
            &resource_endpoint,
        )?
        .with_preferred_method(self.preferred_method)
        .with_authorization_header(self.use_authorization_header);

        Ok(SessionConfig {
            credentials: ClientCredentials::new(client_id, self.client_secret, redirect_uri),
            endpoints,
            timeout: self.timeout,
            auto_refresh: self.auto_refresh,
            scope_divider: self.scope_divider,
            token_type: self.token_type,
        })
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn required(value: Option<String>, field: &str) -> OAuthResult<String> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        OAuthError::Configuration(ConfigurationError::MissingField {
            field: field.to_string(),
        })
    })
}

/// Create a new session configuration builder.
pub fn session_config() -> SessionConfigBuilder {
    SessionConfigBuilder::new()
}
