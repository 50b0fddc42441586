//! Access Token Request
//!
//! RFC 6749 Sections 4.1.3, 4.3 and 4.4 - the token endpoint request for the
//! authorization code, password and client credentials grants.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{HttpMethod, HttpRequest};
use crate::response::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::types::{ClientCredentials, ParameterList};

/// Grant presented to the token endpoint.
#[derive(Clone)]
pub enum AccessTokenGrant {
    /// The client is its own resource owner.
    ClientCredentials,
    /// Code returned to the redirect URI.
    AuthorizationCode { code: String },
    /// Resource owner credentials; only for clients the user fully trusts.
    Password {
        username: String,
        password: SecretString,
    },
}

impl AccessTokenGrant {
    /// `grant_type` value.
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::Password { .. } => "password",
        }
    }

    fn push_fields(&self, params: &mut ParameterList) {
        match self {
            Self::ClientCredentials => {}
            Self::AuthorizationCode { code } => params.push("code", code.as_str()),
            Self::Password { username, password } => {
                params.push("username", username.as_str());
                params.push("password", password.expose_secret().as_str());
            }
        }
    }
}

impl std::fmt::Debug for AccessTokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientCredentials => f.write_str("ClientCredentials"),
            Self::AuthorizationCode { .. } => f
                .debug_struct("AuthorizationCode")
                .field("code", &"[REDACTED]")
                .finish(),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Grant plus caller-supplied parameters.
#[derive(Clone, Debug)]
pub struct AccessTokenRequest {
    pub grant: AccessTokenGrant,
    /// Appended after the standard parameters.
    pub extra_params: ParameterList,
}

impl AccessTokenRequest {
    pub fn new(grant: AccessTokenGrant) -> Self {
        Self {
            grant,
            extra_params: ParameterList::new(),
        }
    }

    pub fn client_credentials() -> Self {
        Self::new(AccessTokenGrant::ClientCredentials)
    }

    pub fn authorization_code(code: impl Into<String>) -> Self {
        Self::new(AccessTokenGrant::AuthorizationCode { code: code.into() })
    }

    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AccessTokenGrant::Password {
            username: username.into(),
            password: SecretString::new(password.into()),
        })
    }

    pub fn with_params(mut self, params: ParameterList) -> Self {
        self.extra_params.extend_from(&params);
        self
    }

    /// Form body: `client_id`, `client_secret`, `redirect_uri`, `grant_type`,
    /// grant fields, then extra parameters.
    pub fn form_parameters(&self, credentials: &ClientCredentials) -> ParameterList {
        let mut params = ParameterList::new()
            .with("client_id", credentials.client_id())
            .with("client_secret", credentials.client_secret())
            .with("redirect_uri", credentials.redirect_uri())
            .with("grant_type", self.grant.grant_type());
        self.grant.push_fields(&mut params);
        params.extend_from(&self.extra_params);
        params
    }
}

/// POST request to the token endpoint.
pub fn build_access_token_request(
    access_token_endpoint: &str,
    credentials: &ClientCredentials,
    request: &AccessTokenRequest,
    timeout: Duration,
) -> HttpRequest {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), FORM_CONTENT_TYPE.to_string());
    headers.insert("accept".to_string(), JSON_CONTENT_TYPE.to_string());

    HttpRequest {
        method: HttpMethod::Post,
        url: access_token_endpoint.to_string(),
        headers,
        body: Some(request.form_parameters(credentials).to_encoded()),
        timeout: Some(timeout),
    }
}
