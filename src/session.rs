//! OAuth2 Session
//!
//! Orchestrates one client against one provider: authorization URI, token
//! acquisition, signed resource requests and refresh. The session owns the
//! current access/refresh token pair; every mutation goes through its methods.
//!
//! Refresh is single-flight: concurrent callers that find the access token
//! expired wait for one refresh request instead of sending their own.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::{
    DefaultNonceGenerator, HttpMethod, HttpTransport, NonceGenerator, ReqwestHttpTransport,
    DEFAULT_MAX_RESPONSE_SIZE,
};
use crate::error::{ConfigurationError, OAuthError, OAuthResult, ProtocolError};
use crate::flows::{
    build_access_token_request, build_authorization_uri, build_refresh_request,
    AccessTokenRequest,
};
use crate::response::{interpret, interpret_token_response, ParsedResponse};
use crate::signing::{ResourceRequest, TokenType};
use crate::types::{
    ClientCredentials, ParameterList, ServerEndpoints, SessionConfig, Token, TokenKind,
};

/// Length of generated `state` values.
pub const STATE_LENGTH: usize = 32;

/// Where the session stands in the authorization flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowPhase {
    /// No tokens and no authorization URI handed out.
    Unauthenticated,
    /// An authorization URI was built; waiting for a code.
    AuthorizationRequested,
    /// An access token is held.
    AccessTokenObtained,
    /// A refresh request is in flight.
    RefreshInProgress,
}

#[derive(Debug)]
struct SessionState {
    access_token: Option<Token>,
    refresh_token: Option<Token>,
    scope: Vec<String>,
    scope_divider: char,
    csrf_state: String,
    authorization_requested: bool,
    refreshing: bool,
    /// Bumped whenever the token pair is replaced.
    generation: u64,
}

/// OAuth2 client session.
pub struct Session<T: HttpTransport = ReqwestHttpTransport, N: NonceGenerator = DefaultNonceGenerator>
{
    config: SessionConfig,
    transport: Arc<T>,
    nonces: Arc<N>,
    state: RwLock<SessionState>,
    refresh_lock: Mutex<()>,
}

impl Session<ReqwestHttpTransport, DefaultNonceGenerator> {
    /// Create a session with the reqwest transport and the system RNG.
    pub fn new(config: SessionConfig) -> OAuthResult<Self> {
        let transport =
            ReqwestHttpTransport::with_options(config.timeout, DEFAULT_MAX_RESPONSE_SIZE)?;
        Ok(Self::with_components(
            config,
            transport,
            DefaultNonceGenerator::new(),
        ))
    }
}

impl<T: HttpTransport, N: NonceGenerator> Session<T, N> {
    /// Create a session with custom implementations.
    pub fn with_components(config: SessionConfig, transport: T, nonces: N) -> Self {
        let state = SessionState {
            access_token: None,
            refresh_token: None,
            scope: Vec::new(),
            scope_divider: config.scope_divider,
            csrf_state: String::new(),
            authorization_requested: false,
            refreshing: false,
            generation: 0,
        };
        Self {
            config,
            transport: Arc::new(transport),
            nonces: Arc::new(nonces),
            state: RwLock::new(state),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.config.credentials
    }

    pub fn endpoints(&self) -> &ServerEndpoints {
        &self.config.endpoints
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Session State ==========

    pub fn phase(&self) -> FlowPhase {
        let state = self.read();
        if state.refreshing {
            FlowPhase::RefreshInProgress
        } else if state.access_token.is_some() {
            FlowPhase::AccessTokenObtained
        } else if state.authorization_requested {
            FlowPhase::AuthorizationRequested
        } else {
            FlowPhase::Unauthenticated
        }
    }

    /// Current access token.
    pub fn access_token(&self) -> Option<Token> {
        self.read().access_token.clone()
    }

    /// Current refresh token.
    pub fn refresh_token(&self) -> Option<Token> {
        self.read().refresh_token.clone()
    }

    /// Seed the session with tokens persisted by the application.
    pub fn restore_tokens(&self, access: Option<Token>, refresh: Option<Token>) -> OAuthResult<()> {
        if let Some(token) = &access {
            if token.kind() == TokenKind::Refresh {
                return Err(OAuthError::invalid_token_type(
                    "a refresh token cannot be stored as the access token",
                ));
            }
        }
        if let Some(token) = &refresh {
            if token.kind() != TokenKind::Refresh {
                return Err(OAuthError::invalid_token_type(format!(
                    "expected a refresh token, found {}",
                    token.kind()
                )));
            }
        }

        let mut state = self.write();
        state.access_token = access;
        state.refresh_token = refresh;
        state.generation += 1;
        debug!(
            has_access_token = state.access_token.is_some(),
            has_refresh_token = state.refresh_token.is_some(),
            "Restored session tokens"
        );
        Ok(())
    }

    // ========== Scope ==========

    pub fn scope(&self) -> Vec<String> {
        self.read().scope.clone()
    }

    pub fn scope_divider(&self) -> char {
        self.read().scope_divider
    }

    /// Scope entries joined by the divider; `None` when no scope is set.
    pub fn scope_string(&self) -> Option<String> {
        let state = self.read();
        if state.scope.is_empty() {
            return None;
        }
        Some(state.scope.join(&state.scope_divider.to_string()))
    }

    /// Replace the scope. Entries containing the divider are rejected.
    pub fn set_scope<I, S>(&self, scope: I) -> OAuthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.write();
        let entries: Vec<String> = scope
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        for entry in &entries {
            check_scope_entry(entry, state.scope_divider)?;
        }
        state.scope = entries;
        Ok(())
    }

    /// Append one scope entry.
    pub fn add_scope(&self, entry: impl Into<String>) -> OAuthResult<()> {
        let entry = entry.into();
        let mut state = self.write();
        check_scope_entry(&entry, state.scope_divider)?;
        if !entry.is_empty() {
            state.scope.push(entry);
        }
        Ok(())
    }

    /// Change the divider; fails if a current entry contains it.
    pub fn set_scope_divider(&self, divider: char) -> OAuthResult<()> {
        let mut state = self.write();
        for entry in &state.scope {
            check_scope_entry(entry, divider)?;
        }
        state.scope_divider = divider;
        Ok(())
    }

    // ========== CSRF State ==========

    /// Opaque `state` value sent with the authorization request.
    pub fn state(&self) -> String {
        self.read().csrf_state.clone()
    }

    pub fn set_state(&self, csrf_state: impl Into<String>) {
        self.write().csrf_state = csrf_state.into();
    }

    /// Store and return a fresh random `state`.
    pub fn generate_state(&self) -> String {
        let csrf_state = self.nonces.random_string(STATE_LENGTH);
        self.write().csrf_state = csrf_state.clone();
        csrf_state
    }

    // ========== Authorization Request ==========

    /// URI the user-agent must visit to authorize this client.
    pub fn build_authorization_uri(&self) -> String {
        let scope = self.scope_string();
        let csrf_state = self.state();
        let uri = build_authorization_uri(
            self.endpoints().authorization_endpoint(),
            self.credentials(),
            scope.as_deref(),
            Some(csrf_state.as_str()),
        );
        self.write().authorization_requested = true;
        debug!(scope = scope.as_deref().unwrap_or(""), "Built authorization URI");
        uri
    }

    // ========== Access Token Request ==========

    /// Request an access token and store the result.
    ///
    /// On failure the stored tokens are left untouched.
    pub async fn request_access_token(
        &self,
        request: AccessTokenRequest,
    ) -> OAuthResult<ParsedResponse> {
        let grant_type = request.grant.grant_type();
        let scope = self.scope_string();
        let http_request = build_access_token_request(
            self.endpoints().access_token_endpoint(),
            self.credentials(),
            &request,
            self.config.timeout,
        );

        debug!(grant_type, "Requesting access token");
        let result = async {
            let response = self.transport.send(http_request).await?;
            interpret_token_response(response, self.config.token_type)
        }
        .await;

        let parsed = match result {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(grant_type, error = %error, "Access token request failed");
                return Err(error);
            }
        };

        let access = stamp_scope(required_access_token(&parsed)?, scope.as_deref());
        let refresh = parsed.refresh_token().cloned();
        info!(
            grant_type,
            token_type = %access.kind(),
            expires_in = access.lifetime_secs(),
            has_refresh_token = refresh.is_some(),
            "Obtained access token"
        );
        self.store_tokens(access, refresh);
        Ok(parsed)
    }

    /// `client_credentials` grant.
    pub async fn client_credentials_grant(
        &self,
        extra_params: ParameterList,
    ) -> OAuthResult<ParsedResponse> {
        self.request_access_token(AccessTokenRequest::client_credentials().with_params(extra_params))
            .await
    }

    /// `authorization_code` grant.
    pub async fn authorization_code_grant(
        &self,
        code: &str,
        extra_params: ParameterList,
    ) -> OAuthResult<ParsedResponse> {
        self.request_access_token(
            AccessTokenRequest::authorization_code(code).with_params(extra_params),
        )
        .await
    }

    /// `password` grant. Only for clients the resource owner fully trusts.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
        extra_params: ParameterList,
    ) -> OAuthResult<ParsedResponse> {
        self.request_access_token(
            AccessTokenRequest::password(username, password).with_params(extra_params),
        )
        .await
    }

    fn store_tokens(&self, access: Token, refresh: Option<Token>) {
        let mut state = self.write();
        state.access_token = Some(access);
        if refresh.is_some() {
            state.refresh_token = refresh;
        }
        state.generation += 1;
    }

    // ========== Protected Resources ==========

    /// Send a signed request to `{resource_endpoint}{uri}`.
    ///
    /// `method` defaults to the server's preferred method. The response goes
    /// through error mapping but never changes the stored tokens.
    pub async fn request_resource(
        &self,
        uri: &str,
        params: &ParameterList,
        method: Option<HttpMethod>,
    ) -> OAuthResult<ParsedResponse> {
        let method = method.unwrap_or_else(|| self.endpoints().preferred_method());

        let token = if self.config.auto_refresh && self.needs_refresh() {
            self.ensure_valid_access_token().await?
        } else {
            self.access_token()
                .ok_or_else(|| OAuthError::invalid_token_type("no access token is stored"))?
        };

        let http_request = {
            let token_type = match self.config.token_type {
                Some(token_type) => token_type,
                None => TokenType::try_from(token.kind())?,
            };
            let signer = token_type.signer(&token, &*self.nonces)?;
            let request = ResourceRequest::new(self.endpoints().resource_endpoint(), uri, params)
                .with_header(self.endpoints().use_authorization_header());
            signer
                .authorize(method, &request)?
                .into_http_request(self.config.timeout)
        };

        debug!(method = %method, url = %http_request.url, "Requesting protected resource");
        let response = self.transport.send(http_request).await?;
        interpret(response).map_err(|error| {
            warn!(method = %method, uri, error = %error, "Protected resource request failed");
            error
        })
    }

    fn needs_refresh(&self) -> bool {
        let state = self.read();
        let expired = state
            .access_token
            .as_ref()
            .map(|token| !token.is_valid())
            .unwrap_or(false);
        expired && state.refresh_token.is_some()
    }

    // ========== Refresh ==========

    /// Exchange the refresh token for a new token pair.
    ///
    /// `method` is GET or POST, default POST. If another refresh completes while
    /// this call waits for its turn, the call returns that result without a new
    /// request.
    pub async fn refresh_access_token(&self, method: Option<HttpMethod>) -> OAuthResult<Token> {
        let observed = self.read().generation;
        self.refresh_after(observed, method).await
    }

    /// Current access token, refreshed first when it has expired.
    ///
    /// Concurrent callers share a single refresh request.
    pub async fn ensure_valid_access_token(&self) -> OAuthResult<Token> {
        let (current, observed) = {
            let state = self.read();
            (state.access_token.clone(), state.generation)
        };
        match current {
            Some(token) if token.is_valid() => Ok(token),
            _ => self.refresh_after(observed, None).await,
        }
    }

    async fn refresh_after(&self, observed: u64, method: Option<HttpMethod>) -> OAuthResult<Token> {
        let refresh_token = self.stored_refresh_token()?;

        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.read();
            if state.generation != observed {
                debug!("Tokens replaced while waiting; skipping refresh");
                return state
                    .access_token
                    .clone()
                    .ok_or_else(|| OAuthError::invalid_token_type("no access token is stored"));
            }
        }

        let _refreshing = RefreshingFlag::raise(&self.state);
        let result = self
            .send_refresh(&refresh_token, method.unwrap_or(HttpMethod::Post))
            .await;

        match &result {
            Ok(token) => info!(
                token_type = %token.kind(),
                expires_in = token.lifetime_secs(),
                "Refreshed access token"
            ),
            Err(error) => warn!(error = %error, "Refresh request failed"),
        }
        result
    }

    fn stored_refresh_token(&self) -> OAuthResult<Token> {
        match self.refresh_token() {
            Some(token) if token.kind() == TokenKind::Refresh => Ok(token),
            Some(token) => Err(OAuthError::invalid_token_type(format!(
                "expected a refresh token, found {}",
                token.kind()
            ))),
            None => Err(OAuthError::invalid_token_type("no refresh token is stored")),
        }
    }

    async fn send_refresh(&self, refresh_token: &Token, method: HttpMethod) -> OAuthResult<Token> {
        let http_request = build_refresh_request(
            self.endpoints().access_token_endpoint(),
            self.credentials(),
            refresh_token,
            method,
            self.config.timeout,
        )?;

        debug!(method = %method, "Refreshing access token");
        let response = self.transport.send(http_request).await?;
        let parsed = interpret_token_response(response, self.config.token_type)?;

        let access = stamp_scope(required_access_token(&parsed)?, self.scope_string().as_deref());
        self.store_tokens(access.clone(), parsed.refresh_token().cloned());
        Ok(access)
    }
}

/// Marks a refresh in flight; cleared on drop, including when the refresh
/// future is cancelled.
struct RefreshingFlag<'a> {
    state: &'a RwLock<SessionState>,
}

impl<'a> RefreshingFlag<'a> {
    fn raise(state: &'a RwLock<SessionState>) -> Self {
        state.write().unwrap_or_else(PoisonError::into_inner).refreshing = true;
        Self { state }
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing = false;
    }
}

fn check_scope_entry(entry: &str, divider: char) -> Result<(), ConfigurationError> {
    if entry.contains(divider) {
        return Err(ConfigurationError::InvalidScope {
            scope: entry.to_string(),
            divider,
        });
    }
    Ok(())
}

fn required_access_token(parsed: &ParsedResponse) -> OAuthResult<Token> {
    parsed.access_token().cloned().ok_or_else(|| {
        ProtocolError::MissingField {
            field: "access_token".to_string(),
        }
        .into()
    })
}

/// Stamp the requested scope on a new access token.
fn stamp_scope(token: Token, scope: Option<&str>) -> Token {
    match scope {
        Some(scope) => token.with_scope(scope),
        None => token,
    }
}
