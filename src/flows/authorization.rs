//! Authorization Request
//!
//! RFC 6749 Section 4.1.1 - the URI the user-agent is sent to. Building it is
//! pure string work; the user-agent completes the step.

use crate::types::{append_query, ClientCredentials, ParameterList};

/// Authorization URI with `response_type`, `client_id`, `redirect_uri` and,
/// when non-empty, `scope` and `state`, in that order.
pub fn build_authorization_uri(
    authorization_endpoint: &str,
    credentials: &ClientCredentials,
    scope: Option<&str>,
    state: Option<&str>,
) -> String {
    let mut params = ParameterList::new()
        .with("response_type", "code")
        .with("client_id", credentials.client_id())
        .with("redirect_uri", credentials.redirect_uri());

    if let Some(scope) = scope.filter(|s| !s.is_empty()) {
        params.push("scope", scope);
    }
    if let Some(state) = state.filter(|s| !s.is_empty()) {
        params.push("state", state);
    }

    append_query(authorization_endpoint, &params)
}
