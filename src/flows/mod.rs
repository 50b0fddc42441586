//! OAuth2 Flows
//!
//! Request builders for each protocol step. They are pure: the session sends
//! the requests and interprets the responses.
//!
//! - **Authorization Request** (RFC 6749 Section 4.1.1)
//! - **Access Token Request** (RFC 6749 Sections 4.1.3, 4.3, 4.4): authorization
//!   code, password and client credentials grants
//! - **Refresh Request** (RFC 6749 Section 6)

pub mod access_token;
pub mod authorization;
pub mod refresh;

pub use access_token::{build_access_token_request, AccessTokenGrant, AccessTokenRequest};
pub use authorization::build_authorization_uri;
pub use refresh::build_refresh_request;
