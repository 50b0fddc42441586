//! OAuth2 Client Session
//!
//! Client side of OAuth 2.0: obtaining, holding, refreshing and presenting
//! access tokens.
//!
//! # Features
//!
//! - Authorization request URI (RFC 6749 Section 4.1.1)
//! - Authorization Code, Password and Client Credentials grants
//! - Token Refresh (RFC 6749 Section 6), single-flight per session
//! - Bearer tokens, in the `Authorization` header or inline
//! - MAC tokens, HMAC-signed per request (`hmac-sha-1`, `hmac-sha-256`)
//! - Typed errors mapped from JSON and form-encoded error payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_session::{session_config, ParameterList, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = session_config()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .redirect_uri("https://myapp.com/callback")
//!         .authorization_endpoint("https://provider.com/authorize")
//!         .access_token_endpoint("https://provider.com/token")
//!         .resource_endpoint("https://api.provider.com")
//!         .build()?;
//!
//!     let session = Session::new(config)?;
//!     session.set_scope(["read", "write"])?;
//!     session.generate_state();
//!     println!("Authorize at: {}", session.build_authorization_uri());
//!
//!     // ...after the redirect delivers `code`:
//!     session.authorization_code_grant("code", ParameterList::new()).await?;
//!     let me = session.request_resource("/me", &ParameterList::new(), None).await?;
//!     println!("{}", me.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credential model, parameters and configuration
//! - `error`: error taxonomy and wire error mapping
//! - `core`: injected collaborators (HTTP transport, nonce generator)
//! - `response`: wire response interpreter
//! - `signing`: per-token-type request signers (Bearer, MAC)
//! - `flows`: request builders for each protocol step
//! - `builders`: fluent configuration builder
//! - `session`: the orchestrator holding the token pair

pub mod builders;
pub mod core;
pub mod error;
pub mod flows;
pub mod response;
pub mod session;
pub mod signing;
pub mod types;

// Re-export session
pub use session::{FlowPhase, Session};

// Re-export builders
pub use builders::{session_config, SessionConfigBuilder};

// Re-export core types
pub use core::{
    DefaultNonceGenerator, HttpMethod, HttpRequest, HttpResponse, HttpTransport,
    MockHttpTransport, MockNonceGenerator, NonceGenerator, ReqwestHttpTransport,
};

// Re-export errors
pub use error::{ErrorDetail, OAuthError, OAuthResult};

// Re-export flows
pub use flows::{AccessTokenGrant, AccessTokenRequest};

// Re-export response and signing
pub use response::{ParsedResponse, Payload};
pub use signing::{MacAlgorithm, SignedRequest, TokenSigner, TokenType};

// Re-export types
pub use types::{
    ClientCredentials, ParameterList, ServerEndpoints, SessionConfig, Token, TokenKind,
};
