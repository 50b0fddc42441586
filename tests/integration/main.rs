//! Integration tests
//!
//! Session flows over the mock transport, and the reqwest transport against a
//! WireMock server.

mod reqwest_transport;
mod session_flow;

use oauth2_session::{
    session_config, MockHttpTransport, MockNonceGenerator, Session, SessionConfig,
    SessionConfigBuilder,
};

/// Builder with every required field, pointing at `base`.
pub fn config_builder(base: &str) -> SessionConfigBuilder {
    session_config()
        .client_id("client-1")
        .client_secret("secret-1")
        .redirect_uri("https://app.example.com/callback")
        .authorization_endpoint(format!("{}/authorize", base))
        .access_token_endpoint(format!("{}/token", base))
        .resource_endpoint(format!("{}/api", base))
}

pub fn test_config() -> SessionConfig {
    config_builder("https://auth.example.com")
        .build()
        .expect("valid config")
}

/// Session over a mock transport with a fixed nonce source.
pub fn mock_session(config: SessionConfig) -> Session<MockHttpTransport, MockNonceGenerator> {
    Session::with_components(
        config,
        MockHttpTransport::new(),
        MockNonceGenerator::new("n0nce"),
    )
}
