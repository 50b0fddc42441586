//! OAuth2 Core Components
//!
//! Collaborators injected into the session: HTTP transport and randomness.

pub mod nonce;
pub mod transport;

pub use nonce::*;
pub use transport::*;
