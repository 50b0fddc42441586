//! OAuth2 Types
//!
//! Credential model and configuration value types.

pub mod config;
pub mod params;
pub mod token;

pub use config::*;
pub use params::*;
pub use token::*;
