//! Nonce Generator
//!
//! Random strings for MAC nonces and the CSRF `state` parameter.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::{Mutex, PoisonError};

/// Random-string source (for dependency injection).
pub trait NonceGenerator: Send + Sync {
    /// Produce `len` random alphanumeric characters.
    fn random_string(&self, len: usize) -> String;
}

/// Default generator backed by the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNonceGenerator;

impl DefaultNonceGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl NonceGenerator for DefaultNonceGenerator {
    fn random_string(&self, len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

/// Mock generator returning a fixed value.
///
/// The value is repeated or truncated to the requested length so output length
/// matches the real generator.
#[derive(Default)]
pub struct MockNonceGenerator {
    value: Mutex<String>,
    requested_lengths: Mutex<Vec<usize>>,
}

impl MockNonceGenerator {
    /// Create a mock that always yields characters from `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(value.into()),
            requested_lengths: Mutex::new(Vec::new()),
        }
    }

    /// Replace the fixed value.
    pub fn set_value(&self, value: impl Into<String>) -> &Self {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.into();
        self
    }

    /// Lengths requested so far.
    pub fn get_requested_lengths(&self) -> Vec<usize> {
        self.requested_lengths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NonceGenerator for MockNonceGenerator {
    fn random_string(&self, len: usize) -> String {
        self.requested_lengths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(len);

        let value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if value.is_empty() {
            return "x".repeat(len);
        }
        value.chars().cycle().take(len).collect()
    }
}
