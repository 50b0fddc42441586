//! Token Types
//!
//! Access and refresh credentials held by a session.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Token variant discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Bearer,
    Mac,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::Mac => "mac",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra attribute holding the MAC key.
pub const MAC_SECRET: &str = "secret";
/// Extra attribute holding the MAC algorithm name.
pub const MAC_ALGORITHM: &str = "algorithm";
/// Extra attribute holding the MAC `ext` value.
pub const MAC_EXT: &str = "ext";

/// An OAuth2 credential.
///
/// The value is kept secret and redacted from `Debug` output.
#[derive(Clone)]
pub struct Token {
    value: SecretString,
    scope: String,
    lifetime_secs: i64,
    issued_at: DateTime<Utc>,
    kind: TokenKind,
    extra: HashMap<String, String>,
}

impl Token {
    /// Lifetime marker for tokens without a known expiry.
    pub const UNLIMITED: i64 = -1;

    /// Longest lifetime kept; larger declared lifetimes are clamped to it.
    pub const MAX_LIFETIME: i64 = 100 * 365 * 24 * 60 * 60;

    /// Create a token issued now with unlimited lifetime.
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            value: SecretString::new(value.into()),
            scope: String::new(),
            lifetime_secs: Self::UNLIMITED,
            issued_at: Utc::now(),
            kind,
            extra: HashMap::new(),
        }
    }

    pub fn bearer(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Bearer, value)
    }

    /// MAC token with its key and algorithm.
    pub fn mac(
        value: impl Into<String>,
        secret: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self::new(TokenKind::Mac, value)
            .with_extra(MAC_SECRET, secret)
            .with_extra(MAC_ALGORITHM, algorithm)
    }

    pub fn refresh(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Refresh, value)
    }

    /// Set the declared lifetime in seconds and restart the validity window.
    pub fn with_lifetime(mut self, lifetime_secs: i64) -> Self {
        self.lifetime_secs = lifetime_secs.min(Self::MAX_LIFETIME);
        self.issued_at = Utc::now();
        self
    }

    /// Override the issuance time (restored or test tokens).
    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Set the MAC `ext` value signed with every request.
    pub fn with_ext(self, ext: impl Into<String>) -> Self {
        self.with_extra(MAC_EXT, ext)
    }

    /// Token value.
    pub fn value(&self) -> &str {
        self.value.expose_secret()
    }

    /// `true` when no credential is held.
    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn extra(&self) -> &HashMap<String, String> {
        &self.extra
    }

    /// Type-specific attribute.
    pub fn extra_value(&self, name: &str) -> Option<&str> {
        self.extra.get(name).map(String::as_str)
    }

    /// MAC `ext` value, empty when unset.
    pub fn ext(&self) -> &str {
        self.extra_value(MAC_EXT).unwrap_or("")
    }

    /// Time since issuance.
    pub fn age(&self) -> Duration {
        Utc::now() - self.issued_at
    }

    /// Whether the token is still inside its declared validity window.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Validity as of `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.lifetime_secs == Self::UNLIMITED {
            return true;
        }
        (now - self.issued_at).num_seconds() <= self.lifetime_secs
    }

    /// Remaining validity; `None` for unlimited tokens and for expiries past
    /// the representable date range.
    pub fn remaining_lifetime(&self) -> Option<Duration> {
        if self.lifetime_secs == Self::UNLIMITED {
            return None;
        }
        let expires_at = Duration::try_seconds(self.lifetime_secs)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))?;
        let remaining = expires_at - Utc::now();
        Some(remaining.max(Duration::zero()))
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extra_keys: Vec<&String> = self.extra.keys().collect();
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("lifetime_secs", &self.lifetime_secs)
            .field("issued_at", &self.issued_at)
            .field("extra_keys", &extra_keys)
            .finish()
    }
}
