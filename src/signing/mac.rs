//! MAC Signer
//!
//! HMAC request signing for MAC access tokens. Every request carries an
//! `Authorization: MAC ...` header whose `mac` field is an HMAC over the
//! normalized request string:
//!
//! ```text
//! nonce \n METHOD \n request-target \n host \n port \n bodyhash \n ext \n
//! ```
//!
//! The nonce is `<token age in seconds>:<15 random characters>` and the body
//! hash is the base64 digest of the request body (an empty body still hashes).

use base64::{engine::general_purpose::STANDARD, Engine};
use ring::{digest, hmac};
use url::Url;

use super::{ensure_kind, ResourceRequest, SignedRequest, TokenSigner, TokenType};
use crate::core::{HttpMethod, NonceGenerator};
use crate::error::{ConfigurationError, OAuthError, OAuthResult};
use crate::types::{Token, TokenKind, MAC_ALGORITHM, MAC_SECRET};

/// Random part of the nonce.
pub const NONCE_LENGTH: usize = 15;

/// Supported MAC algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl MacAlgorithm {
    /// Parse names such as `hmac-sha-1`, `HMAC-SHA256` or `sha-256`.
    pub fn parse(name: &str) -> OAuthResult<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let hash = lower
            .find("sha")
            .map(|start| lower[start..].replace('-', ""))
            .unwrap_or_default();
        let prefix_ok = lower
            .find("sha")
            .map(|start| matches!(&lower[..start], "" | "hmac-" | "hmac"))
            .unwrap_or(false);

        match (prefix_ok, hash.as_str()) {
            (true, "sha1") => Ok(Self::HmacSha1),
            (true, "sha256") => Ok(Self::HmacSha256),
            (true, "sha384") => Ok(Self::HmacSha384),
            (true, "sha512") => Ok(Self::HmacSha512),
            _ => Err(OAuthError::invalid_token_type(format!(
                "unsupported MAC algorithm {:?}",
                name
            ))),
        }
    }

    /// Canonical wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "hmac-sha-1",
            Self::HmacSha256 => "hmac-sha-256",
            Self::HmacSha384 => "hmac-sha-384",
            Self::HmacSha512 => "hmac-sha-512",
        }
    }

    fn digest_algorithm(&self) -> &'static digest::Algorithm {
        match self {
            Self::HmacSha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::HmacSha256 => &digest::SHA256,
            Self::HmacSha384 => &digest::SHA384,
            Self::HmacSha512 => &digest::SHA512,
        }
    }

    fn hmac_algorithm(&self) -> hmac::Algorithm {
        match self {
            Self::HmacSha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::HmacSha256 => hmac::HMAC_SHA256,
            Self::HmacSha384 => hmac::HMAC_SHA384,
            Self::HmacSha512 => hmac::HMAC_SHA512,
        }
    }

    /// Base64 digest of `body`.
    pub fn body_hash(&self, body: &[u8]) -> String {
        STANDARD.encode(digest::digest(self.digest_algorithm(), body))
    }

    /// Base64 HMAC of `message` under `key`.
    pub fn sign(&self, key: &[u8], message: &[u8]) -> String {
        let key = hmac::Key::new(self.hmac_algorithm(), key);
        STANDARD.encode(hmac::sign(&key, message))
    }
}

impl std::fmt::Display for MacAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Request attributes covered by the signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub nonce: String,
    pub method: HttpMethod,
    /// Path plus query of the request URL.
    pub target: String,
    pub host: String,
    pub port: u16,
    pub body_hash: String,
    pub ext: String,
}

impl NormalizedRequest {
    /// Newline-terminated string that is signed.
    pub fn to_normalized_string(&self) -> String {
        let port = self.port.to_string();
        let mut normalized = String::new();
        for line in [
            self.nonce.as_str(),
            self.method.as_str(),
            self.target.as_str(),
            self.host.as_str(),
            port.as_str(),
            self.body_hash.as_str(),
            self.ext.as_str(),
        ] {
            normalized.push_str(line);
            normalized.push('\n');
        }
        normalized
    }

    /// MAC over the normalized string.
    pub fn mac(&self, algorithm: MacAlgorithm, secret: &str) -> String {
        algorithm.sign(secret.as_bytes(), self.to_normalized_string().as_bytes())
    }

    /// `Authorization` header value; empty `bodyhash` and `ext` are omitted.
    pub fn authorization_header(&self, id: &str, mac: &str) -> String {
        let mut fields = vec![
            format!("id=\"{}\"", id),
            format!("nonce=\"{}\"", self.nonce),
        ];
        if !self.body_hash.is_empty() {
            fields.push(format!("bodyhash=\"{}\"", self.body_hash));
        }
        if !self.ext.is_empty() {
            fields.push(format!("ext=\"{}\"", self.ext));
        }
        fields.push(format!("mac=\"{}\"", mac));
        format!("{} {}", TokenType::Mac.scheme(), fields.join(","))
    }
}

/// Signer for MAC tokens.
///
/// Credentials always travel in the `Authorization` header; the
/// `use_header` preference of a request does not apply to MAC.
pub struct MacSigner<'a> {
    token: &'a Token,
    secret: &'a str,
    algorithm: MacAlgorithm,
    nonces: &'a dyn NonceGenerator,
}

impl<'a> MacSigner<'a> {
    /// Fails with `InvalidTokenType` unless `token` is a MAC token with a
    /// secret and a supported algorithm.
    pub fn from_token(token: &'a Token, nonces: &'a dyn NonceGenerator) -> OAuthResult<Self> {
        ensure_kind(token, TokenKind::Mac)?;
        let secret = token
            .extra_value(MAC_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OAuthError::invalid_token_type("MAC token has no secret"))?;
        let algorithm = token
            .extra_value(MAC_ALGORITHM)
            .ok_or_else(|| OAuthError::invalid_token_type("MAC token has no algorithm"))
            .and_then(MacAlgorithm::parse)?;

        Ok(Self {
            token,
            secret,
            algorithm,
            nonces,
        })
    }

    pub fn algorithm(&self) -> MacAlgorithm {
        self.algorithm
    }

    fn nonce(&self) -> String {
        format!(
            "{}:{}",
            self.token.age().num_seconds().max(0),
            self.nonces.random_string(NONCE_LENGTH)
        )
    }

    /// Sign `signed`, whose URL and body are final.
    fn sign(&self, signed: SignedRequest, base_url: &str) -> OAuthResult<SignedRequest> {
        let base = parse_url(base_url)?;
        let target = parse_url(&signed.url)?;

        let mut request_target = target.path().to_string();
        if let Some(query) = target.query() {
            request_target.push('?');
            request_target.push_str(query);
        }

        let normalized = NormalizedRequest {
            nonce: self.nonce(),
            method: signed.method,
            target: request_target,
            host: base.host_str().unwrap_or_default().to_string(),
            port: base.port_or_known_default().unwrap_or(80),
            body_hash: self
                .algorithm
                .body_hash(signed.body.as_deref().unwrap_or_default().as_bytes()),
            ext: self.token.ext().to_string(),
        };
        let mac = normalized.mac(self.algorithm, self.secret);

        tracing::trace!(
            method = %signed.method,
            algorithm = %self.algorithm,
            target = %normalized.target,
            "Signed MAC request"
        );

        Ok(signed.with_header(
            "authorization",
            normalized.authorization_header(self.token.value(), &mac),
        ))
    }

    fn sign_query(
        &self,
        method: HttpMethod,
        request: &ResourceRequest<'_>,
    ) -> OAuthResult<SignedRequest> {
        let signed = SignedRequest::new(method, request.url_with_query(request.params));
        self.sign(signed, request.base_url)
    }

    fn sign_body(
        &self,
        method: HttpMethod,
        request: &ResourceRequest<'_>,
    ) -> OAuthResult<SignedRequest> {
        let signed = SignedRequest::new(method, request.url()).with_form_body(request.params);
        self.sign(signed, request.base_url)
    }
}

fn parse_url(url: &str) -> OAuthResult<Url> {
    Url::parse(url).map_err(|_| {
        ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
        }
        .into()
    })
}

impl TokenSigner for MacSigner<'_> {
    fn token_type(&self) -> TokenType {
        TokenType::Mac
    }

    fn authorize_get(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_query(HttpMethod::Get, request)
    }

    fn authorize_post(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_body(HttpMethod::Post, request)
    }

    fn authorize_put(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_body(HttpMethod::Put, request)
    }

    fn authorize_delete(&self, request: &ResourceRequest<'_>) -> OAuthResult<SignedRequest> {
        self.sign_query(HttpMethod::Delete, request)
    }
}

impl std::fmt::Debug for MacSigner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacSigner")
            .field("token", self.token)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
