//! HTTP authentication for WS-Management endpoints.
//!
//! Management controllers accept either Basic or RFC 2617 Digest
//! authentication. Basic is stateless; Digest keeps a [`digest::Challenge`]
//! whose nonce count must advance on every request, so it is owned by the
//! transport and never duplicated.

pub mod digest;

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use digest::Challenge;

/// Authentication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The `WWW-Authenticate` value could not be understood.
    #[error("malformed digest challenge: {0}")]
    MalformedChallenge(String),

    /// Only MD5 is implemented.
    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// Only `auth` and unqualified digests are implemented.
    #[error("unsupported digest qop '{0}'")]
    UnsupportedQop(String),

    /// The server demanded authentication without sending a challenge.
    #[error("server answered 401 without a WWW-Authenticate challenge")]
    MissingChallenge,

    /// Digest authentication needs a username and password.
    #[error("digest authentication requires a username and password")]
    MissingCredentials,
}

/// How requests are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No Authorization header
    None,
    /// HTTP Basic
    #[default]
    Basic,
    /// HTTP Digest (RFC 2617, MD5)
    Digest,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(AuthMode::None),
            "basic" => Ok(AuthMode::Basic),
            "digest" => Ok(AuthMode::Digest),
            other => Err(format!(
                "unknown auth mode '{other}' (expected none, basic or digest)"
            )),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Digest => "digest",
        })
    }
}

/// Username and password for an endpoint.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into().into()),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// True when either half is missing; such credentials are never sent.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() || self.password.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
