//! Access token handling.
//!
//! OAuth bearer tokens for the signing platform are wrapped in
//! [`AccessToken`], which never prints its value through `Debug` or
//! `Display`. The value is exposed only where a request header is built.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::RuntimeError;

/// Environment variable consulted by [`AccessToken::from_env`].
pub const ACCESS_TOKEN_ENV: &str = "DS_ACCESS_TOKEN";

/// Where a token was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Read from an environment variable
    Environment,
    /// Handed over by the caller, e.g. from a session
    Programmatic,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Environment => write!(f, "environment"),
            TokenSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// OAuth bearer token for the signing platform.
pub struct AccessToken {
    value: SecretString,
    source: TokenSource,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source: TokenSource::Programmatic,
        }
    }

    /// Load from [`ACCESS_TOKEN_ENV`].
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_env_var(ACCESS_TOKEN_ENV)
    }

    pub fn from_env_var(env_var: &str) -> Result<Self, RuntimeError> {
        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self {
                value: SecretString::from(value),
                source: TokenSource::Environment,
            }),
            _ => Err(RuntimeError::Config(format!(
                "access token not set: configure '{}' environment variable",
                env_var
            ))),
        }
    }

    /// Expose the token for an `Authorization` header.
    ///
    /// Call only at the point of use; never store the returned value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }

    /// `Bearer <token>` header value.
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self {
            value: SecretString::from(self.expose().to_string()),
            source: self.source,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "access token from {} [REDACTED]", self.source)
    }
}
