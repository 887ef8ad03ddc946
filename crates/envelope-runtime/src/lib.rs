//! # envelope-runtime
//!
//! Network side of envelope submission.
//!
//! `envelope-core` builds envelope descriptors without I/O. This crate adds
//! what a running service needs around it: configuration from YAML and the
//! environment, the access token, clients for the connected-fields and
//! eSignature APIs, and a per-account extension cache.
//!
//! ## Example
//!
//! ```rust,ignore
//! use envelope_runtime::{AccessToken, EnvelopeService, RuntimeConfig};
//!
//! let config = RuntimeConfig::load(None)?;
//! let service = EnvelopeService::http(config)?;
//! let token = AccessToken::from_env()?;
//!
//! let receipt = service
//!     .submit_claim("account-id", &token, &claim, None)
//!     .await?;
//! println!("{}", receipt.redirect_url);
//! ```

use envelope_core::AssemblyError;
use thiserror::Error;

pub mod cache;
pub mod client;
pub mod config;
pub mod secrets;
pub mod service;

pub use cache::{ExtensionCache, ExtensionList};
pub use client::{ClientError, EnvelopeSubmitter, ExtensionSource};
pub use config::RuntimeConfig;
pub use secrets::{AccessToken, TokenSource};
pub use service::{EnvelopeService, SubmissionReceipt};

#[cfg(feature = "http")]
pub use client::HttpClient;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl RuntimeError {
    /// Whether the caller supplied something unusable, as opposed to a
    /// platform or configuration failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            RuntimeError::Assembly(AssemblyError::InvalidInput(_))
                | RuntimeError::Assembly(AssemblyError::MissingField(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: RuntimeError = ClientError::RemoteApi {
            status: 401,
            message: "USER_AUTHENTICATION_FAILED".into(),
        }
        .into();
        assert_eq!(err.to_string(), "API error: 401 - USER_AUTHENTICATION_FAILED");
        assert!(!err.is_invalid_input());

        let err: RuntimeError = AssemblyError::InvalidInput("email is required".into()).into();
        assert!(err.is_invalid_input());

        let err = RuntimeError::Config("account id not set".into());
        assert_eq!(err.to_string(), "Configuration error: account id not set");
    }
}
