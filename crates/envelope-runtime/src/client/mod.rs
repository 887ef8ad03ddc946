//! Signing platform clients.
//!
//! Two seams: [`ExtensionSource`] reads an account's connected-field
//! extensions, [`EnvelopeSubmitter`] creates envelopes and embedded signing
//! sessions. The HTTP implementation lives behind the `http` feature; tests
//! and offline callers supply their own.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use envelope_core::{EnvelopeDescriptor, ExtensionDescriptor, RecipientViewRequest};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::secrets::AccessToken;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpClient;

/// Attempts made for an idempotent metadata read.
pub const READ_ATTEMPTS: usize = 3;

/// Errors from the signing platform clients.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success response, passed through uninterpreted
    #[error("API error: {status} - {message}")]
    RemoteApi { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::Timeout(_) => true,
            ClientError::RemoteApi { status, .. } => *status == 429 || *status >= 500,
            ClientError::Parse(_) | ClientError::NotConfigured(_) => false,
        }
    }
}

/// Source of an account's connected-field extensions.
#[async_trait]
pub trait ExtensionSource: Send + Sync {
    /// Every tab group installed for `account_id`.
    async fn tab_groups(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<Vec<ExtensionDescriptor>, ClientError>;
}

/// Creates envelopes and embedded signing sessions.
#[async_trait]
pub trait EnvelopeSubmitter: Send + Sync {
    /// Create and send an envelope, returning its id.
    async fn create_envelope(
        &self,
        account_id: &str,
        token: &AccessToken,
        envelope: &EnvelopeDescriptor,
    ) -> Result<String, ClientError>;

    /// URL of an embedded signing session for the envelope's signer.
    async fn recipient_view(
        &self,
        account_id: &str,
        token: &AccessToken,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<String, ClientError>;
}

/// Run an idempotent read, retrying transient failures with backoff.
pub async fn with_retry<T, F, Fut>(
    operation: &str,
    backoff: ExponentialBuilder,
    call: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    call.retry(backoff)
        .when(ClientError::is_transient)
        .notify(|err, delay| {
            warn!(operation, error = %err, ?delay, "Retrying after transient failure");
        })
        .await
}

/// Backoff used for metadata reads.
pub fn read_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(READ_ATTEMPTS - 1)
}
