//! Assembly configuration.
//!
//! Pricing constants and payment gateway identity are passed into the
//! builders explicitly; nothing here is global or mutable.

use serde::{Deserialize, Serialize};

/// Pricing constants used by the payment formula chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaymentConfig {
    /// Multiplier converting the total into the gateway's minor unit (cents)
    pub currency_multiplier: u32,

    /// Discount applied when the signer ticks the discount checkbox
    pub discount_percent: u32,

    /// Premium as a percentage of (coverage - deductible)
    pub insurance_rate_percent: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency_multiplier: 100,
            discount_percent: 5,
            insurance_rate_percent: 10,
        }
    }
}

/// Payment gateway the final formula field charges through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway account id registered with the signing platform
    pub account_id: String,

    /// Gateway name (e.g., "Stripe")
    pub name: String,

    /// Name shown to the signer
    #[serde(default)]
    pub display_name: Option<String>,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl GatewayConfig {
    /// Create a gateway config charging in USD.
    pub fn new(account_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            display_name: None,
            currency_code: default_currency(),
        }
    }

    /// Set the name shown to the signer.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Per-request envelope arguments supplied by the request layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvelopeArgs {
    /// Client-assigned id marking the signer as embedded
    pub signer_client_id: String,

    /// Where the signing session redirects when finished
    #[serde(default)]
    pub return_url: String,
}

impl EnvelopeArgs {
    pub fn new(signer_client_id: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self {
            signer_client_id: signer_client_id.into(),
            return_url: return_url.into(),
        }
    }
}
