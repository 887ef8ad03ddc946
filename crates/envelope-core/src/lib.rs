//! # envelope-core
//!
//! Deterministic assembly of e-signature envelopes for insurance claims and
//! insurance purchases.
//!
//! Given a claim or purchase record and, optionally, the connected-field
//! extensions available to the account, this crate renders the HTML
//! document, places the signer's fields at anchor tokens inside it and
//! composes the envelope definition the signing platform expects.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same inputs and assets always produce the same envelope
//! 2. **No network I/O**: Submission belongs to `envelope-runtime`
//! 3. **All-or-nothing**: A failed assembly never returns a partial envelope
//! 4. **Anchored**: Every anchored field refers to a token present in the document
//!
//! ## Example
//!
//! ```rust,ignore
//! use envelope_core::{ClaimInput, EnvelopeArgs, EnvelopeAssembler};
//!
//! let claim = ClaimInput::from_json(&body)?;
//! let args = EnvelopeArgs::new("1000", "https://app.example.com/done");
//! let envelope = EnvelopeAssembler::bundled().assemble_claim(&claim, &args, Some(&extensions))?;
//! println!("{}", serde_json::to_string_pretty(&envelope)?);
//! ```

pub mod config;
pub mod envelope;
pub mod extensions;
pub mod fields;
pub mod input;
pub mod template;

mod lenient;

// Re-export main types at crate root
pub use config::{EnvelopeArgs, GatewayConfig, PaymentConfig};
pub use envelope::{
    Document, EnvelopeAssembler, EnvelopeDescriptor, EnvelopeStatus, RecipientViewRequest,
    Recipients, Signer,
};
pub use extensions::{
    extract_verification, has_all_required_extensions, parse_extensions, resolve_address,
    resolve_email, ExtensionData, ExtensionDescriptor, ExtensionTab, ResolvedExtensions,
    VerificationDescriptor,
};
pub use fields::{FieldBuilder, FieldDescriptor, FieldKind, PaymentFormulaBuilder, Tabs};
pub use input::{
    Address, ClaimInput, Identity, InsuranceDetail, InsuranceInfo, PurchaseInput,
    PurchaseRequest,
};
pub use template::{AssetStore, TemplateError, TemplateRenderer};

use thiserror::Error;

/// Errors that can occur during envelope assembly
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A caller-supplied field is missing or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A required verification tab could not be resolved from the extensions
    #[error("Missing field: {0}")]
    MissingField(String),
}
