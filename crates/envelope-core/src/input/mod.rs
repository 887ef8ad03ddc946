//! Caller-supplied request records.
//!
//! The request layer hands over already-parsed JSON. Bodies are validated
//! against the embedded schemas and then deserialized into these typed
//! records, which stay immutable for the duration of one assembly call.

mod schema;

pub use schema::{validate_request, RequestKind, SchemaError};

use serde::{Deserialize, Serialize};

use crate::lenient;
use crate::AssemblyError;

/// Who the signer is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Identity {
    /// Display name used for the signer ("First Last").
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Postal address as typed into the request form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

/// One address component, named the way templates and anchors name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Street,
    City,
    State,
    Country,
    ZipCode,
}

impl AddressField {
    /// All components in the order fields are emitted.
    pub const ALL: [AddressField; 5] = [
        AddressField::Street,
        AddressField::City,
        AddressField::State,
        AddressField::Country,
        AddressField::ZipCode,
    ];

    /// Template variable name, also used inside the `/name/` anchor token.
    pub fn name(self) -> &'static str {
        match self {
            AddressField::Street => "street",
            AddressField::City => "city",
            AddressField::State => "state",
            AddressField::Country => "country",
            AddressField::ZipCode => "zip_code",
        }
    }

    /// Anchor token the field overlays in the rendered document.
    pub fn anchor(self) -> String {
        format!("/{}/", self.name())
    }

    /// Read this component from an address.
    pub fn value(self, address: &Address) -> &str {
        match self {
            AddressField::Street => &address.street,
            AddressField::City => &address.city,
            AddressField::State => &address.state,
            AddressField::Country => &address.country,
            AddressField::ZipCode => &address.zip_code,
        }
    }
}

/// Claim submission form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimInput {
    #[serde(flatten)]
    pub identity: Identity,

    #[serde(flatten)]
    pub address: Address,

    /// Kind of claim (e.g., "auto")
    #[serde(rename = "type")]
    pub claim_type: String,

    /// When the incident happened, as entered
    pub timestamp: String,

    pub description: String,

    /// Skip third-party verification and bake the address into the document
    #[serde(rename = "useWithoutExtension", default)]
    pub use_without_extension: bool,
}

impl ClaimInput {
    /// Validate and parse a claim request body.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, AssemblyError> {
        parse_body(RequestKind::Claim, body)
    }

    /// Check the fields the envelope cannot be built without.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        require_email(&self.identity)
    }
}

/// Signer identity and address for an insurance purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PurchaseInput {
    #[serde(flatten)]
    pub identity: Identity,

    #[serde(flatten)]
    pub address: Address,
}

/// One named line of the insurance details section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InsuranceDetail {
    pub name: String,

    /// Kept as text; the form may send it as a number
    #[serde(deserialize_with = "lenient::string")]
    pub value: String,
}

/// The two insurance detail lines shown on the order form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InsuranceInfo {
    pub detail1: InsuranceDetail,
    pub detail2: InsuranceDetail,
}

/// Insurance purchase request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub user: PurchaseInput,

    pub insurance: InsuranceInfo,

    #[serde(rename = "useWithoutExtension", default)]
    pub use_without_extension: bool,
}

impl PurchaseRequest {
    /// Validate and parse a purchase request body.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, AssemblyError> {
        parse_body(RequestKind::Purchase, body)
    }

    /// Check the fields the envelope cannot be built without.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        require_email(&self.user.identity)
    }
}

fn parse_body<T>(kind: RequestKind, body: &serde_json::Value) -> Result<T, AssemblyError>
where
    T: serde::de::DeserializeOwned,
{
    validate_request(kind, body).map_err(|errors| AssemblyError::InvalidInput(errors.join("; ")))?;
    serde_json::from_value(body.clone()).map_err(|e| AssemblyError::InvalidInput(e.to_string()))
}

fn require_email(identity: &Identity) -> Result<(), AssemblyError> {
    if identity.email.trim().is_empty() {
        return Err(AssemblyError::InvalidInput("email".to_string()));
    }
    Ok(())
}
