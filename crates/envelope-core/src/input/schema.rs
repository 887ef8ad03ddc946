//! JSON Schema validation for caller-supplied request bodies.
//!
//! Claim and purchase payloads are checked against the schemas under
//! `schema/` before deserialization so that a missing key is reported with
//! its JSON path rather than as a serde error.

use std::sync::OnceLock;
use thiserror::Error;

const CLAIM_SCHEMA_JSON: &str = include_str!("../../schema/claim.schema.json");
const PURCHASE_SCHEMA_JSON: &str = include_str!("../../schema/purchase.schema.json");

static CLAIM_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static PURCHASE_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

/// Which request body a payload claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Claim,
    Purchase,
}

fn compile(source: &str) -> Result<jsonschema::Validator, String> {
    let schema_value: serde_json::Value = match serde_json::from_str(source) {
        Ok(v) => v,
        Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
    };

    match jsonschema::options().build(&schema_value) {
        Ok(v) => Ok(v),
        Err(e) => Err(format!("Failed to compile schema: {}", e)),
    }
}

fn get_validator(kind: RequestKind) -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = match kind {
        RequestKind::Claim => CLAIM_SCHEMA.get_or_init(|| compile(CLAIM_SCHEMA_JSON)),
        RequestKind::Purchase => PURCHASE_SCHEMA.get_or_init(|| compile(PURCHASE_SCHEMA_JSON)),
    };

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a request body against the schema for `kind`.
///
/// Returns every violation as `"<message> at <json path>"`.
pub fn validate_request(kind: RequestKind, body: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator(kind).map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(body)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
