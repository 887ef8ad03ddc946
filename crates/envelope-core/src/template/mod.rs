//! HTML document rendering.
//!
//! A template is plain HTML with `{{ name }}` placeholders and anchor tokens
//! such as `/signature_1/`. Rendering injects the base64 logo, optionally
//! converts hidden anchor spans into visible placeholders, and substitutes
//! variables. The output is a pure function of its inputs.

mod assets;
mod markup;

pub use assets::{AssetStore, LOGO_PATH, TEMPLATE_DIR};
pub use markup::{escape_html, placeholders, redact_hidden_fields};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::input::{AddressField, ClaimInput, PurchaseRequest};

/// Variable reserved for the base64-encoded logo.
pub const LOGO_VARIABLE: &str = "img_base64_src";

/// Template rendered for claim submissions.
pub const CLAIM_TEMPLATE: &str = "submit-claim.html";

/// Template rendered for insurance purchases.
pub const PURCHASE_TEMPLATE: &str = "new-insurance.html";

/// Fields baked into a claim document when no verification extension
/// captures them.
pub const CLAIM_REDACTED_FIELDS: [&str; 5] = ["street", "city", "state", "country", "zip_code"];

/// Fields baked into a purchase document when no verification extension
/// captures them.
pub const PURCHASE_REDACTED_FIELDS: [&str; 6] =
    ["street", "city", "country", "state", "zip_code", "user_email"];

/// Errors from template rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read asset {}: {source}", path.display())]
    UnreadableAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template references unresolved variable: {0}")]
    UnresolvedVariable(String),
}

/// Template variables by name.
pub type TemplateVars = BTreeMap<String, String>;

/// Renders named templates from an [`AssetStore`].
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    assets: Arc<AssetStore>,
}

impl TemplateRenderer {
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self { assets }
    }

    /// Renderer over the assets shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Arc::new(AssetStore::bundled()))
    }

    /// Renderer over an asset directory.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(AssetStore::new(root)))
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Render a template to HTML.
    ///
    /// # Arguments
    ///
    /// * `template_name` - File name under the asset `templates/` directory
    /// * `variables` - Placeholder values; the logo is added automatically
    /// * `redact_fields` - Hidden anchor spans to turn into visible values
    pub fn render(
        &self,
        template_name: &str,
        variables: &TemplateVars,
        redact_fields: Option<&[&str]>,
    ) -> Result<String, TemplateError> {
        let template = self.assets.template(template_name)?;
        let logo = self.assets.logo_base64()?;

        let content = match redact_fields {
            Some(fields) => redact_hidden_fields(&template, fields),
            None => template.to_string(),
        };

        let mut variables = variables.clone();
        variables.insert(LOGO_VARIABLE.to_string(), logo.to_string());

        markup::substitute(&content, &variables, &[LOGO_VARIABLE])
    }
}

/// Placeholder values for the claim template.
pub fn claim_variables(claim: &ClaimInput) -> TemplateVars {
    let mut vars = TemplateVars::new();
    vars.insert("first_name".into(), claim.identity.first_name.clone());
    vars.insert("last_name".into(), claim.identity.last_name.clone());
    vars.insert("email".into(), claim.identity.email.clone());
    for field in AddressField::ALL {
        vars.insert(field.name().into(), field.value(&claim.address).to_string());
    }
    vars.insert("type".into(), claim.claim_type.clone());
    vars.insert("timestamp".into(), claim.timestamp.clone());
    vars.insert("description".into(), claim.description.clone());
    vars
}

/// Placeholder values for the purchase template.
pub fn purchase_variables(request: &PurchaseRequest) -> TemplateVars {
    let user = &request.user;
    let insurance = &request.insurance;

    let mut vars = TemplateVars::new();
    vars.insert("user_name".into(), user.identity.full_name());
    vars.insert("user_email".into(), user.identity.email.clone());
    for field in AddressField::ALL {
        vars.insert(field.name().into(), field.value(&user.address).to_string());
    }
    vars.insert("detail_1".into(), insurance.detail1.name.clone());
    vars.insert("detail_2".into(), insurance.detail2.name.clone());
    vars.insert("value_detail_1".into(), insurance.detail1.value.clone());
    vars.insert("value_detail_2".into(), insurance.detail2.value.clone());
    vars
}
