//! Positioned form fields ("tabs") placed on the rendered document.
//!
//! Every field is located by an anchor token that must appear in the
//! rendered HTML, or (for hidden fields) by an absolute page position.
//! Types serialize directly into the signing platform's tab JSON.

mod builder;
mod payment;
pub(crate) mod wire;

pub use builder::{
    FieldBuilder, ATTACHMENT_ANCHOR, CLAIM_EMAIL_ANCHOR, CLAIM_SIGNATURE_ANCHOR,
    PURCHASE_EMAIL_ANCHOR, PURCHASE_SIGNATURE_ANCHOR,
};
pub use payment::{
    PaymentFormulaBuilder, CHECKBOX_LABEL, COVERAGE_LABEL, DEDUCTIBLE_LABEL, DISCOUNT_LABEL,
    PAYMENT_LABEL, TOTAL_LABEL, TRIGGER_LABEL,
};

use serde::Serialize;

use crate::extensions::VerificationDescriptor;

/// Document every field is placed on; envelopes carry a single document.
pub const DOCUMENT_ID: u32 = 1;

/// Page every positioned field is placed on.
pub const PAGE_NUMBER: u32 = 1;

/// Unit for anchor offsets.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnchorUnits {
    #[default]
    Pixels,
}

/// Where a field attaches relative to an anchor token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Literal token located in the document text (e.g., `/signature_1/`)
    pub anchor_string: String,

    pub anchor_units: AnchorUnits,

    #[serde(
        rename = "anchorXOffset",
        serialize_with = "wire::opt_display",
        skip_serializing_if = "Option::is_none"
    )]
    pub x_offset: Option<i32>,

    #[serde(
        rename = "anchorYOffset",
        serialize_with = "wire::opt_display",
        skip_serializing_if = "Option::is_none"
    )]
    pub y_offset: Option<i32>,
}

impl Anchor {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            anchor_string: token.into(),
            anchor_units: AnchorUnits::Pixels,
            x_offset: None,
            y_offset: None,
        }
    }

    pub fn x(mut self, offset: i32) -> Self {
        self.x_offset = Some(offset);
        self
    }

    pub fn y(mut self, offset: i32) -> Self {
        self.y_offset = Some(offset);
        self
    }
}

/// Attributes shared by every field kind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldBase {
    #[serde(flatten)]
    pub anchor: Option<Anchor>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<u32>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub x_position: Option<i32>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub y_position: Option<i32>,

    /// Label other fields use to reference this one in formulas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_label: Option<String>,

    #[serde(serialize_with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub required: bool,

    #[serde(serialize_with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub locked: bool,
}

impl FieldBase {
    pub fn anchored(anchor: Anchor) -> Self {
        Self {
            anchor: Some(anchor),
            ..Default::default()
        }
    }

    /// Absolutely positioned at `(x, y)` on the first page of the document.
    pub fn positioned(x: i32, y: i32) -> Self {
        Self {
            x_position: Some(x),
            y_position: Some(y),
            ..Default::default()
        }
        .on_document()
    }

    /// Place on the envelope's document and first page.
    pub fn on_document(mut self) -> Self {
        self.document_id = Some(DOCUMENT_ID);
        self.page_number = Some(PAGE_NUMBER);
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.tab_label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn anchor_string(&self) -> Option<&str> {
        self.anchor.as_ref().map(|a| a.anchor_string.as_str())
    }
}

/// Font attributes for visible number, checkbox and formula fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FontStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,

    #[serde(serialize_with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub bold: bool,
}

impl FontStyle {
    /// Helvetica at a platform size name such as `size11`.
    pub fn helvetica(size: &str) -> Self {
        Self {
            font: Some("helvetica".to_string()),
            font_size: Some(size.to_string()),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.font_color = Some(color.to_string());
        self
    }
}

/// Must-verify policy attached to every verified field.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub enum ExtensionPolicy {
    #[default]
    MustVerifyToSign,
}

/// Verification payload in the platform's wire shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabExtensionData {
    pub extension_group_id: String,
    pub publisher_name: String,
    pub application_id: String,
    pub application_name: String,
    pub action_name: String,
    pub action_contract: String,
    pub extension_name: String,
    pub extension_contract: String,
    pub required_for_extension: String,
    pub action_input_key: String,
    pub extension_policy: ExtensionPolicy,
}

impl From<&VerificationDescriptor> for TabExtensionData {
    fn from(v: &VerificationDescriptor) -> Self {
        Self {
            extension_group_id: v.extension_group_id.clone(),
            publisher_name: v.publisher_name.clone(),
            application_id: v.app_id.clone(),
            application_name: v.application_name.clone(),
            action_name: v.action_name.clone(),
            action_contract: v.action_contract.clone(),
            extension_name: v.extension_name.clone(),
            extension_contract: v.extension_contract.clone(),
            required_for_extension: v.required_for_extension.clone(),
            action_input_key: v.action_input_key.clone(),
            extension_policy: ExtensionPolicy::MustVerifyToSign,
        }
    }
}

/// Signature anchor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignHereField {
    #[serde(flatten)]
    pub base: FieldBase,
}

/// Upload slot for supporting documents.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignerAttachmentField {
    #[serde(flatten)]
    pub base: FieldBase,

    /// The signer may finish without attaching anything
    #[serde(serialize_with = "wire::flag")]
    pub optional: bool,
}

/// Text or email input, optionally verified by an extension.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    #[serde(flatten)]
    pub base: FieldBase,

    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_data: Option<TabExtensionData>,
}

impl InputField {
    /// Unverified input carrying `value`.
    pub fn plain(base: FieldBase, value: impl Into<String>) -> Self {
        Self {
            base,
            value: value.into(),
            name: None,
            tooltip: None,
            width: None,
            extension_data: None,
        }
    }

    /// Input bound to a verification tab.
    ///
    /// The tab label, display name and tooltip come from the descriptor.
    pub fn verified(
        base: FieldBase,
        value: impl Into<String>,
        verification: &VerificationDescriptor,
    ) -> Self {
        Self {
            base: base.labelled(verification.tab_label.clone()),
            value: value.into(),
            name: Some(verification.application_name.clone()),
            tooltip: Some(verification.action_input_key.clone()),
            width: None,
            extension_data: Some(TabExtensionData::from(verification)),
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn is_verified(&self) -> bool {
        self.extension_data.is_some()
    }
}

/// Number entry or checkbox with display attributes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyledField {
    #[serde(flatten)]
    pub base: FieldBase,

    #[serde(flatten)]
    pub font: FontStyle,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Show a formula only when another field holds a given value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalParent {
    pub conditional_parent_label: String,
    pub conditional_parent_value: String,
}

/// One charge listed on the payment form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLineItem {
    pub name: String,
    pub description: String,

    /// Label of the field whose value is the amount
    pub amount_reference: String,
}

/// Gateway charge attached to the payable formula field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub gateway_account_id: String,
    pub gateway_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_display_name: Option<String>,

    pub currency_code: String,
    pub line_items: Vec<PaymentLineItem>,
}

/// Field computed by the remote platform from an expression.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormulaField {
    #[serde(flatten)]
    pub base: FieldBase,

    #[serde(flatten)]
    pub font: FontStyle,

    /// Expression in the platform's formula syntax; never evaluated here
    pub formula: String,

    #[serde(flatten)]
    pub conditional: Option<ConditionalParent>,

    #[serde(serialize_with = "wire::opt_display", skip_serializing_if = "Option::is_none")]
    pub round_decimal_places: Option<u8>,

    #[serde(serialize_with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub hidden: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
}

/// Kind of a [`FieldDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    SignHere,
    SignerAttachment,
    Email,
    Text,
    Number,
    Checkbox,
    Formula,
}

/// Any field that can be placed for a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    SignHere(SignHereField),
    SignerAttachment(SignerAttachmentField),
    Email(InputField),
    Text(InputField),
    Number(StyledField),
    Checkbox(StyledField),
    Formula(FormulaField),
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldDescriptor::SignHere(_) => FieldKind::SignHere,
            FieldDescriptor::SignerAttachment(_) => FieldKind::SignerAttachment,
            FieldDescriptor::Email(_) => FieldKind::Email,
            FieldDescriptor::Text(_) => FieldKind::Text,
            FieldDescriptor::Number(_) => FieldKind::Number,
            FieldDescriptor::Checkbox(_) => FieldKind::Checkbox,
            FieldDescriptor::Formula(_) => FieldKind::Formula,
        }
    }

    pub fn base(&self) -> &FieldBase {
        match self {
            FieldDescriptor::SignHere(f) => &f.base,
            FieldDescriptor::SignerAttachment(f) => &f.base,
            FieldDescriptor::Email(f) | FieldDescriptor::Text(f) => &f.base,
            FieldDescriptor::Number(f) | FieldDescriptor::Checkbox(f) => &f.base,
            FieldDescriptor::Formula(f) => &f.base,
        }
    }

    pub fn anchor_string(&self) -> Option<&str> {
        self.base().anchor_string()
    }

    pub fn tab_label(&self) -> Option<&str> {
        self.base().tab_label.as_deref()
    }
}

/// A signer's fields grouped by kind, as the platform expects them.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tabs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sign_here_tabs: Vec<SignHereField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signer_attachment_tabs: Vec<SignerAttachmentField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email_tabs: Vec<InputField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text_tabs: Vec<InputField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub number_tabs: Vec<StyledField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checkbox_tabs: Vec<StyledField>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formula_tabs: Vec<FormulaField>,
}

impl Tabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a field under its kind, keeping insertion order within a kind.
    pub fn push(&mut self, field: FieldDescriptor) {
        match field {
            FieldDescriptor::SignHere(f) => self.sign_here_tabs.push(f),
            FieldDescriptor::SignerAttachment(f) => self.signer_attachment_tabs.push(f),
            FieldDescriptor::Email(f) => self.email_tabs.push(f),
            FieldDescriptor::Text(f) => self.text_tabs.push(f),
            FieldDescriptor::Number(f) => self.number_tabs.push(f),
            FieldDescriptor::Checkbox(f) => self.checkbox_tabs.push(f),
            FieldDescriptor::Formula(f) => self.formula_tabs.push(f),
        }
    }

    /// Shared attributes of every field, grouped by kind.
    pub fn bases(&self) -> impl Iterator<Item = &FieldBase> {
        self.sign_here_tabs
            .iter()
            .map(|f| &f.base)
            .chain(self.signer_attachment_tabs.iter().map(|f| &f.base))
            .chain(self.email_tabs.iter().map(|f| &f.base))
            .chain(self.text_tabs.iter().map(|f| &f.base))
            .chain(self.number_tabs.iter().map(|f| &f.base))
            .chain(self.checkbox_tabs.iter().map(|f| &f.base))
            .chain(self.formula_tabs.iter().map(|f| &f.base))
    }

    /// Anchor tokens referenced by anchored fields.
    pub fn anchor_strings(&self) -> Vec<&str> {
        self.bases().filter_map(FieldBase::anchor_string).collect()
    }

    pub fn len(&self) -> usize {
        self.bases().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<FieldDescriptor> for Tabs {
    fn from_iter<I: IntoIterator<Item = FieldDescriptor>>(iter: I) -> Self {
        let mut tabs = Tabs::new();
        for field in iter {
            tabs.push(field);
        }
        tabs
    }
}

impl Extend<FieldDescriptor> for Tabs {
    fn extend<I: IntoIterator<Item = FieldDescriptor>>(&mut self, iter: I) {
        for field in iter {
            self.push(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_serializes_offsets_as_strings() {
        let field = SignHereField {
            base: FieldBase::anchored(Anchor::new("/sn1/").x(20).y(10)),
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["anchorString"], "/sn1/");
        assert_eq!(json["anchorUnits"], "pixels");
        assert_eq!(json["anchorXOffset"], "20");
        assert_eq!(json["anchorYOffset"], "10");
        assert!(json.get("documentId").is_none());
        assert!(json.get("required").is_none());
    }

    #[test]
    fn test_verified_input_wire_shape() {
        let verification = VerificationDescriptor {
            app_id: "app".into(),
            application_name: "Verifier".into(),
            action_input_key: "email".into(),
            tab_label: "VerifyEmailInput.email".into(),
            ..Default::default()
        };
        let field = InputField::verified(
            FieldBase::anchored(Anchor::new("/email/").y(-5))
                .on_document()
                .required(),
            "a@b.com",
            &verification,
        );

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["tabLabel"], "VerifyEmailInput.email");
        assert_eq!(json["name"], "Verifier");
        assert_eq!(json["tooltip"], "email");
        assert_eq!(json["documentId"], "1");
        assert_eq!(json["required"], "true");
        assert_eq!(json["extensionData"]["applicationId"], "app");
        assert_eq!(json["extensionData"]["extensionPolicy"], "MustVerifyToSign");
        assert_eq!(json["extensionData"]["publisherName"], "");
    }

    #[test]
    fn test_tabs_group_by_kind() {
        let tabs: Tabs = vec![
            FieldDescriptor::SignHere(SignHereField {
                base: FieldBase::anchored(Anchor::new("/a/")),
            }),
            FieldDescriptor::Email(InputField::plain(
                FieldBase::anchored(Anchor::new("/b/")),
                "x",
            )),
            FieldDescriptor::Text(InputField::plain(FieldBase::anchored(Anchor::new("/c/")), "y")),
            FieldDescriptor::Text(InputField::plain(FieldBase::anchored(Anchor::new("/d/")), "z")),
        ]
        .into_iter()
        .collect();

        assert_eq!(tabs.len(), 4);
        assert_eq!(tabs.text_tabs.len(), 2);
        assert_eq!(tabs.anchor_strings(), vec!["/a/", "/b/", "/c/", "/d/"]);

        let json = serde_json::to_value(&tabs).unwrap();
        assert!(json.get("formulaTabs").is_none());
        assert_eq!(json["textTabs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_descriptor_accessors() {
        let field = FieldDescriptor::Number(StyledField {
            base: FieldBase::anchored(Anchor::new("/l1e/")).labelled("l1e"),
            font: FontStyle::helvetica("size11"),
            height: None,
        });
        assert_eq!(field.kind(), FieldKind::Number);
        assert_eq!(field.anchor_string(), Some("/l1e/"));
        assert_eq!(field.tab_label(), Some("l1e"));
    }
}
