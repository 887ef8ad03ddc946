//! Signature, attachment, email and address fields.

use tracing::{debug, warn};

use super::{
    Anchor, FieldBase, FieldDescriptor, InputField, SignHereField, SignerAttachmentField,
};
use crate::extensions::{
    extract_verification, ExtensionDescriptor, ResolvedExtensions, ADDRESS_TAB_PATTERNS,
    EMAIL_TAB_PATTERN,
};
use crate::input::{Address, ClaimInput, Identity, PurchaseInput};
use crate::AssemblyError;

/// Signature anchor on the claim form.
pub const CLAIM_SIGNATURE_ANCHOR: &str = "/signature_1/";

/// Signature anchor on the insurance order form.
pub const PURCHASE_SIGNATURE_ANCHOR: &str = "/sn1/";

/// Supporting-document upload anchor on the claim form.
pub const ATTACHMENT_ANCHOR: &str = "/attachment/";

/// Email anchor on the claim form.
pub const CLAIM_EMAIL_ANCHOR: &str = "/email/";

/// Email anchor on the insurance order form.
pub const PURCHASE_EMAIL_ANCHOR: &str = "/user_email/";

const SIGN_HERE_X: i32 = 20;
const SIGN_HERE_Y: i32 = 10;
const ATTACHMENT_X: i32 = 20;
const ATTACHMENT_Y: i32 = -20;
const INPUT_Y: i32 = -5;
const ADDRESS_X: i32 = -5;
const ADDRESS_WIDTH: u32 = 50;

/// Builds the non-payment fields for claim and purchase envelopes.
pub struct FieldBuilder;

impl FieldBuilder {
    /// Signature field at `anchor`.
    pub fn sign_here(anchor: &str) -> FieldDescriptor {
        FieldDescriptor::SignHere(SignHereField {
            base: FieldBase::anchored(Anchor::new(anchor).x(SIGN_HERE_X).y(SIGN_HERE_Y)),
        })
    }

    /// Optional supporting-document upload.
    pub fn signer_attachment() -> FieldDescriptor {
        FieldDescriptor::SignerAttachment(SignerAttachmentField {
            base: FieldBase::anchored(
                Anchor::new(ATTACHMENT_ANCHOR)
                    .x(ATTACHMENT_X)
                    .y(ATTACHMENT_Y),
            ),
            optional: true,
        })
    }

    /// Email field carrying the literal value, with no verification.
    pub fn plain_email(value: &str, anchor: &str) -> FieldDescriptor {
        FieldDescriptor::Email(InputField::plain(input_base(Anchor::new(anchor)), value))
    }

    /// Email field bound to the email verification tab of `extension`.
    ///
    /// When several tabs match, the last one wins. Returns `None` when no tab
    /// label contains the email input pattern.
    pub fn verified_email(
        extension: &ExtensionDescriptor,
        value: &str,
        anchor: &str,
    ) -> Option<FieldDescriptor> {
        let tab = extension.tabs_matching(EMAIL_TAB_PATTERN).last()?;
        let verification = extract_verification(extension, tab);
        debug!(tab_label = %verification.tab_label, anchor, "Binding email to verification tab");

        Some(FieldDescriptor::Email(InputField::verified(
            input_base(Anchor::new(anchor)),
            value,
            &verification,
        )))
    }

    /// One text field per (address component, matching tab).
    ///
    /// Components with no matching tab are skipped.
    pub fn verified_address(
        extension: &ExtensionDescriptor,
        address: &Address,
    ) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();

        for (component, pattern) in ADDRESS_TAB_PATTERNS {
            let before = fields.len();
            for tab in extension.tabs_matching(pattern) {
                let verification = extract_verification(extension, tab);
                let base = input_base(Anchor::new(component.anchor()).x(ADDRESS_X));
                fields.push(FieldDescriptor::Text(
                    InputField::verified(base, component.value(address), &verification)
                        .width(ADDRESS_WIDTH),
                ));
            }
            if fields.len() == before {
                debug!(field = component.name(), pattern, "No address tab matched");
            }
        }

        fields
    }

    /// Fields for a claim envelope.
    ///
    /// With extensions the email and address are captured by verified
    /// fields; without them only a plain email field is added, since the
    /// address was rendered into the document text.
    pub fn build_claim_fields(
        claim: &ClaimInput,
        extensions: Option<&ResolvedExtensions<'_>>,
    ) -> Result<Vec<FieldDescriptor>, AssemblyError> {
        let mut fields = vec![
            Self::sign_here(CLAIM_SIGNATURE_ANCHOR),
            Self::signer_attachment(),
        ];

        match extensions {
            Some(resolved) => fields.extend(Self::verified_identity_fields(
                resolved,
                &claim.identity,
                &claim.address,
                CLAIM_EMAIL_ANCHOR,
            )?),
            None => fields.push(Self::plain_email(&claim.identity.email, CLAIM_EMAIL_ANCHOR)),
        }

        Ok(fields)
    }

    /// Non-payment fields for an insurance purchase envelope.
    ///
    /// Without extensions the email and address are part of the document
    /// text, so only the signature is placed.
    pub fn build_purchase_fields(
        user: &PurchaseInput,
        extensions: Option<&ResolvedExtensions<'_>>,
    ) -> Result<Vec<FieldDescriptor>, AssemblyError> {
        let mut fields = vec![Self::sign_here(PURCHASE_SIGNATURE_ANCHOR)];

        if let Some(resolved) = extensions {
            fields.extend(Self::verified_identity_fields(
                resolved,
                &user.identity,
                &user.address,
                PURCHASE_EMAIL_ANCHOR,
            )?);
        }

        Ok(fields)
    }

    fn verified_identity_fields(
        resolved: &ResolvedExtensions<'_>,
        identity: &Identity,
        address: &Address,
        email_anchor: &str,
    ) -> Result<Vec<FieldDescriptor>, AssemblyError> {
        let email = Self::verified_email(resolved.email, &identity.email, email_anchor)
            .ok_or_else(|| {
                warn!(app_id = %resolved.email.app_id, "Email extension has no verification tab");
                AssemblyError::MissingField(format!(
                    "no '{}' tab in email extension {}",
                    EMAIL_TAB_PATTERN, resolved.email.app_id
                ))
            })?;

        let mut fields = vec![email];
        fields.extend(Self::verified_address(resolved.address, address));
        Ok(fields)
    }
}

/// Required, unlocked input on the first page, just above its anchor.
fn input_base(anchor: Anchor) -> FieldBase {
    FieldBase::anchored(anchor.y(INPUT_Y)).on_document().required()
}
