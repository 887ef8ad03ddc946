//! Envelope composition.
//!
//! [`EnvelopeAssembler`] drives rendering, extension resolution and field
//! building for the four flows and returns an [`EnvelopeDescriptor`] that
//! serializes straight into the signing platform's envelope definition.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tracing::info;

use crate::config::{EnvelopeArgs, GatewayConfig, PaymentConfig};
use crate::extensions::{ExtensionDescriptor, ResolvedExtensions};
use crate::fields::wire;
use crate::fields::{FieldBuilder, FieldDescriptor, PaymentFormulaBuilder, Tabs, DOCUMENT_ID};
use crate::input::{ClaimInput, Identity, PurchaseRequest};
use crate::template::{
    claim_variables, purchase_variables, TemplateRenderer, CLAIM_REDACTED_FIELDS,
    CLAIM_TEMPLATE, PURCHASE_REDACTED_FIELDS, PURCHASE_TEMPLATE,
};
use crate::AssemblyError;

/// Email subject for claim envelopes.
pub const CLAIM_SUBJECT: &str = "Submit a Claim";

/// Email subject for insurance purchase envelopes.
pub const PURCHASE_SUBJECT: &str = "Buy New Insurance";

pub const CLAIM_DOCUMENT_NAME: &str = "Submit a Claim";
pub const PURCHASE_DOCUMENT_NAME: &str = "Insurance order form";

/// The single signer is always recipient 1, first in routing order.
const SIGNER_RECIPIENT_ID: &str = "1";
const SIGNER_ROUTING_ORDER: &str = "1";

const HTML_EXTENSION: &str = "html";

/// One rendered document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Base64 of the rendered HTML
    pub document_base64: String,

    pub name: String,

    pub file_extension: String,

    #[serde(serialize_with = "wire::display")]
    pub document_id: u32,
}

impl Document {
    /// HTML document encoded for transport.
    pub fn html(name: &str, html: &str) -> Self {
        Self {
            document_base64: BASE64.encode(html.as_bytes()),
            name: name.to_string(),
            file_extension: HTML_EXTENSION.to_string(),
            document_id: DOCUMENT_ID,
        }
    }
}

/// Person who must act on the envelope, with their fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub email: String,
    pub name: String,
    pub recipient_id: String,
    pub routing_order: String,

    /// Marks the signer as embedded: signing happens in-app, not via email
    pub client_user_id: String,

    pub tabs: Tabs,
}

impl Signer {
    /// Embedded signer for `identity`.
    pub fn embedded(identity: &Identity, client_user_id: &str, tabs: Tabs) -> Self {
        Self {
            email: identity.email.clone(),
            name: identity.full_name(),
            recipient_id: SIGNER_RECIPIENT_ID.to_string(),
            routing_order: SIGNER_ROUTING_ORDER.to_string(),
            client_user_id: client_user_id.to_string(),
            tabs,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Recipients {
    pub signers: Vec<Signer>,
}

/// Envelope status on creation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// Ready to send; the platform dispatches it immediately
    #[default]
    Sent,
}

/// Composed signing request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDescriptor {
    pub email_subject: String,
    pub documents: Vec<Document>,
    pub recipients: Recipients,
    pub status: EnvelopeStatus,
}

impl EnvelopeDescriptor {
    /// The envelope's only signer.
    pub fn signer(&self) -> Option<&Signer> {
        self.recipients.signers.first()
    }

    /// The envelope's only document.
    pub fn document(&self) -> Option<&Document> {
        self.documents.first()
    }
}

/// Request for an embedded signing session URL.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientViewRequest {
    pub authentication_method: String,
    pub client_user_id: String,
    pub recipient_id: String,
    pub return_url: String,
    pub user_name: String,
    pub email: String,
}

impl RecipientViewRequest {
    /// View request matching the signer of an assembled envelope.
    pub fn for_signer(signer: &Signer, return_url: &str) -> Self {
        Self {
            authentication_method: "none".to_string(),
            client_user_id: signer.client_user_id.clone(),
            recipient_id: signer.recipient_id.clone(),
            return_url: return_url.to_string(),
            user_name: signer.name.clone(),
            email: signer.email.clone(),
        }
    }
}

/// Assembles claim and purchase envelopes.
///
/// Holds only read-only state; one assembler can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct EnvelopeAssembler {
    renderer: TemplateRenderer,
    payment: PaymentFormulaBuilder,
}

impl EnvelopeAssembler {
    pub fn new(renderer: TemplateRenderer, payment: PaymentConfig) -> Self {
        Self {
            renderer,
            payment: PaymentFormulaBuilder::new(payment),
        }
    }

    /// Assembler over the bundled assets and default pricing.
    pub fn bundled() -> Self {
        Self::new(TemplateRenderer::bundled(), PaymentConfig::default())
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Claim envelope using the request's extension mode.
    ///
    /// `extensions` is required unless the claim opts out of verification.
    pub fn assemble_claim(
        &self,
        claim: &ClaimInput,
        args: &EnvelopeArgs,
        extensions: Option<&[ExtensionDescriptor]>,
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        if claim.use_without_extension {
            return self.claim_without_extensions(CLAIM_TEMPLATE, claim, args);
        }
        let extensions = extensions.ok_or_else(missing_extension_list)?;
        self.claim_with_extensions(CLAIM_TEMPLATE, claim, args, extensions)
    }

    /// Purchase envelope using the request's extension mode.
    pub fn assemble_purchase(
        &self,
        request: &PurchaseRequest,
        args: &EnvelopeArgs,
        gateway: &GatewayConfig,
        extensions: Option<&[ExtensionDescriptor]>,
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        if request.use_without_extension {
            return self.purchase_without_extensions(PURCHASE_TEMPLATE, request, args, gateway);
        }
        let extensions = extensions.ok_or_else(missing_extension_list)?;
        self.purchase_with_extensions(PURCHASE_TEMPLATE, request, args, gateway, extensions)
    }

    /// Claim whose email and address are captured by verified fields.
    pub fn claim_with_extensions(
        &self,
        template_name: &str,
        claim: &ClaimInput,
        args: &EnvelopeArgs,
        extensions: &[ExtensionDescriptor],
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        check_claim(claim, args)?;
        let resolved = ResolvedExtensions::resolve(extensions)?;

        let html = self
            .renderer
            .render(template_name, &claim_variables(claim), None)?;
        let fields = FieldBuilder::build_claim_fields(claim, Some(&resolved))?;

        Ok(compose(
            CLAIM_SUBJECT,
            CLAIM_DOCUMENT_NAME,
            &html,
            &claim.identity,
            args,
            fields,
        ))
    }

    /// Claim with the address baked into the document text.
    pub fn claim_without_extensions(
        &self,
        template_name: &str,
        claim: &ClaimInput,
        args: &EnvelopeArgs,
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        check_claim(claim, args)?;

        let html = self.renderer.render(
            template_name,
            &claim_variables(claim),
            Some(&CLAIM_REDACTED_FIELDS[..]),
        )?;
        let fields = FieldBuilder::build_claim_fields(claim, None)?;

        Ok(compose(
            CLAIM_SUBJECT,
            CLAIM_DOCUMENT_NAME,
            &html,
            &claim.identity,
            args,
            fields,
        ))
    }

    /// Insurance purchase with verified email and address fields.
    pub fn purchase_with_extensions(
        &self,
        template_name: &str,
        request: &PurchaseRequest,
        args: &EnvelopeArgs,
        gateway: &GatewayConfig,
        extensions: &[ExtensionDescriptor],
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        check_purchase(request, args, gateway)?;
        let resolved = ResolvedExtensions::resolve(extensions)?;

        let html = self
            .renderer
            .render(template_name, &purchase_variables(request), None)?;
        let mut fields = FieldBuilder::build_purchase_fields(&request.user, Some(&resolved))?;
        fields.extend(self.payment.build_payment_fields(gateway));

        Ok(compose(
            PURCHASE_SUBJECT,
            PURCHASE_DOCUMENT_NAME,
            &html,
            &request.user.identity,
            args,
            fields,
        ))
    }

    /// Insurance purchase with identity and address baked into the document.
    pub fn purchase_without_extensions(
        &self,
        template_name: &str,
        request: &PurchaseRequest,
        args: &EnvelopeArgs,
        gateway: &GatewayConfig,
    ) -> Result<EnvelopeDescriptor, AssemblyError> {
        check_purchase(request, args, gateway)?;

        let html = self.renderer.render(
            template_name,
            &purchase_variables(request),
            Some(&PURCHASE_REDACTED_FIELDS[..]),
        )?;
        let mut fields = FieldBuilder::build_purchase_fields(&request.user, None)?;
        fields.extend(self.payment.build_payment_fields(gateway));

        Ok(compose(
            PURCHASE_SUBJECT,
            PURCHASE_DOCUMENT_NAME,
            &html,
            &request.user.identity,
            args,
            fields,
        ))
    }
}

fn missing_extension_list() -> AssemblyError {
    AssemblyError::MissingField("extension list".to_string())
}

fn check_args(args: &EnvelopeArgs) -> Result<(), AssemblyError> {
    if args.signer_client_id.trim().is_empty() {
        return Err(AssemblyError::InvalidInput("signer_client_id".to_string()));
    }
    Ok(())
}

fn check_claim(claim: &ClaimInput, args: &EnvelopeArgs) -> Result<(), AssemblyError> {
    claim.validate()?;
    check_args(args)
}

fn check_purchase(
    request: &PurchaseRequest,
    args: &EnvelopeArgs,
    gateway: &GatewayConfig,
) -> Result<(), AssemblyError> {
    request.validate()?;
    check_args(args)?;
    if gateway.account_id.trim().is_empty() {
        return Err(AssemblyError::InvalidInput("gateway account id".to_string()));
    }
    if gateway.name.trim().is_empty() {
        return Err(AssemblyError::InvalidInput("gateway name".to_string()));
    }
    Ok(())
}

fn compose(
    subject: &str,
    document_name: &str,
    html: &str,
    identity: &Identity,
    args: &EnvelopeArgs,
    fields: Vec<FieldDescriptor>,
) -> EnvelopeDescriptor {
    let tabs: Tabs = fields.into_iter().collect();
    info!(
        subject,
        fields = tabs.len(),
        email_fields = tabs.email_tabs.len(),
        text_fields = tabs.text_tabs.len(),
        formula_fields = tabs.formula_tabs.len(),
        "Assembled envelope"
    );

    EnvelopeDescriptor {
        email_subject: subject.to_string(),
        documents: vec![Document::html(document_name, html)],
        recipients: Recipients {
            signers: vec![Signer::embedded(identity, &args.signer_client_id, tabs)],
        },
        status: EnvelopeStatus::Sent,
    }
}
