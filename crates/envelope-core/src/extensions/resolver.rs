//! Locating verification providers among supplied extensions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExtensionDescriptor, ExtensionTab};
use crate::input::AddressField;
use crate::AssemblyError;

/// Twilio email verification.
pub const TWILIO_APP_ID: &str = "6ff9ae39-ad45-4d04-b0c2-a6e2214f5925";

/// Emailable email verification.
pub const EMAILABLE_APP_ID: &str = "5e3b623f-afaf-45da-b6a0-f5abc3c32128";

/// Smarty postal address verification.
pub const ADDRESS_APP_ID: &str = "04bfc1ae-1ba0-42d0-8c02-264417a7b234";

/// Providers accepted for email verification, in preference order.
pub const EMAIL_APP_IDS: [&str; 2] = [EMAILABLE_APP_ID, TWILIO_APP_ID];

/// Label fragment marking an email verification input tab.
pub const EMAIL_TAB_PATTERN: &str = "VerifyEmailInput";

/// Label fragment for each address component.
pub const ADDRESS_TAB_PATTERNS: [(AddressField, &str); 5] = [
    (AddressField::Street, "VerifyPostalAddressInput[0].street1"),
    (AddressField::City, "VerifyPostalAddressInput[0].locality"),
    (AddressField::State, "VerifyPostalAddressInput[0].subdivision"),
    (AddressField::Country, "VerifyPostalAddressInput[0].countryOrRegion"),
    (AddressField::ZipCode, "VerifyPostalAddressInput[0].postalCode"),
];

/// A tab's verification metadata together with its owning application.
///
/// Built fresh from one extension and one tab; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VerificationDescriptor {
    pub app_id: String,
    pub extension_group_id: String,
    pub publisher_name: String,
    pub application_name: String,
    pub action_name: String,
    pub action_input_key: String,
    pub action_contract: String,
    pub extension_name: String,
    pub extension_contract: String,
    pub required_for_extension: String,
    pub tab_label: String,
}

/// First extension whose trimmed app id is an email verification provider.
pub fn resolve_email(extensions: &[ExtensionDescriptor]) -> Option<&ExtensionDescriptor> {
    extensions
        .iter()
        .find(|ext| EMAIL_APP_IDS.contains(&ext.app_id.trim()))
}

/// The address verification extension, if supplied.
pub fn resolve_address(extensions: &[ExtensionDescriptor]) -> Option<&ExtensionDescriptor> {
    extensions.iter().find(|ext| ext.app_id == ADDRESS_APP_ID)
}

/// Flatten one tab of `extension` into a verification descriptor.
pub fn extract_verification(
    extension: &ExtensionDescriptor,
    tab: &ExtensionTab,
) -> VerificationDescriptor {
    let data = &tab.extension_data;
    VerificationDescriptor {
        app_id: extension.app_id.clone(),
        extension_group_id: data.extension_group_id.clone(),
        publisher_name: data.publisher_name.clone(),
        application_name: data.application_name.clone(),
        action_name: data.action_name.clone(),
        action_input_key: data.action_input_key.clone(),
        action_contract: data.action_contract.clone(),
        extension_name: data.extension_name.clone(),
        extension_contract: data.extension_contract.clone(),
        required_for_extension: data.required_for_extension.clone(),
        tab_label: tab.tab_label.clone(),
    }
}

/// Whether the supplied extensions can back the verified flows.
///
/// The address provider is mandatory; at least one email provider must be
/// present as well.
pub fn has_all_required_extensions(extensions: &[ExtensionDescriptor]) -> bool {
    let has_address = extensions.iter().any(|ext| ext.app_id == ADDRESS_APP_ID);
    let has_email = resolve_email(extensions).is_some();
    debug!(has_address, has_email, "Checked extension availability");
    has_address && has_email
}

/// Both verification providers, resolved from one extension listing.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedExtensions<'a> {
    pub email: &'a ExtensionDescriptor,
    pub address: &'a ExtensionDescriptor,
}

impl<'a> ResolvedExtensions<'a> {
    /// Resolve both providers or fail with the one that is missing.
    pub fn resolve(extensions: &'a [ExtensionDescriptor]) -> Result<Self, AssemblyError> {
        let email = resolve_email(extensions).ok_or_else(|| {
            AssemblyError::MissingField("email verification extension".to_string())
        })?;
        let address = resolve_address(extensions).ok_or_else(|| {
            AssemblyError::MissingField("address verification extension".to_string())
        })?;
        Ok(Self { email, address })
    }
}
