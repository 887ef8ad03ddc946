//! Connected-field extensions.
//!
//! Extension descriptors arrive from a remote metadata service and are
//! treated as untrusted: every tab sub-field is optional and falls back to an
//! empty string. The resolver picks out the email and address verification
//! providers and flattens a matching tab into a [`VerificationDescriptor`].

mod resolver;

pub use resolver::{
    extract_verification, has_all_required_extensions, resolve_address, resolve_email,
    ResolvedExtensions, VerificationDescriptor, ADDRESS_APP_ID, ADDRESS_TAB_PATTERNS,
    EMAILABLE_APP_ID, EMAIL_APP_IDS, EMAIL_TAB_PATTERN, TWILIO_APP_ID,
};

use serde::{Deserialize, Serialize};

use crate::lenient;

/// One extension application and the tabs it contributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDescriptor {
    /// Application id of the extension provider
    #[serde(default, deserialize_with = "lenient::string")]
    pub app_id: String,

    /// Field-verification units exposed by the application
    #[serde(default)]
    pub tabs: Vec<ExtensionTab>,
}

impl ExtensionDescriptor {
    /// Tabs whose label contains `pattern`, in source order.
    pub fn tabs_matching<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a ExtensionTab> {
        self.tabs
            .iter()
            .filter(move |tab| tab.tab_label.contains(pattern))
    }
}

/// One verification tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionTab {
    /// Label such as `VerifyPostalAddressInput[0].street1`
    #[serde(default, deserialize_with = "lenient::string")]
    pub tab_label: String,

    #[serde(default)]
    pub extension_data: ExtensionData,
}

/// Metadata describing how a tab is verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionData {
    #[serde(default, deserialize_with = "lenient::string")]
    pub extension_group_id: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub publisher_name: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub application_name: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub action_name: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub action_input_key: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub action_contract: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub extension_name: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub extension_contract: String,

    #[serde(default, deserialize_with = "lenient::string")]
    pub required_for_extension: String,
}

/// Parse a tab-group listing as returned by the metadata service.
pub fn parse_extensions(json: &str) -> Result<Vec<ExtensionDescriptor>, serde_json::Error> {
    serde_json::from_str(json)
}
