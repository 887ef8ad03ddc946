//! Runtime configuration.
//!
//! Loaded from YAML (every key optional) and then overridden from the
//! process environment. Durations are written in humantime form
//! (`"15s"`, `"10m"`).

use envelope_core::{AssetStore, EnvelopeArgs, GatewayConfig, PaymentConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::RuntimeError;

pub const ACCOUNT_ID_ENV: &str = "DS_ACCOUNT_ID";
pub const ESIGN_BASE_PATH_ENV: &str = "DS_ESIGN_BASE_PATH";
pub const CONNECTED_FIELDS_HOST_ENV: &str = "DS_CONNECTED_FIELDS_HOST";
pub const RETURN_URL_ENV: &str = "DS_RETURN_URL";
pub const GATEWAY_ID_ENV: &str = "DS_PAYMENT_GATEWAY_ID";
pub const GATEWAY_NAME_ENV: &str = "DS_PAYMENT_GATEWAY_NAME";
pub const GATEWAY_DISPLAY_NAME_ENV: &str = "DS_PAYMENT_GATEWAY_DISPLAY_NAME";

pub const DEFAULT_CONNECTED_FIELDS_HOST: &str = "https://api-d.docusign.com";
pub const DEFAULT_ESIGN_BASE_PATH: &str = "https://demo.docusign.net/restapi";
pub const DEFAULT_SIGNER_CLIENT_ID: &str = "1000";

/// Settings for talking to the signing platform and assembling envelopes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Signing platform account id
    pub account_id: Option<String>,

    /// eSignature REST base path (without `/v2.1`)
    pub esign_base_path: String,

    /// Host serving connected-fields metadata
    pub connected_fields_host: String,

    /// Where embedded signing sessions return to
    pub return_url: String,

    /// Client user id marking signers as embedded
    pub signer_client_id: String,

    /// Template and logo directory; the bundled assets when unset
    pub assets_dir: Option<PathBuf>,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How long an account's extension list is reused
    #[serde(with = "humantime_serde")]
    pub extension_cache_ttl: Duration,

    /// Maximum number of accounts whose extension list is cached
    pub extension_cache_capacity: u64,

    pub payment: PaymentConfig,

    /// Payment gateway; required only for insurance purchases
    pub gateway: Option<GatewayConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            esign_base_path: DEFAULT_ESIGN_BASE_PATH.to_string(),
            connected_fields_host: DEFAULT_CONNECTED_FIELDS_HOST.to_string(),
            return_url: String::new(),
            signer_client_id: DEFAULT_SIGNER_CLIENT_ID.to_string(),
            assets_dir: None,
            request_timeout: Duration::from_secs(15),
            extension_cache_ttl: Duration::from_secs(600),
            extension_cache_capacity: 1_000,
            payment: PaymentConfig::default(),
            gateway: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse YAML without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeError> {
        serde_yaml::from_str(yaml).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Defaults or the given file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, RuntimeError> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ACCOUNT_ID_ENV) {
            self.account_id = Some(v);
        }
        if let Some(v) = get(ESIGN_BASE_PATH_ENV) {
            self.esign_base_path = v;
        }
        if let Some(v) = get(CONNECTED_FIELDS_HOST_ENV) {
            self.connected_fields_host = v;
        }
        if let Some(v) = get(RETURN_URL_ENV) {
            self.return_url = v;
        }

        let id = get(GATEWAY_ID_ENV);
        let name = get(GATEWAY_NAME_ENV);
        let display_name = get(GATEWAY_DISPLAY_NAME_ENV);
        if id.is_some() || name.is_some() || display_name.is_some() {
            let mut gateway = self
                .gateway
                .take()
                .unwrap_or_else(|| GatewayConfig::new("", ""));
            if let Some(id) = id {
                gateway.account_id = id;
            }
            if let Some(name) = name {
                gateway.name = name;
            }
            if display_name.is_some() {
                gateway.display_name = display_name;
            }
            self.gateway = Some(gateway);
        }

        self
    }

    /// Configured account id.
    pub fn account_id(&self) -> Result<&str, RuntimeError> {
        self.account_id
            .as_deref()
            .ok_or_else(|| RuntimeError::Config(format!("account id not set ({})", ACCOUNT_ID_ENV)))
    }

    /// Gateway for purchases; both id and name must be present.
    pub fn gateway(&self) -> Result<&GatewayConfig, RuntimeError> {
        match &self.gateway {
            Some(gateway) if !gateway.account_id.is_empty() && !gateway.name.is_empty() => {
                Ok(gateway)
            }
            _ => Err(RuntimeError::Config(format!(
                "payment gateway not configured ({}, {})",
                GATEWAY_ID_ENV, GATEWAY_NAME_ENV
            ))),
        }
    }

    /// Envelope arguments for one request.
    ///
    /// `return_url` overrides the configured default when given.
    pub fn envelope_args(&self, return_url: Option<&str>) -> EnvelopeArgs {
        EnvelopeArgs::new(
            self.signer_client_id.clone(),
            return_url.unwrap_or(self.return_url.as_str()),
        )
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.assets_dir
            .clone()
            .unwrap_or_else(AssetStore::bundled_dir)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        for (name, url) in [
            ("esign_base_path", &self.esign_base_path),
            ("connected_fields_host", &self.connected_fields_host),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RuntimeError::Config(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }
        if self.signer_client_id.trim().is_empty() {
            return Err(RuntimeError::Config("signer_client_id is empty".to_string()));
        }
        Ok(())
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
