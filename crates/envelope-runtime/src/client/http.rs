//! HTTP implementation of the signing platform clients.

use async_trait::async_trait;
use envelope_core::{EnvelopeDescriptor, ExtensionDescriptor, RecipientViewRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ClientError, EnvelopeSubmitter, ExtensionSource};
use crate::config::RuntimeConfig;
use crate::secrets::AccessToken;

/// REST client for the eSignature and connected-fields APIs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    esign_base_path: String,
    connected_fields_host: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeSummary {
    envelope_id: String,
}

#[derive(Debug, Deserialize)]
struct ViewUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::NotConfigured(e.to_string()))?;

        Ok(Self {
            esign_base_path: config.esign_base_path.trim_end_matches('/').to_string(),
            connected_fields_host: config.connected_fields_host.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            client,
        })
    }

    fn tab_groups_url(&self, account_id: &str) -> String {
        format!(
            "{}/v1/accounts/{}/connected-fields/tab-groups",
            self.connected_fields_host, account_id
        )
    }

    fn envelopes_url(&self, account_id: &str) -> String {
        format!("{}/v2.1/accounts/{}/envelopes", self.esign_base_path, account_id)
    }

    fn send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Http(e.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(ApiErrorBody {
                    error_code,
                    message: Some(message),
                }) => match error_code {
                    Some(code) => format!("{}: {}", code, message),
                    None => message,
                },
                _ => text,
            };
            return Err(ClientError::RemoteApi {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ExtensionSource for HttpClient {
    async fn tab_groups(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<Vec<ExtensionDescriptor>, ClientError> {
        let url = self.tab_groups_url(account_id);
        debug!(%url, "Fetching connected-field tab groups");

        let response = self
            .client
            .get(&url)
            .header("Authorization", token.bearer())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::read_json(response).await
    }
}

#[async_trait]
impl EnvelopeSubmitter for HttpClient {
    async fn create_envelope(
        &self,
        account_id: &str,
        token: &AccessToken,
        envelope: &EnvelopeDescriptor,
    ) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.envelopes_url(account_id))
            .header("Authorization", token.bearer())
            .json(envelope)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let summary: EnvelopeSummary = Self::read_json(response).await?;
        Ok(summary.envelope_id)
    }

    async fn recipient_view(
        &self,
        account_id: &str,
        token: &AccessToken,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<String, ClientError> {
        let url = format!(
            "{}/{}/views/recipient",
            self.envelopes_url(account_id),
            envelope_id
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", token.bearer())
            .json(request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let view: ViewUrl = Self::read_json(response).await?;
        Ok(view.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = RuntimeConfig {
            esign_base_path: "https://demo.example.net/restapi/".into(),
            connected_fields_host: "https://api-d.example.com".into(),
            ..Default::default()
        };
        let client = HttpClient::new(&config).unwrap();

        assert_eq!(
            client.tab_groups_url("acc"),
            "https://api-d.example.com/v1/accounts/acc/connected-fields/tab-groups"
        );
        assert_eq!(
            client.envelopes_url("acc"),
            "https://demo.example.net/restapi/v2.1/accounts/acc/envelopes"
        );
    }
}
