//! End-to-end submission: fetch extensions, assemble, create, sign.

use chrono::{DateTime, Utc};
use envelope_core::{
    has_all_required_extensions, ClaimInput, EnvelopeAssembler, EnvelopeDescriptor,
    PurchaseRequest, RecipientViewRequest, TemplateRenderer,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{ExtensionCache, ExtensionList};
use crate::client::{read_backoff, with_retry, EnvelopeSubmitter, ExtensionSource};
use crate::config::RuntimeConfig;
use crate::secrets::AccessToken;
use crate::RuntimeError;

/// Outcome of a successful submission.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub envelope_id: String,

    /// Embedded signing session to redirect the signer to
    pub redirect_url: String,

    pub submitted_at: DateTime<Utc>,
}

/// Drives envelope assembly and submission against the signing platform.
pub struct EnvelopeService {
    config: RuntimeConfig,
    assembler: EnvelopeAssembler,
    extensions: Arc<dyn ExtensionSource>,
    submitter: Arc<dyn EnvelopeSubmitter>,
    cache: ExtensionCache,
}

impl EnvelopeService {
    pub fn new(
        config: RuntimeConfig,
        extensions: Arc<dyn ExtensionSource>,
        submitter: Arc<dyn EnvelopeSubmitter>,
    ) -> Self {
        let renderer = TemplateRenderer::from_dir(config.assets_dir());
        let assembler = EnvelopeAssembler::new(renderer, config.payment);
        let cache = ExtensionCache::new(config.extension_cache_capacity, config.extension_cache_ttl);

        Self {
            config,
            assembler,
            extensions,
            submitter,
            cache,
        }
    }

    /// Service backed by the HTTP client for both seams.
    #[cfg(feature = "http")]
    pub fn http(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let client = Arc::new(crate::client::HttpClient::new(&config)?);
        Ok(Self::new(config, client.clone(), client))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn assembler(&self) -> &EnvelopeAssembler {
        &self.assembler
    }

    /// The account's extensions, cached for the configured TTL.
    pub async fn extensions(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<ExtensionList, RuntimeError> {
        if let Some(cached) = self.cache.get(account_id).await {
            debug!(account_id, "Using cached extension list");
            return Ok(cached);
        }

        let source = self.extensions.clone();
        let fetched = with_retry("tab_groups", read_backoff(), || {
            let source = source.clone();
            async move { source.tab_groups(account_id, token).await }
        })
        .await?;

        debug!(account_id, count = fetched.len(), "Fetched extension list");
        let list: ExtensionList = Arc::new(fetched);
        self.cache.insert(account_id, list.clone()).await;
        Ok(list)
    }

    /// Whether the account has both verification providers installed.
    pub async fn extensions_available(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<bool, RuntimeError> {
        let extensions = self.extensions(account_id, token).await?;
        Ok(has_all_required_extensions(&extensions))
    }

    /// Assemble and submit a claim, returning the signing session.
    pub async fn submit_claim(
        &self,
        account_id: &str,
        token: &AccessToken,
        claim: &ClaimInput,
        return_url: Option<&str>,
    ) -> Result<SubmissionReceipt, RuntimeError> {
        let args = self.config.envelope_args(return_url);

        let envelope = if claim.use_without_extension {
            self.assembler.assemble_claim(claim, &args, None)?
        } else {
            let extensions = self.extensions(account_id, token).await?;
            self.assembler
                .assemble_claim(claim, &args, Some(extensions.as_slice()))?
        };

        self.submit(account_id, token, &envelope, &args.return_url)
            .await
    }

    /// Assemble and submit an insurance purchase with payment.
    pub async fn buy_insurance(
        &self,
        account_id: &str,
        token: &AccessToken,
        request: &PurchaseRequest,
        return_url: Option<&str>,
    ) -> Result<SubmissionReceipt, RuntimeError> {
        let args = self.config.envelope_args(return_url);
        let gateway = self.config.gateway()?;

        let envelope = if request.use_without_extension {
            self.assembler
                .assemble_purchase(request, &args, gateway, None)?
        } else {
            let extensions = self.extensions(account_id, token).await?;
            self.assembler.assemble_purchase(
                request,
                &args,
                gateway,
                Some(extensions.as_slice()),
            )?
        };

        self.submit(account_id, token, &envelope, &args.return_url)
            .await
    }

    /// Create the envelope once, then open the signer's session.
    async fn submit(
        &self,
        account_id: &str,
        token: &AccessToken,
        envelope: &EnvelopeDescriptor,
        return_url: &str,
    ) -> Result<SubmissionReceipt, RuntimeError> {
        let signer = envelope
            .signer()
            .ok_or_else(|| RuntimeError::Config("envelope has no signer".to_string()))?;
        let view = RecipientViewRequest::for_signer(signer, return_url);

        let envelope_id = self
            .submitter
            .create_envelope(account_id, token, envelope)
            .await?;
        info!(%envelope_id, subject = %envelope.email_subject, "Envelope created");

        let redirect_url = self
            .submitter
            .recipient_view(account_id, token, &envelope_id, &view)
            .await?;

        Ok(SubmissionReceipt {
            envelope_id,
            redirect_url,
            submitted_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for EnvelopeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeService")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use envelope_core::extensions::{
        ExtensionData, ExtensionDescriptor, ExtensionTab, ADDRESS_APP_ID, ADDRESS_TAB_PATTERNS,
        TWILIO_APP_ID,
    };
    use envelope_core::GatewayConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        extensions: Vec<ExtensionDescriptor>,
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ExtensionSource for FakeSource {
        async fn tab_groups(
            &self,
            _account_id: &str,
            _token: &AccessToken,
        ) -> Result<Vec<ExtensionDescriptor>, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(ClientError::Http("connection reset".into()));
            }
            Ok(self.extensions.clone())
        }
    }

    #[derive(Default)]
    struct FakeSubmitter {
        created: Mutex<Vec<EnvelopeDescriptor>>,
        views: Mutex<Vec<RecipientViewRequest>>,
        reject: Option<u16>,
    }

    #[async_trait]
    impl EnvelopeSubmitter for FakeSubmitter {
        async fn create_envelope(
            &self,
            _account_id: &str,
            _token: &AccessToken,
            envelope: &EnvelopeDescriptor,
        ) -> Result<String, ClientError> {
            if let Some(status) = self.reject {
                return Err(ClientError::RemoteApi {
                    status,
                    message: "ENVELOPE_IS_INCOMPLETE".into(),
                });
            }
            self.created.lock().unwrap().push(envelope.clone());
            Ok("env-1".to_string())
        }

        async fn recipient_view(
            &self,
            _account_id: &str,
            _token: &AccessToken,
            envelope_id: &str,
            request: &RecipientViewRequest,
        ) -> Result<String, ClientError> {
            self.views.lock().unwrap().push(request.clone());
            Ok(format!("https://sign.example.com/{}", envelope_id))
        }
    }

    fn extensions() -> Vec<ExtensionDescriptor> {
        let tab = |label: &str| ExtensionTab {
            tab_label: label.to_string(),
            extension_data: ExtensionData::default(),
        };
        vec![
            ExtensionDescriptor {
                app_id: TWILIO_APP_ID.into(),
                tabs: vec![tab("VerifyEmailInput")],
            },
            ExtensionDescriptor {
                app_id: ADDRESS_APP_ID.into(),
                tabs: ADDRESS_TAB_PATTERNS.iter().map(|(_, p)| tab(p)).collect(),
            },
        ]
    }

    fn claim(use_without_extension: bool) -> ClaimInput {
        ClaimInput::from_json(&serde_json::json!({
            "first_name": "A",
            "last_name": "B",
            "email": "a@b.com",
            "street": "1 Main",
            "city": "X",
            "state": "Y",
            "country": "Z",
            "zip_code": "00000",
            "type": "auto",
            "timestamp": "t",
            "description": "d",
            "useWithoutExtension": use_without_extension
        }))
        .unwrap()
    }

    fn purchase() -> PurchaseRequest {
        PurchaseRequest::from_json(&serde_json::json!({
            "user": {
                "first_name": "Jane",
                "last_name": "Roe",
                "email": "jane@example.com",
                "street": "5 Elm",
                "city": "Springfield",
                "state": "IL",
                "country": "US",
                "zip_code": "62701"
            },
            "insurance": {
                "detail1": {"name": "Vehicle", "value": "Sedan"},
                "detail2": {"name": "Year", "value": 2020}
            },
            "useWithoutExtension": true
        }))
        .unwrap()
    }

    fn service(
        source: Arc<FakeSource>,
        submitter: Arc<FakeSubmitter>,
        gateway: Option<GatewayConfig>,
    ) -> EnvelopeService {
        let config = RuntimeConfig {
            account_id: Some("acc".into()),
            return_url: "https://app.example.com/done".into(),
            gateway,
            ..Default::default()
        };
        EnvelopeService::new(config, source, submitter)
    }

    fn token() -> AccessToken {
        AccessToken::new("token")
    }

    #[tokio::test]
    async fn test_extensions_available_uses_cache() {
        let source = Arc::new(FakeSource {
            extensions: extensions(),
            ..Default::default()
        });
        let svc = service(source.clone(), Arc::new(FakeSubmitter::default()), None);

        assert!(svc.extensions_available("acc", &token()).await.unwrap());
        assert!(svc.extensions_available("acc", &token()).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extensions_unavailable_on_partial_list() {
        let source = Arc::new(FakeSource {
            extensions: extensions().into_iter().take(1).collect(),
            ..Default::default()
        });
        let svc = service(source, Arc::new(FakeSubmitter::default()), None);
        assert!(!svc.extensions_available("acc", &token()).await.unwrap());
    }

    #[tokio::test]
    async fn test_transient_fetch_failure_is_retried() {
        let source = Arc::new(FakeSource {
            extensions: extensions(),
            fail_first: true,
            ..Default::default()
        });
        let svc = service(source.clone(), Arc::new(FakeSubmitter::default()), None);

        assert!(svc.extensions_available("acc", &token()).await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_claim_without_extensions() {
        let source = Arc::new(FakeSource::default());
        let submitter = Arc::new(FakeSubmitter::default());
        let svc = service(source.clone(), submitter.clone(), None);

        let receipt = svc
            .submit_claim("acc", &token(), &claim(true), None)
            .await
            .unwrap();

        assert_eq!(receipt.envelope_id, "env-1");
        assert_eq!(receipt.redirect_url, "https://sign.example.com/env-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let views = submitter.views.lock().unwrap();
        assert_eq!(views[0].return_url, "https://app.example.com/done");
        assert_eq!(views[0].client_user_id, "1000");
    }

    #[tokio::test]
    async fn test_submit_claim_with_extensions() {
        let source = Arc::new(FakeSource {
            extensions: extensions(),
            ..Default::default()
        });
        let submitter = Arc::new(FakeSubmitter::default());
        let svc = service(source, submitter.clone(), None);

        svc.submit_claim("acc", &token(), &claim(false), Some("https://cb"))
            .await
            .unwrap();

        let created = submitter.created.lock().unwrap();
        let tabs = &created[0].signer().unwrap().tabs;
        assert!(tabs.email_tabs[0].is_verified());
        assert_eq!(tabs.text_tabs.len(), 5);
        assert_eq!(submitter.views.lock().unwrap()[0].return_url, "https://cb");
    }

    #[tokio::test]
    async fn test_remote_api_error_surfaces_unchanged() {
        let submitter = Arc::new(FakeSubmitter {
            reject: Some(400),
            ..Default::default()
        });
        let svc = service(Arc::new(FakeSource::default()), submitter, None);

        let err = svc
            .submit_claim("acc", &token(), &claim(true), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Client(ClientError::RemoteApi { status: 400, ref message })
                if message == "ENVELOPE_IS_INCOMPLETE"
        ));
    }

    #[tokio::test]
    async fn test_buy_insurance_requires_gateway() {
        let svc = service(
            Arc::new(FakeSource::default()),
            Arc::new(FakeSubmitter::default()),
            None,
        );
        let err = svc
            .buy_insurance("acc", &token(), &purchase(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[tokio::test]
    async fn test_buy_insurance() {
        let submitter = Arc::new(FakeSubmitter::default());
        let svc = service(
            Arc::new(FakeSource::default()),
            submitter.clone(),
            Some(GatewayConfig::new("gw-1", "Stripe")),
        );

        let receipt = svc
            .buy_insurance("acc", &token(), &purchase(), None)
            .await
            .unwrap();
        assert_eq!(receipt.envelope_id, "env-1");

        let created = submitter.created.lock().unwrap();
        let tabs = &created[0].signer().unwrap().tabs;
        assert_eq!(tabs.formula_tabs.len(), 4);
        let payment = tabs
            .formula_tabs
            .iter()
            .find(|f| f.payment_details.is_some())
            .unwrap();
        assert_eq!(
            payment.payment_details.as_ref().unwrap().gateway_account_id,
            "gw-1"
        );
    }
}
