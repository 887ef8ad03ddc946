//! Per-account cache of connected-field extensions.
//!
//! Extension lists change rarely; the list fetched when the signer opens the
//! form is reused for the submission that follows.

use envelope_core::ExtensionDescriptor;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Shared extension list for one account.
pub type ExtensionList = Arc<Vec<ExtensionDescriptor>>;

/// Extension cache keyed by account id, using moka.
#[derive(Clone)]
pub struct ExtensionCache {
    cache: Cache<String, ExtensionList>,
}

impl ExtensionCache {
    pub fn new(max_accounts: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_accounts)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, account_id: &str) -> Option<ExtensionList> {
        self.cache.get(account_id).await
    }

    pub async fn insert(&self, account_id: &str, extensions: ExtensionList) {
        self.cache.insert(account_id.to_string(), extensions).await;
    }

    pub async fn invalidate(&self, account_id: &str) {
        self.cache.invalidate(account_id).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ExtensionCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(600))
    }
}

impl std::fmt::Debug for ExtensionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
