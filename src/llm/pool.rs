//! Pool of completion clients spread over several API keys

use super::{CompletionProvider, CompletionRequest, LlmClient, LlmConfig};
use crate::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed set of clients handed out round-robin
///
/// Built once at startup and read-only afterwards. Spreading calls over
/// keys only distributes quota; any client gives the same answer.
pub struct ClientPool {
    clients: Vec<Arc<dyn CompletionProvider>>,
    next: AtomicUsize,
}

impl ClientPool {
    pub fn new(clients: Vec<Arc<dyn CompletionProvider>>) -> Result<Self> {
        if clients.is_empty() {
            return Err(Error::Config("client pool needs at least one client".to_string()));
        }

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    /// One client per API key, all sharing `base` otherwise
    ///
    /// With no keys a single keyless client is created (local endpoints).
    pub fn from_keys(base: &LlmConfig, keys: &[String]) -> Result<Self> {
        let keys: Vec<&str> = keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let clients: Vec<Arc<dyn CompletionProvider>> = if keys.is_empty() {
            vec![Arc::new(LlmClient::new(base.clone()))]
        } else {
            keys.into_iter()
                .map(|key| {
                    let config = LlmConfig {
                        api_key: Some(key.to_string()),
                        ..base.clone()
                    };
                    Arc::new(LlmClient::new(config)) as Arc<dyn CompletionProvider>
                })
                .collect()
        };

        Self::new(clients)
    }

    /// Next client in rotation
    pub fn pick(&self) -> Arc<dyn CompletionProvider> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        Arc::clone(&self.clients[index])
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ClientPool {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.pick().complete(request).await
    }
}
