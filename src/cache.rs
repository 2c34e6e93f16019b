use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::dictionary::Dictionary;
use crate::error::LoadError;

// Loaded entries are never invalidated. Concurrent loads of a code share one fetch.
#[derive(Default)]
pub struct TranslationCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<Dictionary>>>>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load<F, Fut>(
        &self,
        code: &str,
        load: F,
    ) -> Result<Arc<Dictionary>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Dictionary, LoadError>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(code.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(dict) = cell.get() {
            tracing::debug!(code, "dictionary cache hit");
            return Ok(dict.clone());
        }

        match cell
            .get_or_try_init(|| async move { load().await.map(Arc::new) })
            .await
        {
            Ok(dict) => Ok(dict.clone()),
            Err(e) => {
                self.forget_failed(code, &cell).await;
                Err(e)
            }
        }
    }

    // A failed code keeps no entry, so the next request starts from scratch.
    async fn forget_failed(&self, code: &str, cell: &Arc<OnceCell<Arc<Dictionary>>>) {
        let mut entries = self.entries.lock().await;
        let stale = entries
            .get(code)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            entries.remove(code);
        }
    }

    pub async fn get(&self, code: &str) -> Option<Arc<Dictionary>> {
        let entries = self.entries.lock().await;
        entries.get(code).and_then(|cell| cell.get().cloned())
    }

    pub async fn loaded(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        let mut codes: Vec<_> = entries
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }
}
