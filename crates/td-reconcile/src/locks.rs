use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use td_schemas::Category;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per category key, created on first use.
///
/// Writers to the same category queue up; different categories never
/// contend. Entries are never removed (the category set is small).
#[derive(Debug, Default)]
pub struct CategoryLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CategoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `category`.
    pub async fn lock(&self, category: &Category) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(category.as_str().to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Number of categories that have been locked at least once.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
