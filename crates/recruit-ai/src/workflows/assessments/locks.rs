use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::domain::ResultId;

/// Serializes analysis generation per result so concurrent callers do not
/// each call the evaluator.
#[derive(Debug, Default)]
pub(crate) struct AnalysisLocks {
    slots: Mutex<HashMap<ResultId, Arc<AsyncMutex<()>>>>,
}

impl AnalysisLocks {
    pub(crate) async fn acquire(&self, id: &ResultId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots nobody holds or waits on can go.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(id.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
