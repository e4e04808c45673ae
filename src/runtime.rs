//! Runtime for executing conversation turns
//!
//! Turns of one conversation run strictly one after another; different
//! conversations run in parallel and share only storage.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{DialogRuntime, RuntimeError, TurnOutcome};
pub use traits::*;

use crate::activity::InboundActivity;
use crate::db::TranscriptEntry;
use crate::dialog::DialogStack;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = DialogRuntime<DatabaseStorage>;

/// Serializes turns per conversation in front of a shared runtime
pub struct RuntimeManager<S: Storage> {
    runtime: DialogRuntime<S>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: Storage> RuntimeManager<S> {
    pub fn new(runtime: DialogRuntime<S>) -> Self {
        Self {
            runtime,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn conversation_lock(&self, conv_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(conv_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the conversation's lock once no other turn holds or waits on it
    async fn release_lock(&self, conv_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().await;
        if locks.get(conv_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(conv_id);
        }
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Run one turn for the conversation
    pub async fn handle_activity(
        &self,
        conv_id: &str,
        activity: InboundActivity,
    ) -> Result<TurnOutcome, RuntimeError> {
        let lock = self.conversation_lock(conv_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.runtime.handle_turn(conv_id, activity).await
        };
        self.release_lock(conv_id, lock).await;
        result
    }

    pub async fn logout(&self, conv_id: &str) -> Result<(), RuntimeError> {
        let lock = self.conversation_lock(conv_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.runtime.logout(conv_id).await
        };
        self.release_lock(conv_id, lock).await;
        result
    }

    /// Currently persisted stack
    pub async fn stack(&self, conv_id: &str) -> Result<DialogStack, RuntimeError> {
        self.runtime
            .storage()
            .load_stack(conv_id)
            .await
            .map_err(RuntimeError::Storage)
    }

    pub async fn transcript(&self, conv_id: &str) -> Result<Vec<TranscriptEntry>, RuntimeError> {
        self.runtime
            .storage()
            .get_transcript(conv_id)
            .await
            .map_err(RuntimeError::Storage)
    }
}
