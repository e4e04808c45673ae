//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with in-memory storage.

use crate::activity::{InboundActivity, OutboundMessage};
use crate::db::{Database, TranscriptEntry};
use crate::dialog::DialogStack;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for the per-conversation dialog stack
#[async_trait]
pub trait StackStore: Send + Sync {
    /// Load the stack; unknown conversations have an empty stack
    async fn load_stack(&self, conv_id: &str) -> Result<DialogStack, String>;

    /// Replace the stored stack
    async fn save_stack(&self, conv_id: &str, stack: &DialogStack) -> Result<(), String>;
}

/// Storage for committed turns
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_turn(
        &self,
        conv_id: &str,
        inbound: &InboundActivity,
        outbound: &[OutboundMessage],
    ) -> Result<TranscriptEntry, String>;

    async fn get_transcript(&self, conv_id: &str) -> Result<Vec<TranscriptEntry>, String>;
}

/// Combined storage trait for convenience
pub trait Storage: StackStore + TranscriptStore {}
impl<T: StackStore + TranscriptStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: StackStore + ?Sized> StackStore for Arc<T> {
    async fn load_stack(&self, conv_id: &str) -> Result<DialogStack, String> {
        (**self).load_stack(conv_id).await
    }

    async fn save_stack(&self, conv_id: &str, stack: &DialogStack) -> Result<(), String> {
        (**self).save_stack(conv_id, stack).await
    }
}

#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn append_turn(
        &self,
        conv_id: &str,
        inbound: &InboundActivity,
        outbound: &[OutboundMessage],
    ) -> Result<TranscriptEntry, String> {
        (**self).append_turn(conv_id, inbound, outbound).await
    }

    async fn get_transcript(&self, conv_id: &str) -> Result<Vec<TranscriptEntry>, String> {
        (**self).get_transcript(conv_id).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StackStore for DatabaseStorage {
    async fn load_stack(&self, conv_id: &str) -> Result<DialogStack, String> {
        self.db.load_stack(conv_id).map_err(|e| e.to_string())
    }

    async fn save_stack(&self, conv_id: &str, stack: &DialogStack) -> Result<(), String> {
        self.db
            .save_stack(conv_id, stack)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl TranscriptStore for DatabaseStorage {
    async fn append_turn(
        &self,
        conv_id: &str,
        inbound: &InboundActivity,
        outbound: &[OutboundMessage],
    ) -> Result<TranscriptEntry, String> {
        self.db
            .append_turn(conv_id, inbound, outbound)
            .map_err(|e| e.to_string())
    }

    async fn get_transcript(&self, conv_id: &str) -> Result<Vec<TranscriptEntry>, String> {
        self.db.get_transcript(conv_id).map_err(|e| e.to_string())
    }
}
