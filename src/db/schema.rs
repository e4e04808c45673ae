//! Database schema and types

use crate::activity::{InboundActivity, OutboundMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    stack TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC);

CREATE TABLE IF NOT EXISTS transcript (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    inbound TEXT NOT NULL,
    outbound TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_transcript_conversation
    ON transcript(conversation_id, sequence_id);
";

/// One committed turn: what came in and what went out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: String,
    pub conversation_id: String,
    /// 1-based, per conversation
    pub sequence_id: i64,
    pub inbound: InboundActivity,
    pub outbound: Vec<OutboundMessage>,
    pub created_at: DateTime<Utc>,
}
