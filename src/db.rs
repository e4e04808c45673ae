//! Database module
//!
//! Persists dialog stacks and turn transcripts per conversation.

mod schema;

pub use schema::*;

use crate::activity::{InboundActivity, OutboundMessage};
use crate::dialog::DialogStack;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored data is invalid: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Stack Operations ====================

    /// Load the dialog stack; a conversation never seen has an empty stack
    pub fn load_stack(&self, conv_id: &str) -> DbResult<DialogStack> {
        let conn = self.conn()?;
        let stack_json: Option<String> = conn
            .query_row(
                "SELECT stack FROM conversations WHERE id = ?1",
                params![conv_id],
                |row| row.get(0),
            )
            .optional()?;

        match stack_json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(DialogStack::new()),
        }
    }

    /// Replace the stored stack, creating the conversation on first save
    pub fn save_stack(&self, conv_id: &str, stack: &DialogStack) -> DbResult<()> {
        let stack_json = serde_json::to_string(stack)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversations (id, stack, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET stack = excluded.stack, updated_at = excluded.updated_at",
            params![conv_id, stack_json, now],
        )?;
        Ok(())
    }

    // ==================== Transcript Operations ====================

    /// Append one committed turn with the next sequence number
    pub fn append_turn(
        &self,
        conv_id: &str,
        inbound: &InboundActivity,
        outbound: &[OutboundMessage],
    ) -> DbResult<TranscriptEntry> {
        let inbound_json = serde_json::to_string(inbound)?;
        let outbound_json = serde_json::to_string(outbound)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let conn = self.conn()?;
        let sequence_id: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM transcript WHERE conversation_id = ?1",
            params![conv_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO transcript (id, conversation_id, sequence_id, inbound, outbound, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, conv_id, sequence_id, inbound_json, outbound_json, now.to_rfc3339()],
        )?;

        Ok(TranscriptEntry {
            id,
            conversation_id: conv_id.to_string(),
            sequence_id,
            inbound: inbound.clone(),
            outbound: outbound.to_vec(),
            created_at: now,
        })
    }

    /// All turns of a conversation in order
    pub fn get_transcript(&self, conv_id: &str) -> DbResult<Vec<TranscriptEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sequence_id, inbound, outbound, created_at
             FROM transcript WHERE conversation_id = ?1 ORDER BY sequence_id",
        )?;

        let rows = stmt.query_map(params![conv_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, conversation_id, sequence_id, inbound, outbound, created_at) = row?;
            entries.push(TranscriptEntry {
                id,
                conversation_id,
                sequence_id,
                inbound: serde_json::from_str(&inbound)?,
                outbound: serde_json::from_str(&outbound)?,
                created_at: parse_datetime(&created_at),
            });
        }
        Ok(entries)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
