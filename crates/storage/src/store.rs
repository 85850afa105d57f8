//! SQLite transcript store implementation.

use crate::{ConversationId, ConversationSummary, Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;

/// SQLite-backed transcript store.
pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    /// Open or create a transcript store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory transcript store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS turns (
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                idx INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (conversation_id, idx)
            );
            "#,
        )?;
        Ok(())
    }

    /// Register a new, empty conversation.
    pub fn create_conversation(&self, title: Option<&str>) -> Result<ConversationId> {
        let id = ConversationId::new();
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id.to_string(), title, now],
        )?;
        Ok(id)
    }

    /// Append turns starting at `first_index`.
    ///
    /// `first_index` must equal the number of turns already stored; anything
    /// else would either rewrite history or leave a gap.
    pub fn append_turns(&self, id: ConversationId, first_index: usize, turns: &[Value]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let stored = count_turns(&tx, id)?;
        if stored != first_index {
            return Err(Error::Conflict {
                id: id.to_string(),
                stored,
                index: first_index,
            });
        }

        {
            let mut stmt =
                tx.prepare("INSERT INTO turns (conversation_id, idx, data) VALUES (?1, ?2, ?3)")?;
            for (offset, turn) in turns.iter().enumerate() {
                let idx = to_sql_index(first_index + offset);
                stmt.execute(params![id.to_string(), idx, serde_json::to_string(turn)?])?;
            }
        }

        tx.execute(
            "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load every stored turn of a conversation, in order.
    pub fn load_turns(&self, id: ConversationId) -> Result<Vec<Value>> {
        self.require_conversation(id)?;

        let mut stmt = self
            .conn
            .prepare("SELECT data FROM turns WHERE conversation_id = ?1 ORDER BY idx")?;
        let rows = stmt.query_map([id.to_string()], |row| row.get::<_, String>(0))?;

        let mut turns = Vec::new();
        for data in rows {
            turns.push(serde_json::from_str(&data?)?);
        }
        Ok(turns)
    }

    /// Number of turns stored for a conversation.
    pub fn turn_count(&self, id: ConversationId) -> Result<usize> {
        self.require_conversation(id)?;
        count_turns(&self.conn, id)
    }

    /// List all conversations, most recently updated first.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.title, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM turns t WHERE t.conversation_id = c.id)
            FROM conversations c
            ORDER BY c.updated_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let summaries = rows
            .filter_map(|r| r.ok())
            .filter_map(|(id, title, created_at, updated_at, count)| {
                Some(ConversationSummary {
                    id: id.parse().ok()?,
                    title,
                    created_at: parse_timestamp(&created_at)?,
                    updated_at: parse_timestamp(&updated_at)?,
                    turn_count: usize::try_from(count).ok()?,
                })
            })
            .collect();

        Ok(summaries)
    }

    fn require_conversation(&self, id: ConversationId) -> Result<()> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                [id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        found.ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

fn count_turns(conn: &Connection, id: ConversationId) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM turns WHERE conversation_id = ?1",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn to_sql_index(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
