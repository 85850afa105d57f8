//! SQLite-backed transcript storage for skiff conversations.
//!
//! A transcript is the ordered list of turns exchanged with the model. The
//! store treats each conversation as an append-only log: turns are written
//! once at a fixed index and never rewritten, which is what lets a
//! conversation be resumed after a restart with its prefix intact.
//!
//! Turns are stored as opaque JSON values. The `runtime` crate owns the turn
//! type and converts to and from [`serde_json::Value`] at this boundary.
//!
//! # Example
//!
//! ```no_run
//! use storage::TranscriptStore;
//! use serde_json::json;
//!
//! let store = TranscriptStore::open("transcripts.db")?;
//! let id = store.create_conversation(Some("first try"))?;
//!
//! store.append_turns(id, 0, &[json!({"role": "user", "content": []})])?;
//! assert_eq!(store.turn_count(id)?, 1);
//!
//! for summary in store.list_conversations()? {
//!     println!("{}: {} turns", summary.id, summary.turn_count);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod conversation;
mod error;
mod store;

pub use conversation::{ConversationId, ConversationSummary};
pub use error::{Error, Result};
pub use store::TranscriptStore;
