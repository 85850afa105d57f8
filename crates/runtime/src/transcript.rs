//! Transcript encoding and persistence.
//!
//! A transcript is the JSON array of a conversation's turns, in order. The
//! encoding is lossless: block kinds, ids, `is_error` flags and text survive
//! a round trip unchanged.

use crate::model::{ContentBlock, Role, Turn};
use crate::{Error, Result};
use storage::{ConversationId, TranscriptStore};

/// Encode turns as a pretty-printed JSON array.
pub fn to_json(turns: &[Turn]) -> Result<String> {
    Ok(serde_json::to_string_pretty(turns)?)
}

/// Decode and validate a JSON transcript.
pub fn from_json(json: &str) -> Result<Vec<Turn>> {
    let turns: Vec<Turn> = serde_json::from_str(json)?;
    validate(&turns)?;
    Ok(turns)
}

/// Check that every tool request is answered by exactly one result, with a
/// matching id, in the turn right after it, and that no result is orphaned.
///
/// A tool request must be the final block of an assistant turn.
pub fn validate(turns: &[Turn]) -> Result<()> {
    let mut pending = None;

    for (index, turn) in turns.iter().enumerate() {
        let results: Vec<_> = turn.tool_results().collect();

        match pending.take() {
            Some(id) => {
                let answered = turn.role == Role::User
                    && results.len() == 1
                    && results[0].tool_use_id == id;
                if !answered {
                    return Err(Error::InvalidTranscript(format!(
                        "turn {index} does not answer tool request {id}"
                    )));
                }
            }
            None => {
                if let Some(orphan) = results.first() {
                    return Err(Error::InvalidTranscript(format!(
                        "turn {index} holds result {} for no pending tool request",
                        orphan.tool_use_id
                    )));
                }
            }
        }

        let requests = turn
            .content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse(_)))
            .count();
        let trailing = turn.trailing_tool_use();
        let stranded = requests > usize::from(trailing.is_some())
            || (requests > 0 && turn.role != Role::Assistant);
        if stranded {
            return Err(Error::InvalidTranscript(format!(
                "turn {index} holds a tool request that can never be answered"
            )));
        }
        pending = trailing.map(|call| call.id.as_str());
    }

    match pending {
        Some(id) => Err(Error::InvalidTranscript(format!(
            "tool request {id} was never answered"
        ))),
        None => Ok(()),
    }
}

/// Persist the turns not yet in the store.
///
/// The store is append-only, so this writes exactly `turns[stored..]` and
/// returns how many turns it appended.
pub fn save(store: &TranscriptStore, id: ConversationId, turns: &[Turn]) -> Result<usize> {
    let stored = store.turn_count(id)?;
    let Some(new_turns) = turns.get(stored..) else {
        return Err(Error::InvalidTranscript(format!(
            "store holds {stored} turns but history has only {}",
            turns.len()
        )));
    };

    let values = new_turns
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    store.append_turns(id, stored, &values)?;
    Ok(values.len())
}

/// Load and validate a stored transcript.
pub fn load(store: &TranscriptStore, id: ConversationId) -> Result<Vec<Turn>> {
    let turns = store
        .load_turns(id)?
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<Turn>, _>>()?;
    validate(&turns)?;
    Ok(turns)
}
