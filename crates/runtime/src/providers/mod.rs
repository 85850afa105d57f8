//! Model transport adapters.
//!
//! Each provider implements [`Backend`](crate::model::Backend) for its
//! specific API.

mod anthropic;

pub use anthropic::{AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder};
