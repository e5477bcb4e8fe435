//! Conversation store seam.
//!
//! The engine reads ordered history by session id and never writes messages —
//! persisting turns is the session layer's job.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Message;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The most recent `limit` messages for a session, ordered oldest first.
    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>>;
}
