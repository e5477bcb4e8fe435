use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single conversation message. Produced by the session layer, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(session_id: &str, role: MessageRole, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Derived view of a conversation, recomputed per turn from recent history.
/// Never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    pub message_count: usize,
    pub average_confidence: f32,
    pub sentiment: Sentiment,
    pub complexity: Complexity,
    pub topics: Vec<String>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Document,
    Webpage,
}

/// A unit of indexed knowledge-base text with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub source_id: String,
    pub source_type: SourceType,
    pub text: String,
    pub similarity: f32,
    pub metadata: HashMap<String, String>,
}

/// Normalized output of a language-model provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    pub tokens_used: u32,
    pub model_used: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Result of one independent escalation trigger evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffTrigger {
    pub triggered: bool,
    pub urgency: Urgency,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Assigned,
    Resolved,
    Cancelled,
}

impl TicketStatus {
    /// Open tickets block creation of a new ticket for the same session.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Assigned)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffTicket {
    pub id: Uuid,
    pub session_id: String,
    pub reason: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub assigned_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl HandoffTicket {
    pub fn pending(session_id: &str, reason: &str, urgency: Urgency) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            reason: reason.to_string(),
            urgency,
            status: TicketStatus::Pending,
            assigned_agent_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Available,
    Busy,
    Offline,
}

/// Human agent availability as reported by the agent directory. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub workload: u32,
    pub status: AgentStatus,
}
