//! Handoff Ticket Manager
//!
//! Persists an escalation as a ticket, assigns the least-loaded available
//! agent, and broadcasts to all available agents on high urgency. A session
//! holds at most one open ticket at a time; re-escalating an already-open
//! session returns the existing ticket.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::error::EngineError;
use crate::escalation::EscalationDecision;
use crate::types::{AgentInfo, AgentStatus, HandoffTicket, TicketStatus, Urgency};

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// The open (`pending`/`assigned`) ticket for a session, if any.
    async fn find_open_ticket(&self, session_id: &str) -> Result<Option<HandoffTicket>>;
    async fn create_ticket(&self, ticket: &HandoffTicket) -> Result<()>;
    async fn update_ticket(&self, ticket: &HandoffTicket) -> Result<()>;
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<AgentInfo>>;
}

#[async_trait]
pub trait AgentNotifier: Send + Sync {
    async fn notify(&self, agent_id: &str, ticket: &HandoffTicket) -> Result<()>;
}

pub struct HandoffManager {
    store: Arc<dyn TicketStore>,
    directory: Arc<dyn AgentDirectory>,
    notifier: Arc<dyn AgentNotifier>,
}

impl HandoffManager {
    pub fn new(
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn AgentDirectory>,
        notifier: Arc<dyn AgentNotifier>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    /// Open (or reuse) a handoff ticket for an escalated session.
    ///
    /// Store errors surface as `EngineError::Persistence`. Notification
    /// failures are logged and swallowed — a ticket without a ping is still
    /// a ticket.
    pub async fn open_ticket(
        &self,
        session_id: &str,
        decision: &EscalationDecision,
    ) -> Result<HandoffTicket, EngineError> {
        if let Some(existing) = self
            .store
            .find_open_ticket(session_id)
            .await
            .map_err(EngineError::Persistence)?
        {
            tracing::debug!(
                session = %session_id,
                ticket = %existing.id,
                "session already has an open ticket, reusing"
            );
            return Ok(existing);
        }

        let mut ticket = HandoffTicket::pending(session_id, &decision.reason, decision.urgency);
        self.store
            .create_ticket(&ticket)
            .await
            .map_err(EngineError::Persistence)?;

        let available = self.available_agents().await;

        if let Some(agent) = Self::select_agent(&available) {
            ticket.assigned_agent_id = Some(agent.agent_id.clone());
            ticket.status = TicketStatus::Assigned;
            self.store
                .update_ticket(&ticket)
                .await
                .map_err(EngineError::Persistence)?;
            tracing::info!(
                session = %session_id,
                ticket = %ticket.id,
                agent = %agent.agent_id,
                urgency = ?ticket.urgency,
                "handoff ticket assigned"
            );
        } else {
            tracing::warn!(
                session = %session_id,
                ticket = %ticket.id,
                "no available agents, ticket left pending"
            );
        }

        // High urgency pages every available agent, not just the assignee.
        if decision.urgency == Urgency::High {
            for agent in &available {
                if let Err(e) = self.notifier.notify(&agent.agent_id, &ticket).await {
                    tracing::warn!(
                        agent = %agent.agent_id,
                        ticket = %ticket.id,
                        error = %e,
                        "agent notification failed"
                    );
                }
            }
        }

        Ok(ticket)
    }

    /// Mark a ticket resolved. The session becomes eligible for a new ticket.
    pub async fn resolve_ticket(&self, ticket: &mut HandoffTicket) -> Result<(), EngineError> {
        ticket.status = TicketStatus::Resolved;
        ticket.resolved_at = Some(Utc::now());
        self.store
            .update_ticket(ticket)
            .await
            .map_err(EngineError::Persistence)
    }

    async fn available_agents(&self) -> Vec<AgentInfo> {
        match self.directory.list_agents().await {
            Ok(agents) => agents
                .into_iter()
                .filter(|a| a.status == AgentStatus::Available)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "agent directory unavailable, skipping assignment");
                Vec::new()
            }
        }
    }

    /// Lowest workload wins; ties break on agent id so assignment is
    /// deterministic.
    fn select_agent(available: &[AgentInfo]) -> Option<&AgentInfo> {
        available.iter().min_by(|a, b| {
            a.workload
                .cmp(&b.workload)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Urgency;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryTicketStore {
        tickets: Mutex<Vec<HandoffTicket>>,
        fail_create: bool,
    }

    #[async_trait]
    impl TicketStore for MemoryTicketStore {
        async fn find_open_ticket(&self, session_id: &str) -> Result<Option<HandoffTicket>> {
            Ok(self
                .tickets
                .lock()
                .iter()
                .find(|t| t.session_id == session_id && t.status.is_open())
                .cloned())
        }

        async fn create_ticket(&self, ticket: &HandoffTicket) -> Result<()> {
            if self.fail_create {
                return Err(anyhow!("unique constraint violation"));
            }
            self.tickets.lock().push(ticket.clone());
            Ok(())
        }

        async fn update_ticket(&self, ticket: &HandoffTicket) -> Result<()> {
            let mut tickets = self.tickets.lock();
            if let Some(existing) = tickets.iter_mut().find(|t| t.id == ticket.id) {
                *existing = ticket.clone();
            }
            Ok(())
        }
    }

    struct FixedDirectory {
        agents: Vec<AgentInfo>,
    }

    #[async_trait]
    impl AgentDirectory for FixedDirectory {
        async fn list_agents(&self) -> Result<Vec<AgentInfo>> {
            Ok(self.agents.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notified: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AgentNotifier for RecordingNotifier {
        async fn notify(&self, agent_id: &str, _ticket: &HandoffTicket) -> Result<()> {
            if self.fail {
                return Err(anyhow!("notification channel down"));
            }
            self.notified.lock().push(agent_id.to_string());
            Ok(())
        }
    }

    fn agent(id: &str, workload: u32, status: AgentStatus) -> AgentInfo {
        AgentInfo {
            agent_id: id.to_string(),
            workload,
            status,
        }
    }

    fn decision(urgency: Urgency) -> EscalationDecision {
        EscalationDecision {
            should_handoff: true,
            urgency,
            reason: "Customer requested human agent".to_string(),
            triggers: vec![],
        }
    }

    fn manager(
        store: Arc<MemoryTicketStore>,
        agents: Vec<AgentInfo>,
        notifier: Arc<RecordingNotifier>,
    ) -> HandoffManager {
        HandoffManager::new(store, Arc::new(FixedDirectory { agents }), notifier)
    }

    #[tokio::test]
    async fn test_one_open_ticket_per_session() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store.clone(),
            vec![agent("a1", 0, AgentStatus::Available)],
            notifier,
        );

        let first = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();
        let second = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.tickets.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_session_gets_new_ticket() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store.clone(),
            vec![agent("a1", 0, AgentStatus::Available)],
            notifier,
        );

        let mut first = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();
        manager.resolve_ticket(&mut first).await.unwrap();
        let second = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_lowest_workload_wins_ties_by_id() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store,
            vec![
                agent("zed", 1, AgentStatus::Available),
                agent("amy", 1, AgentStatus::Available),
                agent("bob", 5, AgentStatus::Available),
                agent("idle", 0, AgentStatus::Offline),
            ],
            notifier,
        );

        let ticket = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();
        assert_eq!(ticket.assigned_agent_id.as_deref(), Some("amy"));
        assert_eq!(ticket.status, TicketStatus::Assigned);
    }

    #[tokio::test]
    async fn test_high_urgency_notifies_all_available() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store,
            vec![
                agent("a1", 0, AgentStatus::Available),
                agent("a2", 3, AgentStatus::Available),
                agent("a3", 0, AgentStatus::Busy),
            ],
            notifier.clone(),
        );

        manager.open_ticket("s1", &decision(Urgency::High)).await.unwrap();

        let notified = notifier.notified.lock();
        assert_eq!(notified.len(), 2);
        assert!(notified.contains(&"a1".to_string()));
        assert!(notified.contains(&"a2".to_string()));
    }

    #[tokio::test]
    async fn test_medium_urgency_does_not_broadcast() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store,
            vec![agent("a1", 0, AgentStatus::Available)],
            notifier.clone(),
        );

        manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();
        assert!(notifier.notified.lock().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_is_not_fatal() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let manager = manager(
            store,
            vec![agent("a1", 0, AgentStatus::Available)],
            notifier,
        );

        let ticket = manager.open_ticket("s1", &decision(Urgency::High)).await;
        assert!(ticket.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let store = Arc::new(MemoryTicketStore {
            fail_create: true,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store,
            vec![agent("a1", 0, AgentStatus::Available)],
            notifier,
        );

        let err = manager
            .open_ticket("s1", &decision(Urgency::Medium))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_no_available_agents_leaves_pending() {
        let store = Arc::new(MemoryTicketStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = manager(
            store,
            vec![agent("a1", 0, AgentStatus::Offline)],
            notifier,
        );

        let ticket = manager.open_ticket("s1", &decision(Urgency::Medium)).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert!(ticket.assigned_agent_id.is_none());
    }
}
