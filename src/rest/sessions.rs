//! Preview sessions held by the API server.
//!
//! Each session owns a simulator over its own copy of the flow graph.
//! Sessions idle for longer than the TTL are dropped on the next sweep or
//! lookup, so abandoned previews do not accumulate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::simulator::PreviewSimulator;

struct Session {
    sim: PreviewSimulator,
    last_touched: Instant,
}

/// Shared map of live preview sessions
#[derive(Clone)]
pub struct PreviewSessions {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl PreviewSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a new session under a fresh id, sweeping expired ones first
    pub async fn insert(&self, sim: PreviewSimulator) -> Uuid {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions, now);

        let session_id = Uuid::new_v4();
        sessions.insert(
            session_id,
            Session {
                sim,
                last_touched: now,
            },
        );
        session_id
    }

    /// Run `f` against a live session and mark it as used.
    ///
    /// Returns `None` when the session is unknown or has expired.
    pub async fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut PreviewSimulator) -> T,
    ) -> Option<T> {
        self.with_session_at(session_id, Instant::now(), f).await
    }

    async fn with_session_at<T>(
        &self,
        session_id: Uuid,
        now: Instant,
        f: impl FnOnce(&mut PreviewSimulator) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        let expired = self.is_expired(sessions.get(&session_id)?, now);
        if expired {
            sessions.remove(&session_id);
            tracing::debug!(%session_id, "Preview session expired");
            return None;
        }

        let session = sessions.get_mut(&session_id)?;
        session.last_touched = now;
        Some(f(&mut session.sim))
    }

    /// Discard a session; `false` when it did not exist
    pub async fn remove(&self, session_id: Uuid) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    /// Drop every expired session, returning how many were removed
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions, now)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_touched) >= self.ttl
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, Session>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Evicted idle preview sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::FlowGraph;
    use crate::simulator::SimulatorState;
    use crate::types::{MenuStep, ResponseType};

    fn simulator() -> PreviewSimulator {
        let step = MenuStep::new(Uuid::new_v4(), "ask", "Amount?", ResponseType::Input).initial();
        let mut sim = PreviewSimulator::new(FlowGraph::new(step.flow_id, vec![step], vec![]));
        sim.start().unwrap();
        sim
    }

    #[tokio::test]
    async fn test_session_expires_after_ttl() {
        let sessions = PreviewSessions::new(Duration::from_secs(60));
        let id = sessions.insert(simulator()).await;
        let now = Instant::now();

        let state = sessions
            .with_session_at(id, now + Duration::from_secs(30), |sim| sim.state())
            .await;
        assert!(matches!(state, Some(SimulatorState::Running { .. })));

        // touched at +30s, so still alive at +80s
        assert!(sessions
            .with_session_at(id, now + Duration::from_secs(80), |_| ())
            .await
            .is_some());

        assert!(sessions
            .with_session_at(id, now + Duration::from_secs(200), |_| ())
            .await
            .is_none());
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_drops_only_idle_sessions() {
        let sessions = PreviewSessions::new(Duration::from_secs(60));
        let idle = sessions.insert(simulator()).await;
        let active = sessions.insert(simulator()).await;
        let now = Instant::now();

        sessions
            .with_session_at(active, now + Duration::from_secs(50), |_| ())
            .await
            .unwrap();

        assert_eq!(sessions.sweep_at(now + Duration::from_secs(90)).await, 1);
        assert_eq!(sessions.len().await, 1);
        assert!(sessions.with_session(idle, |_| ()).await.is_none());
        assert!(sessions.with_session(active, |_| ()).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_unknown_session() {
        let sessions = PreviewSessions::new(Duration::from_secs(60));
        assert!(!sessions.remove(Uuid::new_v4()).await);
    }
}
