// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::ChatMessage;
use super::usage::{UsageGate, UsageLimits, UsageTracker};

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub usage: UsageTracker,
    pub last_active: Instant,
}

impl Session {
    pub fn new(id: impl Into<String>, limits: UsageLimits) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            usage: UsageTracker::new(limits),
            last_active: Instant::now(),
        }
    }
}

/// In-memory chat sessions. Nothing here outlives the process.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    limits: UsageLimits,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("limits", &self.limits)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration, limits: UsageLimits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            limits,
        }
    }

    // Create a fresh session and return its id.
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), self.limits);

        let mut guard = self.inner.write().await;
        guard.insert(id.clone(), session);
        id
    }

    // Ensure there's a session with this id.
    pub async fn ensure_session(&self, id: &str) -> String {
        {
            let guard = self.inner.read().await;
            if guard.contains_key(id) {
                return id.to_string();
            }
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id, self.limits));
        id.to_string()
    }

    // Append a message to a session's history and touch last_active.
    pub async fn append_message(
        &self,
        session_id: &str,
        content: impl Into<String>,
        is_from_ai: bool,
    ) -> usize {
        let mut guard = self.inner.write().await;
        let entry = guard
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, self.limits));
        entry.messages.push(ChatMessage::new(content, is_from_ai));
        entry.last_active = Instant::now();
        entry.messages.len()
    }

    /// Get a copy of the session history
    pub async fn get_history(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        let guard = self.inner.read().await;
        guard.get(session_id).map(|s| s.messages.clone())
    }

    /// Copy of the session's usage counters; a fresh tracker for unknown ids.
    pub async fn get_usage(&self, session_id: &str) -> UsageTracker {
        let guard = self.inner.read().await;
        guard
            .get(session_id)
            .map(|s| s.usage.clone())
            .unwrap_or_else(|| UsageTracker::new(self.limits))
    }

    /// Check the session's guards and count the attempt under one write lock.
    /// Unknown sessions get no remote calls.
    pub async fn reserve_call(&self, session_id: &str, now: Instant) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get_mut(session_id) {
            Some(session) if session.usage.can_call(now) => {
                session.usage.record_attempt();
                true
            }
            _ => false,
        }
    }

    pub async fn record_call_success(&self, session_id: &str) {
        let mut guard = self.inner.write().await;
        if let Some(session) = guard.get_mut(session_id) {
            session.usage.record_success();
        }
    }

    pub async fn record_rate_limit(&self, session_id: &str, now: Instant) {
        let mut guard = self.inner.write().await;
        if let Some(session) = guard.get_mut(session_id) {
            session.usage.record_rate_limit(now);
        }
    }

    /// Usage gate bound to one session, for handing to the coach.
    pub fn usage_for<'a>(&'a self, session_id: &'a str) -> SessionUsage<'a> {
        SessionUsage {
            sessions: self,
            session_id,
        }
    }

    /// Remove a session by id
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than ttl. Returns number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, s| now.duration_since(s.last_active) < self.ttl);
        before - guard.len()
    }

    /// Number of sessions
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// List session ids
    pub async fn list_session_ids(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }
}

/// Books remote calls straight into the shared session entry, so concurrent
/// replies on one session never overwrite each other's counters.
pub struct SessionUsage<'a> {
    sessions: &'a SessionManager,
    session_id: &'a str,
}

#[async_trait]
impl<'a> UsageGate for SessionUsage<'a> {
    async fn try_reserve(&mut self, now: Instant) -> bool {
        self.sessions.reserve_call(self.session_id, now).await
    }

    async fn record_success(&mut self) {
        self.sessions.record_call_success(self.session_id).await;
    }

    async fn record_rate_limit(&mut self, now: Instant) {
        self.sessions.record_rate_limit(self.session_id, now).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_session_flow() {
        let mgr = SessionManager::new(Duration::from_secs(60), UsageLimits::default());
        let sid = mgr.create_session().await;
        assert!(!sid.is_empty());
        let len = mgr.append_message(&sid, "hello", false).await;
        assert_eq!(len, 1);
        let history = mgr.get_history(&sid).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_from_ai);
        assert!(mgr.remove_session(&sid).await);
    }
}
