// src/services/usage.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    pub max_calls_per_session: u32,
    pub cooldown: Duration,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            max_calls_per_session: 50,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Remote-call bookkeeping for one session or one stateless request.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    limits: UsageLimits,
    api_call_count: u32,
    successful_call_count: u32,
    last_rate_limit_at: Option<Instant>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub api_call_count: u32,
    pub successful_call_count: u32,
    pub max_calls_per_session: u32,
    pub in_cooldown: bool,
}

impl UsageTracker {
    pub fn new(limits: UsageLimits) -> Self {
        Self {
            limits,
            api_call_count: 0,
            successful_call_count: 0,
            last_rate_limit_at: None,
        }
    }

    pub fn api_call_count(&self) -> u32 {
        self.api_call_count
    }

    pub fn successful_call_count(&self) -> u32 {
        self.successful_call_count
    }

    pub fn is_in_rate_limit_cooldown(&self, now: Instant) -> bool {
        self.last_rate_limit_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.limits.cooldown)
    }

    pub fn is_api_disabled_for_session(&self) -> bool {
        self.api_call_count >= self.limits.max_calls_per_session
    }

    pub fn can_call(&self, now: Instant) -> bool {
        !self.is_api_disabled_for_session() && !self.is_in_rate_limit_cooldown(now)
    }

    pub fn record_attempt(&mut self) {
        self.api_call_count = self.api_call_count.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.successful_call_count = self.successful_call_count.saturating_add(1);
    }

    pub fn record_rate_limit(&mut self, now: Instant) {
        self.last_rate_limit_at = Some(now);
    }

    pub fn snapshot(&self, now: Instant) -> UsageSnapshot {
        UsageSnapshot {
            api_call_count: self.api_call_count,
            successful_call_count: self.successful_call_count,
            max_calls_per_session: self.limits.max_calls_per_session,
            in_cooldown: self.is_in_rate_limit_cooldown(now),
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(UsageLimits::default())
    }
}

/// Where the coach books remote calls. A reservation checks the guards and
/// counts the attempt in one step, outcomes are applied afterwards.
#[async_trait]
pub trait UsageGate: Send {
    async fn try_reserve(&mut self, now: Instant) -> bool;
    async fn record_success(&mut self);
    async fn record_rate_limit(&mut self, now: Instant);
}

#[async_trait]
impl UsageGate for UsageTracker {
    async fn try_reserve(&mut self, now: Instant) -> bool {
        if !self.can_call(now) {
            return false;
        }
        self.record_attempt();
        true
    }

    async fn record_success(&mut self) {
        UsageTracker::record_success(self);
    }

    async fn record_rate_limit(&mut self, now: Instant) {
        UsageTracker::record_rate_limit(self, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_expires() {
        let mut usage = UsageTracker::new(UsageLimits {
            max_calls_per_session: 10,
            cooldown: Duration::from_secs(30),
        });
        let t0 = Instant::now();
        assert!(!usage.is_in_rate_limit_cooldown(t0));
        usage.record_rate_limit(t0);
        assert!(usage.is_in_rate_limit_cooldown(t0 + Duration::from_secs(29)));
        assert!(!usage.is_in_rate_limit_cooldown(t0 + Duration::from_secs(30)));
        assert!(!usage.can_call(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn session_budget_disables_api() {
        let mut usage = UsageTracker::new(UsageLimits {
            max_calls_per_session: 2,
            cooldown: Duration::from_secs(30),
        });
        usage.record_attempt();
        usage.record_success();
        assert!(!usage.is_api_disabled_for_session());
        usage.record_attempt();
        assert!(usage.is_api_disabled_for_session());
        assert!(!usage.can_call(Instant::now()));
        assert_eq!(usage.successful_call_count(), 1);
    }

    #[tokio::test]
    async fn reservation_counts_the_attempt() {
        let mut usage = UsageTracker::new(UsageLimits {
            max_calls_per_session: 1,
            cooldown: Duration::from_secs(30),
        });
        let now = Instant::now();
        assert!(usage.try_reserve(now).await);
        assert_eq!(usage.api_call_count(), 1);
        assert!(!usage.try_reserve(now).await);
        assert_eq!(usage.api_call_count(), 1);
    }
}
