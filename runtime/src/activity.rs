//! Suspicious request heuristics.
//!
//! Advisory only: callers decide what to do with the risk level. The order
//! endpoint hard-rejects [`RiskLevel::High`] and lets everything else pass.

use crate::store::InMemoryStateStore;
use chrono::{DateTime, Duration, Utc};
use clubpass_core::environment::Clock;
use clubpass_core::state_store::StateStore;
use serde::Serialize;
use std::sync::Arc;

/// Risk attached to a request or payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Nothing unusual
    Low,
    /// One signal
    Medium,
    /// Strong or multiple signals
    High,
}

impl RiskLevel {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Result of inspecting one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityAssessment {
    /// Risk level
    pub risk: RiskLevel,
    /// What triggered it
    pub reason: Option<&'static str>,
}

impl ActivityAssessment {
    const fn low() -> Self {
        Self {
            risk: RiskLevel::Low,
            reason: None,
        }
    }

    /// Whether any heuristic fired.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        self.reason.is_some()
    }
}

/// Detector thresholds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityConfig {
    /// Sliding window for the burst check
    pub window: Duration,
    /// More requests than this inside the window is a burst
    pub rapid_request_threshold: usize,
    /// Case-insensitive user-agent fragments that flag automation
    pub suspicious_agents: Vec<String>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window: Duration::seconds(30),
            rapid_request_threshold: 20,
            suspicious_agents: ["bot", "crawler", "scraper", "automated"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Tracks request timestamps per identifier and flags odd traffic.
pub struct ActivityDetector<S = InMemoryStateStore<String, Vec<DateTime<Utc>>>> {
    store: S,
    config: ActivityConfig,
    clock: Arc<dyn Clock>,
}

impl ActivityDetector {
    /// Detector backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: ActivityConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(InMemoryStateStore::new(), config, clock)
    }
}

impl<S> ActivityDetector<S>
where
    S: StateStore<String, Vec<DateTime<Utc>>>,
{
    /// Create a detector over `store`.
    #[must_use]
    pub const fn new(store: S, config: ActivityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Record a request and assess it.
    ///
    /// Checks run in order and the first hit wins: burst (high), automation
    /// user agent (medium), path traversal (high).
    pub fn record(
        &self,
        identifier: &str,
        user_agent: Option<&str>,
        path: Option<&str>,
    ) -> ActivityAssessment {
        let now = self.clock.now();
        let window = self.config.window;

        let recent = self.store.update(identifier.to_string(), |timestamps| {
            let mut timestamps: Vec<_> = timestamps
                .unwrap_or_default()
                .into_iter()
                .filter(|at| now - *at < window)
                .collect();
            timestamps.push(now);
            let count = timestamps.len();
            (Some(timestamps), count)
        });

        if recent > self.config.rapid_request_threshold {
            return ActivityAssessment {
                risk: RiskLevel::High,
                reason: Some("Rapid successive requests detected"),
            };
        }

        if let Some(agent) = user_agent {
            let agent = agent.to_lowercase();
            if self
                .config
                .suspicious_agents
                .iter()
                .any(|fragment| agent.contains(fragment.as_str()))
            {
                return ActivityAssessment {
                    risk: RiskLevel::Medium,
                    reason: Some("Suspicious user agent detected"),
                };
            }
        }

        if path.is_some_and(|p| p.contains("..")) {
            return ActivityAssessment {
                risk: RiskLevel::High,
                reason: Some("Path traversal attempt detected"),
            };
        }

        ActivityAssessment::low()
    }

    /// Drop identifiers with no request inside the window.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window;
        self.store
            .retain(|_, timestamps| timestamps.iter().any(|at| now - *at < window))
    }
}
