//! Fixed-window rate limiting with temporary blocks.
//!
//! Each (endpoint class, client identifier) pair has its own record:
//!
//! - **Open**: requests are counted inside the current window.
//! - **Window expired**: the next request starts a fresh window with count 1.
//! - **Quota exceeded**: a request arriving when the count already equals
//!   the quota blocks the key for the class's block duration.
//! - **Blocked**: every request is rejected with a retry-after; once the
//!   block expires the next request starts a fresh window.
//!
//! # Example
//!
//! ```
//! use clubpass_core::environment::SystemClock;
//! use clubpass_runtime::rate_limit::{EndpointClass, RateGuard, RateLimitRules};
//! use std::sync::Arc;
//!
//! let guard = RateGuard::in_memory(RateLimitRules::default(), Arc::new(SystemClock));
//! assert!(guard.check(EndpointClass::PaymentCreate, "203.0.113.7").is_allowed());
//! ```

use crate::store::InMemoryStateStore;
use chrono::{DateTime, Duration, Utc};
use clubpass_core::environment::Clock;
use clubpass_core::error::BookingError;
use clubpass_core::state_store::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Group of endpoints sharing one quota.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointClass {
    /// Order creation
    PaymentCreate,
    /// Checkout verification
    PaymentVerify,
    /// Sign in
    AuthSignin,
    /// Sign up
    AuthSignup,
    /// Everything else
    ApiGeneral,
}

impl EndpointClass {
    /// All classes.
    pub const ALL: [Self; 5] = [
        Self::PaymentCreate,
        Self::PaymentVerify,
        Self::AuthSignin,
        Self::AuthSignup,
        Self::ApiGeneral,
    ];

    /// Stable name, used in keys, config and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentCreate => "payment-create",
            Self::PaymentVerify => "payment-verify",
            Self::AuthSignin => "auth-signin",
            Self::AuthSignup => "auth-signup",
            Self::ApiGeneral => "api-general",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota, window and block duration for one class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
    /// How long a key stays blocked after exceeding the quota
    pub block_duration: Duration,
}

impl RateLimitRule {
    /// Create a rule from whole seconds.
    #[must_use]
    pub fn from_secs(max_requests: u32, window_secs: i64, block_secs: i64) -> Self {
        Self {
            max_requests,
            window: Duration::seconds(window_secs),
            block_duration: Duration::seconds(block_secs),
        }
    }

    /// Default rule for a class.
    #[must_use]
    pub fn default_for(class: EndpointClass) -> Self {
        match class {
            EndpointClass::PaymentCreate => Self::from_secs(3, 60, 300),
            EndpointClass::PaymentVerify => Self::from_secs(5, 60, 180),
            EndpointClass::AuthSignin => Self::from_secs(5, 300, 900),
            EndpointClass::AuthSignup => Self::from_secs(3, 300, 1800),
            EndpointClass::ApiGeneral => Self::from_secs(60, 60, 60),
        }
    }
}

/// Rules for every class; classes without an override use the defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RateLimitRules {
    overrides: HashMap<EndpointClass, RateLimitRule>,
}

impl RateLimitRules {
    /// Override the rule for one class.
    #[must_use]
    pub fn with_rule(mut self, class: EndpointClass, rule: RateLimitRule) -> Self {
        self.overrides.insert(class, rule);
        self
    }

    /// Effective rule for a class.
    #[must_use]
    pub fn get(&self, class: EndpointClass) -> RateLimitRule {
        self.overrides
            .get(&class)
            .copied()
            .unwrap_or_else(|| RateLimitRule::default_for(class))
    }
}

/// Key of one rate-limit record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RateKey {
    /// Endpoint class
    pub class: EndpointClass,
    /// Client identifier (IP, user id, email)
    pub identifier: String,
}

/// Counter state for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests counted in the current window
    pub count: u32,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
    /// Set while the key is blocked
    pub blocked_until: Option<DateTime<Utc>>,
}

impl RateLimitRecord {
    fn fresh(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
            blocked_until: None,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at && self.blocked_until.is_none_or(|until| now >= until)
    }
}

/// Outcome of a rate-limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    /// Request counted and allowed.
    Allowed {
        /// Requests left in the window
        remaining: u32,
        /// When the window ends
        reset_at: DateTime<Utc>,
    },
    /// Request rejected.
    Limited {
        /// Seconds until the block lifts (≥ 1)
        retry_after_secs: u64,
        /// When the block lifts
        blocked_until: DateTime<Utc>,
    },
}

impl RateDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Convert into a service result.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::RateLimited`] when the request was rejected.
    pub fn into_result(self) -> Result<(), BookingError> {
        match self {
            Self::Allowed { .. } => Ok(()),
            Self::Limited {
                retry_after_secs, ..
            } => Err(BookingError::RateLimited { retry_after_secs }),
        }
    }
}

/// Whole seconds until `delta` elapses, rounded up, at least 1.
#[must_use]
pub fn ceil_secs(delta: Duration) -> u64 {
    let millis = delta.num_milliseconds().max(0);
    u64::try_from((millis + 999) / 1000).unwrap_or(1).max(1)
}

/// Per-key rate limiter with temporary blocks.
pub struct RateGuard<S = InMemoryStateStore<RateKey, RateLimitRecord>> {
    store: S,
    rules: Arc<RateLimitRules>,
    clock: Arc<dyn Clock>,
}

impl RateGuard {
    /// Guard backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(rules: RateLimitRules, clock: Arc<dyn Clock>) -> Self {
        Self::new(InMemoryStateStore::new(), rules, clock)
    }
}

impl<S> RateGuard<S>
where
    S: StateStore<RateKey, RateLimitRecord>,
{
    /// Create a guard over `store`.
    #[must_use]
    pub fn new(store: S, rules: RateLimitRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rules: Arc::new(rules),
            clock,
        }
    }

    /// Count a request and decide whether it may proceed.
    pub fn check(&self, class: EndpointClass, identifier: &str) -> RateDecision {
        let rule = self.rules.get(class);
        let now = self.clock.now();
        let key = RateKey {
            class,
            identifier: identifier.to_string(),
        };

        let decision = self.store.update(key, |record| match record {
            Some(record) if record.blocked_until.is_some_and(|until| now < until) => {
                let blocked_until = record.blocked_until.unwrap_or(now);
                let decision = RateDecision::Limited {
                    retry_after_secs: ceil_secs(blocked_until - now),
                    blocked_until,
                };
                (Some(record), decision)
            }
            Some(mut record) if record.blocked_until.is_none() && now < record.reset_at => {
                if record.count >= rule.max_requests {
                    let blocked_until = now + rule.block_duration;
                    record.blocked_until = Some(blocked_until);
                    metrics::counter!("clubpass_rate_limit_blocks_total", "class" => class.as_str())
                        .increment(1);
                    tracing::warn!(
                        class = %class,
                        identifier = %identifier,
                        blocked_until = %blocked_until,
                        "Rate limit exceeded, blocking client"
                    );
                    let decision = RateDecision::Limited {
                        retry_after_secs: ceil_secs(rule.block_duration),
                        blocked_until,
                    };
                    (Some(record), decision)
                } else {
                    record.count += 1;
                    let decision = RateDecision::Allowed {
                        remaining: rule.max_requests.saturating_sub(record.count),
                        reset_at: record.reset_at,
                    };
                    (Some(record), decision)
                }
            }
            // No record, window over, or block lifted.
            _ => {
                let record = RateLimitRecord::fresh(now, rule.window);
                let decision = RateDecision::Allowed {
                    remaining: rule.max_requests.saturating_sub(1),
                    reset_at: record.reset_at,
                };
                (Some(record), decision)
            }
        });

        if let RateDecision::Limited { .. } = decision {
            metrics::counter!("clubpass_rate_limit_rejections_total", "class" => class.as_str())
                .increment(1);
        }
        decision
    }

    /// Remove records whose window and block have both expired.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        self.store.retain(|_, record| !record.is_expired(now))
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clubpass_testing::ManualClock;

    fn guard(clock: &ManualClock) -> RateGuard {
        RateGuard::in_memory(RateLimitRules::default(), Arc::new(clock.clone()))
    }

    #[test]
    fn test_quota_plus_one_is_rejected() {
        let clock = ManualClock::default();
        let guard = guard(&clock);

        for _ in 0..3 {
            assert!(guard.check(EndpointClass::PaymentCreate, "ip").is_allowed());
        }
        match guard.check(EndpointClass::PaymentCreate, "ip") {
            RateDecision::Limited {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 300),
            RateDecision::Allowed { .. } => panic!("fourth request should be limited"),
        }
    }

    #[test]
    fn test_blocked_key_reports_shrinking_retry_after() {
        let clock = ManualClock::default();
        let guard = guard(&clock);
        for _ in 0..4 {
            guard.check(EndpointClass::PaymentVerify, "ip");
        }
        for _ in 0..5 {
            guard.check(EndpointClass::PaymentVerify, "ip");
        }

        clock.advance(Duration::milliseconds(100_500));
        match guard.check(EndpointClass::PaymentVerify, "ip") {
            RateDecision::Limited {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 80),
            RateDecision::Allowed { .. } => panic!("still blocked"),
        }
    }

    #[test]
    fn test_block_expiry_opens_fresh_window() {
        let clock = ManualClock::default();
        let guard = guard(&clock);
        for _ in 0..4 {
            guard.check(EndpointClass::PaymentCreate, "ip");
        }
        clock.advance(Duration::seconds(300));

        match guard.check(EndpointClass::PaymentCreate, "ip") {
            RateDecision::Allowed { remaining, .. } => assert_eq!(remaining, 2),
            RateDecision::Limited { .. } => panic!("block should have expired"),
        }
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let clock = ManualClock::default();
        let guard = guard(&clock);
        for _ in 0..3 {
            guard.check(EndpointClass::PaymentCreate, "ip");
        }
        clock.advance(Duration::seconds(60));
        assert!(guard.check(EndpointClass::PaymentCreate, "ip").is_allowed());
    }

    #[test]
    fn test_classes_and_identifiers_are_independent() {
        let clock = ManualClock::default();
        let guard = guard(&clock);
        for _ in 0..4 {
            guard.check(EndpointClass::PaymentCreate, "a");
        }
        assert!(guard.check(EndpointClass::PaymentCreate, "b").is_allowed());
        assert!(guard.check(EndpointClass::PaymentVerify, "a").is_allowed());
    }

    #[test]
    fn test_overridden_rule() {
        let clock = ManualClock::default();
        let rules = RateLimitRules::default()
            .with_rule(EndpointClass::ApiGeneral, RateLimitRule::from_secs(1, 10, 5));
        let guard = RateGuard::in_memory(rules, Arc::new(clock.clone()));

        assert!(guard.check(EndpointClass::ApiGeneral, "ip").is_allowed());
        let err = guard
            .check(EndpointClass::ApiGeneral, "ip")
            .into_result()
            .unwrap_err();
        assert!(matches!(err, BookingError::RateLimited { retry_after_secs: 5 }));
    }

    #[test]
    fn test_sweep_keeps_blocked_and_active_records() {
        let clock = ManualClock::default();
        let guard = guard(&clock);
        guard.check(EndpointClass::ApiGeneral, "idle");
        for _ in 0..4 {
            guard.check(EndpointClass::PaymentCreate, "blocked");
        }

        clock.advance(Duration::seconds(61));
        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.tracked_keys(), 1);

        clock.advance(Duration::seconds(300));
        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.tracked_keys(), 0);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::milliseconds(1)), 1);
        assert_eq!(ceil_secs(Duration::milliseconds(1001)), 2);
        assert_eq!(ceil_secs(Duration::seconds(60)), 60);
        assert_eq!(ceil_secs(Duration::zero()), 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_exactly_quota_requests_pass(quota in 1u32..50, window in 1i64..600, block in 1i64..3600) {
            let clock = ManualClock::default();
            let rules = RateLimitRules::default()
                .with_rule(EndpointClass::ApiGeneral, RateLimitRule::from_secs(quota, window, block));
            let guard = RateGuard::in_memory(rules, Arc::new(clock.clone()));

            for _ in 0..quota {
                proptest::prop_assert!(guard.check(EndpointClass::ApiGeneral, "ip").is_allowed());
            }
            match guard.check(EndpointClass::ApiGeneral, "ip") {
                RateDecision::Limited { retry_after_secs, .. } => {
                    proptest::prop_assert_eq!(retry_after_secs, u64::try_from(block).unwrap());
                }
                RateDecision::Allowed { .. } => proptest::prop_assert!(false, "quota + 1 allowed"),
            }
        }
    }
}
