//! Payment attempt and gateway order ledgers.
//!
//! One attempt is tracked per (user, event, amount). An attempt moves
//! `pending → processing → completed | failed`. Completed keys stay as
//! tombstones for the completed retention so the same payment cannot be
//! started twice; failed attempts linger briefly to enforce a retry delay.
//!
//! Both ledgers are advisory, in-process guards. The booking row remains the
//! source of truth for payment state.

use crate::store::InMemoryStateStore;
use chrono::{DateTime, Duration, Utc};
use clubpass_core::environment::Clock;
use clubpass_core::error::BookingError;
use clubpass_core::state_store::StateStore;
use clubpass_core::types::{EventId, Money, UserId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Identity of one payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    /// Paying user
    pub user_id: UserId,
    /// Event being booked
    pub event_id: EventId,
    /// Server-computed amount
    pub amount: Money,
}

impl AttemptKey {
    /// Build a key.
    #[must_use]
    pub const fn new(user_id: UserId, event_id: EventId, amount: Money) -> Self {
        Self {
            user_id,
            event_id,
            amount,
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.event_id, self.amount.paise())
    }
}

/// Progress of an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Registered, gateway not yet called
    Pending,
    /// Gateway order issued, waiting for confirmation
    Processing,
    /// Payment confirmed
    Completed,
    /// Payment failed
    Failed,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// A tracked attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentAttempt {
    /// Attempt key
    pub key: AttemptKey,
    /// When the attempt was registered
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// Gateway order id, once issued
    pub order_id: Option<String>,
    /// Gateway payment id, once known
    pub payment_id: Option<String>,
    /// Current status (never `Completed`; those become tombstones)
    pub status: AttemptStatus,
}

/// Ledger entry: a live attempt or a completed tombstone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Attempt in flight or recently failed
    Attempt(PaymentAttempt),
    /// Payment completed at this time
    Completed(DateTime<Utc>),
}

/// Timing knobs for both ledgers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// An in-flight attempt younger than this blocks a new one
    pub duplicate_window: Duration,
    /// A failure younger than this blocks a retry
    pub retry_delay: Duration,
    /// Failed attempts are swept after this long
    pub failed_cleanup: Duration,
    /// Any attempt older than this is swept
    pub stale_attempt_age: Duration,
    /// Completed tombstones are swept after this long
    pub completed_retention: Duration,
    /// Window for the "recent attempts" statistic
    pub stats_window: Duration,
    /// A gateway order younger than this is reused as a duplicate
    pub order_window: Duration,
    /// Gateway order records are swept after this long
    pub order_retention: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            duplicate_window: Duration::minutes(5),
            retry_delay: Duration::seconds(30),
            failed_cleanup: Duration::seconds(60),
            stale_attempt_age: Duration::hours(6),
            completed_retention: Duration::hours(24),
            stats_window: Duration::hours(1),
            order_window: Duration::minutes(5),
            order_retention: Duration::hours(1),
        }
    }
}

/// Result of a duplicate check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DuplicateCheck {
    /// No conflicting attempt.
    Clear,
    /// A conflicting attempt exists.
    Duplicate {
        /// Client-facing reason
        reason: String,
        /// The conflicting attempt, if it is still live
        existing: Option<PaymentAttempt>,
    },
}

impl DuplicateCheck {
    /// Whether the check found a conflict.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    fn into_error(self) -> Option<BookingError> {
        match self {
            Self::Clear => None,
            Self::Duplicate { reason, existing } => Some(BookingError::Duplicate {
                reason,
                existing_order_id: existing.and_then(|a| a.order_id),
            }),
        }
    }
}

/// Snapshot counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    /// Live attempts
    pub total_attempts: usize,
    /// Attempts still pending
    pub pending_attempts: usize,
    /// Completed tombstones
    pub completed_payments: usize,
    /// Failed attempts awaiting cleanup
    pub failed_attempts: usize,
    /// Live attempts created inside the stats window
    pub recent_attempts: usize,
}

/// Tracks payment attempts per (user, event, amount).
pub struct PaymentAttemptLedger<S = InMemoryStateStore<AttemptKey, LedgerEntry>> {
    store: S,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
}

impl PaymentAttemptLedger {
    /// Ledger backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(InMemoryStateStore::new(), config, clock)
    }
}

impl<S> PaymentAttemptLedger<S>
where
    S: StateStore<AttemptKey, LedgerEntry>,
{
    /// Create a ledger over `store`.
    #[must_use]
    pub const fn new(store: S, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Whether a new attempt for `key` would conflict with an existing one.
    #[must_use]
    pub fn check_duplicate(&self, key: &AttemptKey) -> DuplicateCheck {
        let now = self.clock.now();
        self.store
            .get(key)
            .map_or(DuplicateCheck::Clear, |entry| self.classify(&entry, now))
    }

    fn classify(&self, entry: &LedgerEntry, now: DateTime<Utc>) -> DuplicateCheck {
        match entry {
            LedgerEntry::Completed(_) => DuplicateCheck::Duplicate {
                reason: "Payment already completed for this booking".to_string(),
                existing: None,
            },
            LedgerEntry::Attempt(attempt) => match attempt.status {
                AttemptStatus::Pending | AttemptStatus::Processing
                    if now - attempt.created_at < self.config.duplicate_window =>
                {
                    DuplicateCheck::Duplicate {
                        reason: format!("Payment attempt already in progress ({})", attempt.status),
                        existing: Some(attempt.clone()),
                    }
                }
                AttemptStatus::Failed if now - attempt.updated_at < self.config.retry_delay => {
                    DuplicateCheck::Duplicate {
                        reason: "Recent payment attempt failed, please wait before retrying"
                            .to_string(),
                        existing: Some(attempt.clone()),
                    }
                }
                _ => DuplicateCheck::Clear,
            },
        }
    }

    /// Insert a `pending` attempt, overwriting any existing entry.
    pub fn register(&self, key: AttemptKey, order_id: Option<String>) {
        let now = self.clock.now();
        self.store.insert(
            key.clone(),
            LedgerEntry::Attempt(PaymentAttempt {
                key,
                created_at: now,
                updated_at: now,
                order_id,
                payment_id: None,
                status: AttemptStatus::Pending,
            }),
        );
    }

    /// Check and register in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Duplicate`] if a conflicting attempt exists;
    /// the ledger is left unchanged in that case.
    pub fn begin(&self, key: AttemptKey) -> Result<(), BookingError> {
        let now = self.clock.now();
        let attempt_key = key.clone();
        let outcome = self.store.update(key, |entry| {
            if let Some(entry) = entry {
                let check = self.classify(&entry, now);
                if check.is_duplicate() {
                    return (Some(entry), check);
                }
            }
            let attempt = PaymentAttempt {
                key: attempt_key,
                created_at: now,
                updated_at: now,
                order_id: None,
                payment_id: None,
                status: AttemptStatus::Pending,
            };
            (Some(LedgerEntry::Attempt(attempt)), DuplicateCheck::Clear)
        });

        outcome.into_error().map_or(Ok(()), Err)
    }

    /// Drop a `pending` attempt that never reached the gateway.
    pub fn release(&self, key: &AttemptKey) {
        self.store.update(key.clone(), |entry| match entry {
            Some(LedgerEntry::Attempt(attempt)) if attempt.status == AttemptStatus::Pending => {
                (None, ())
            }
            other => (other, ()),
        });
    }

    /// Record the gateway order and move the attempt to `processing`.
    pub fn mark_processing(&self, key: &AttemptKey, order_id: &str) {
        let now = self.clock.now();
        self.store.update(key.clone(), |entry| match entry {
            Some(LedgerEntry::Attempt(mut attempt)) => {
                attempt.order_id = Some(order_id.to_string());
                attempt.status = AttemptStatus::Processing;
                attempt.updated_at = now;
                (Some(LedgerEntry::Attempt(attempt)), ())
            }
            other => (other, ()),
        });
    }

    /// Move an attempt to `status`.
    ///
    /// `Completed` replaces the attempt with a tombstone. `Failed` keeps it
    /// until the next sweep after the cleanup delay. Unknown keys are
    /// ignored.
    pub fn update_status(&self, key: &AttemptKey, status: AttemptStatus, payment_id: Option<String>) {
        let now = self.clock.now();
        self.store.update(key.clone(), |entry| match entry {
            Some(LedgerEntry::Attempt(_)) if status == AttemptStatus::Completed => {
                (Some(LedgerEntry::Completed(now)), ())
            }
            Some(LedgerEntry::Attempt(mut attempt)) => {
                attempt.status = status;
                attempt.updated_at = now;
                if payment_id.is_some() {
                    attempt.payment_id = payment_id;
                }
                (Some(LedgerEntry::Attempt(attempt)), ())
            }
            other => (other, ()),
        });
    }

    /// Copies of all live attempts.
    #[must_use]
    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        self.store
            .values()
            .into_iter()
            .filter_map(|entry| match entry {
                LedgerEntry::Attempt(attempt) => Some(attempt),
                LedgerEntry::Completed(_) => None,
            })
            .collect()
    }

    /// Monitoring counters.
    #[must_use]
    pub fn stats(&self) -> AttemptStats {
        let now = self.clock.now();
        let mut stats = AttemptStats::default();
        for entry in self.store.values() {
            match entry {
                LedgerEntry::Completed(_) => stats.completed_payments += 1,
                LedgerEntry::Attempt(attempt) => {
                    stats.total_attempts += 1;
                    match attempt.status {
                        AttemptStatus::Pending => stats.pending_attempts += 1,
                        AttemptStatus::Failed => stats.failed_attempts += 1,
                        AttemptStatus::Processing | AttemptStatus::Completed => {}
                    }
                    if now - attempt.created_at < self.config.stats_window {
                        stats.recent_attempts += 1;
                    }
                }
            }
        }
        stats
    }

    /// Remove expired tombstones, failed attempts past the cleanup delay and
    /// attempts older than the stale age.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let config = &self.config;
        self.store.retain(|_, entry| match entry {
            LedgerEntry::Completed(at) => now - *at < config.completed_retention,
            LedgerEntry::Attempt(attempt) => {
                let failed_expired = attempt.status == AttemptStatus::Failed
                    && now - attempt.updated_at >= config.failed_cleanup;
                let stale = now - attempt.created_at > config.stale_attempt_age;
                !(failed_expired || stale)
            }
        })
    }
}

/// Gateway order issued for an attempt key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRecord {
    /// Gateway order id
    pub order_id: String,
    /// When it was issued
    pub created_at: DateTime<Utc>,
}

/// Remembers recently issued gateway orders per attempt key.
pub struct OrderLedger<S = InMemoryStateStore<AttemptKey, OrderRecord>> {
    store: S,
    window: Duration,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl OrderLedger {
    /// Ledger backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: &LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(InMemoryStateStore::new(), config, clock)
    }
}

impl<S> OrderLedger<S>
where
    S: StateStore<AttemptKey, OrderRecord>,
{
    /// Create a ledger over `store`.
    #[must_use]
    pub const fn new(store: S, config: &LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            window: config.order_window,
            retention: config.order_retention,
            clock,
        }
    }

    /// Order id issued for `key` inside the dedup window, if any.
    #[must_use]
    pub fn check_duplicate_order(&self, key: &AttemptKey) -> Option<String> {
        let now = self.clock.now();
        self.store
            .get(key)
            .filter(|record| now - record.created_at < self.window)
            .map(|record| record.order_id)
    }

    /// Remember an issued order.
    pub fn register_order(&self, key: AttemptKey, order_id: &str) {
        self.store.insert(
            key,
            OrderRecord {
                order_id: order_id.to_string(),
                created_at: self.clock.now(),
            },
        );
    }

    /// Remove records older than the retention.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let retention = self.retention;
        self.store
            .retain(|_, record| now - record.created_at < retention)
    }
}
