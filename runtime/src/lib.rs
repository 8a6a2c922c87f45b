//! # Clubpass Runtime
//!
//! Stateful, in-process machinery shared by the booking handlers.
//!
//! ## Core Components
//!
//! - **State store**: [`store::InMemoryStateStore`], the default
//!   [`clubpass_core::state_store::StateStore`]
//! - **Rate guard**: fixed-window quotas with temporary blocks per endpoint
//!   class and client
//! - **Activity detector**: burst, automation and path-traversal heuristics
//! - **Payment security**: amount checks and attempt-pattern scoring
//! - **Ledgers**: payment attempt and gateway order deduplication
//! - **Sweeper**: owned background cleanup with explicit start and shutdown
//! - **Metrics**: Prometheus recorder and metric descriptions
//!
//! Every guard keeps its state per process. Running several instances
//! behind a load balancer multiplies the effective quotas unless a shared
//! store is plugged in.

pub mod activity;
pub mod ledger;
pub mod metrics;
pub mod payment_security;
pub mod rate_limit;
pub mod store;
pub mod sweeper;

pub use activity::{ActivityDetector, RiskLevel};
pub use ledger::{AttemptKey, AttemptStatus, LedgerConfig, OrderLedger, PaymentAttemptLedger};
pub use payment_security::{PaymentSecurity, PaymentSecurityConfig};
pub use rate_limit::{EndpointClass, RateGuard, RateLimitRule, RateLimitRules};
pub use store::InMemoryStateStore;
pub use sweeper::{Sweep, Sweeper, SweeperHandle};
