//! # Booking
//!
//! Club night ticket booking and payment service.
//!
//! A signed-in user builds a multi-tier cart (women, couple, stag) for an
//! event; the service recomputes the total, creates a Razorpay order and a
//! `pending` booking, and later confirms or fails that booking from either
//! the signed checkout callback or a signed webhook, whichever arrives first.
//!
//! ## Layout
//!
//! - [`app`]: the payment services over injected collaborators and guards
//! - [`api`]: Axum handlers
//! - [`auth`]: bearer-token sessions and the Supabase Auth client
//! - [`server`]: state, router, readiness and shutdown
//! - [`config`]: environment configuration
//!
//! ## Running
//!
//! ```bash
//! export RAZORPAY_KEY_ID=rzp_test_xxx RAZORPAY_KEY_SECRET=... RAZORPAY_WEBHOOK_SECRET=...
//! export SUPABASE_URL=https://project.supabase.co SUPABASE_ANON_KEY=...
//! cargo run --bin server
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod server;

pub use config::{Config, ConfigError};
pub use server::{AppState, build_router};
