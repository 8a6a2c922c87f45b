//! # Razorpay
//!
//! Client for the parts of Razorpay the booking core touches.
//!
//! ## Example
//!
//! ```no_run
//! use clubpass_razorpay::RazorpayClient;
//! use clubpass_core::gateway::OrderRequest;
//! use clubpass_core::types::Money;
//! use std::collections::BTreeMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RazorpayClient::new("rzp_test_key", "key_secret");
//!
//!     let order = client
//!         .create_order(&OrderRequest {
//!             amount: Money::from_paise(190_000),
//!             currency: "INR".to_string(),
//!             receipt: "CTH_1a2b3c4d_5e6f7a8b_1735689600000".to_string(),
//!             notes: BTreeMap::new(),
//!         })
//!         .await?;
//!
//!     println!("Order: {}", order.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Orders API (`POST /v1/orders`) behind the
//!   [`PaymentGateway`](clubpass_core::gateway::PaymentGateway) trait
//! - Checkout and webhook signature checks
//! - Typed webhook events

pub mod client;
pub mod error;
pub mod signature;
pub mod webhook;

pub use client::RazorpayClient;
pub use error::RazorpayError;
pub use signature::{verify_payment_signature, verify_webhook_signature};
pub use webhook::WebhookEvent;
