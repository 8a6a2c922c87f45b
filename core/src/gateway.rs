//! Payment gateway abstraction.
//!
//! Only order creation goes through the gateway at runtime. Checkout and
//! webhook confirmations arrive as signed callbacks and are verified
//! locally.

use crate::error::GatewayError;
use crate::types::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Order to create at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in minor units
    pub amount: Money,
    /// ISO currency code
    pub currency: String,
    /// Merchant receipt (≤ 40 chars)
    pub receipt: String,
    /// Free-form notes stored with the order
    pub notes: BTreeMap<String, String>,
}

/// Order as issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id (`order_…`)
    pub id: String,
    /// Amount in minor units
    pub amount: Money,
    /// ISO currency code
    pub currency: String,
    /// Receipt echoed back
    pub receipt: Option<String>,
    /// Gateway-side status (`created`, `attempted`, `paid`)
    pub status: String,
}

/// Payment processor that issues orders.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order the client can pay through the checkout widget.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the gateway is unreachable or refuses.
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError>;
}
