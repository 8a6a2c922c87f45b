//! Razorpay Orders API client

use crate::error::RazorpayError;
use async_trait::async_trait;
use clubpass_core::error::GatewayError;
use clubpass_core::gateway::{GatewayOrder, OrderRequest, PaymentGateway};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.razorpay.com";

/// Razorpay API client
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    api_url: String,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayClient {
    /// Create a client with explicit credentials
    #[must_use]
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point the client at another base URL (sandbox proxies, tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Public key id, as handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| RazorpayError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<GatewayOrder>()
                .await
                .map_err(|e| RazorpayError::ResponseParseFailed(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(RazorpayError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| match (b.error.code, b.error.description) {
                        (Some(code), Some(description)) => Some(format!("{code}: {description}")),
                        (code, description) => description.or(code),
                    })
                    .unwrap_or(body);
                Err(RazorpayError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[tracing::instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount.paise()))]
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let order = Self::create_order(self, &request).await.map_err(|e| {
            tracing::warn!(error = %e, "Razorpay order creation failed");
            GatewayError::from(e)
        })?;
        tracing::debug!(order_id = %order.id, "Razorpay order created");
        Ok(order)
    }
}
