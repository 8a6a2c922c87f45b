//! Doubles for external services.

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use clubpass_core::auth::{AuthProvider, AuthSession, AuthUser};
use clubpass_core::error::{AuthError, GatewayError};
use clubpass_core::gateway::{GatewayOrder, OrderRequest, PaymentGateway};
use clubpass_core::types::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Gateway that issues `order_test_N` ids and records every request.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    requests: Arc<Mutex<Vec<OrderRequest>>>,
    next_id: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MockPaymentGateway {
    /// Gateway that accepts every order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with a gateway rejection.
    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, including failed ones.
    #[must_use]
    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of orders requested.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "simulated gateway rejection".to_string(),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: request.amount,
            currency: request.currency,
            receipt: Some(request.receipt),
            status: "created".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

/// Auth provider backed by a token table and an account table.
#[derive(Clone, Debug, Default)]
pub struct MockAuthProvider {
    tokens: Arc<Mutex<HashMap<String, AuthUser>>>,
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl MockAuthProvider {
    /// Provider with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; returns the bearer token for it.
    pub fn issue_token(&self, user: AuthUser) -> String {
        let token = format!("token-{}", user.id);
        self.tokens.lock().unwrap().insert(token.clone(), user);
        token
    }

    /// Convenience: a session for a fresh user with `email`.
    pub fn login_as(&self, id: UserId, email: &str) -> String {
        self.issue_token(AuthUser {
            id,
            email: email.to_string(),
        })
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn sign_up(&self, email: &str, password: &str, _full_name: &str) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        let user = AuthUser {
            id: UserId::new(),
            email: email.to_string(),
        };
        accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let account = self
            .accounts
            .lock()
            .unwrap()
            .get(email)
            .filter(|a| a.password == password)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        let access_token = self.issue_token(account.user.clone());
        Ok(AuthSession {
            access_token,
            refresh_token: format!("refresh-{}", account.user.id),
            expires_in: 3600,
            user: account.user,
        })
    }
}
