//! HTTP tests for the booking router over in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use booking::app::Collaborators;
use booking::server::{AppState, ReadinessCheck};
use booking::{Config, build_router};
use clubpass_core::environment::Clock;
use clubpass_core::repository::ProfileRepository;
use clubpass_core::types::{BookingId, BookingStatus, Event, Profile, UserId};
use clubpass_razorpay::signature::{WEBHOOK_SIGNATURE_HEADER, sign_payment, sign_webhook};
use clubpass_testing::{
    InMemoryBookingRepository, InMemoryEventRepository, InMemoryProfileRepository, ManualClock,
    MockAuthProvider, MockPaymentGateway, fixtures,
};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;

const KEY_SECRET: &str = "http_key_secret";
const WEBHOOK_SECRET: &str = "http_webhook_secret";
const USER_AGENT: &str = "Mozilla/5.0 (HTTP test)";

struct Ready(bool);

#[async_trait]
impl ReadinessCheck for Ready {
    async fn check(&self) -> Result<(), String> {
        if self.0 {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

struct App {
    server: TestServer,
    bookings: InMemoryBookingRepository,
    profiles: InMemoryProfileRepository,
    gateway: MockPaymentGateway,
    auth: MockAuthProvider,
    event: Event,
    profile: Profile,
    token: String,
}

fn config() -> Config {
    Config::from_lookup(|key| {
        let value = match key {
            "RAZORPAY_KEY_ID" => "rzp_test_key",
            "RAZORPAY_KEY_SECRET" => KEY_SECRET,
            "RAZORPAY_WEBHOOK_SECRET" => WEBHOOK_SECRET,
            "SUPABASE_URL" => "http://localhost:54321",
            "SUPABASE_ANON_KEY" => "anon",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

impl App {
    fn new() -> Self {
        Self::with_readiness(true)
    }

    fn with_readiness(ready: bool) -> Self {
        let events = InMemoryEventRepository::new();
        let event = fixtures::event();
        events.add(event.clone());

        let profiles = InMemoryProfileRepository::new();
        let profile = fixtures::profile();
        profiles.add(profile.clone());

        let bookings = InMemoryBookingRepository::new(events.clone());
        let gateway = MockPaymentGateway::new();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());

        let auth = MockAuthProvider::new();
        let token = auth.login_as(profile.id, &profile.email);

        let collaborators = Collaborators {
            events: Arc::new(events),
            profiles: Arc::new(profiles.clone()),
            bookings: Arc::new(bookings.clone()),
            gateway: Arc::new(gateway.clone()),
            clock,
        };
        let state = AppState::new(
            collaborators,
            Arc::new(auth.clone()),
            Arc::new(Ready(ready)),
            &config(),
        );
        let server = TestServer::new(build_router(state, None)).unwrap();

        Self {
            server,
            bookings,
            profiles,
            gateway,
            auth,
            event,
            profile,
            token,
        }
    }

    fn order_body(&self, women: u32, couple: u32, stag: u32, total: f64) -> Value {
        json!({
            "eventId": self.event.id,
            "userId": self.profile.id,
            "cart": {"women": women, "couple": couple, "stag": stag},
            "totalAmount": total,
        })
    }

    async fn create_order(&self, body: &Value) -> axum_test::TestResponse {
        self.server
            .post("/api/payment/create-order")
            .authorization_bearer(&self.token)
            .add_header(
                HeaderName::from_static("user-agent"),
                HeaderValue::from_static(USER_AGENT),
            )
            .json(body)
            .await
    }

    async fn created_order(&self) -> (String, BookingId) {
        let response = self.create_order(&self.order_body(2, 1, 0, 1900.0)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        let order_id = body["orderId"].as_str().unwrap().to_string();
        let booking_id = body["bookingId"].as_str().unwrap().parse().unwrap();
        (order_id, booking_id)
    }

    async fn deliver_webhook(&self, body: &[u8], secret: &str) -> axum_test::TestResponse {
        let signature = sign_webhook(secret, body);
        self.server
            .post("/api/payment/webhook")
            .add_header(
                HeaderName::from_static(WEBHOOK_SIGNATURE_HEADER),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(body.to_vec().into())
            .await
    }
}

fn captured(order_id: &str, payment_id: &str) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": 190_000,
                    "status": "captured"
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_and_readiness() {
    let app = App::new();
    app.server.get("/health").await.assert_status_ok();

    let ready = app.server.get("/ready").await;
    ready.assert_status_ok();
    ready.assert_json(&json!({"ready": true, "database": true}));
}

#[tokio::test]
async fn readiness_fails_without_database() {
    let app = App::with_readiness(false);
    let response = app.server.get("/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    response.assert_json(&json!({"ready": false, "database": false}));
}

#[tokio::test]
async fn responses_carry_correlation_id() {
    let app = App::new();
    let response = app.server.get("/health").await;
    assert!(!response.header("x-correlation-id").is_empty());
}

// ============================================================================
// Order creation
// ============================================================================

#[tokio::test]
async fn create_order_returns_checkout_details() {
    let app = App::new();
    let response = app.create_order(&app.order_body(2, 1, 0, 1900.0)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["orderId"], "order_test_1");
    assert_eq!(body["amount"], 190_000);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["eventTitle"], app.event.title.as_str());
    assert_eq!(body["userName"], "Asha Rao");

    let booking_id: BookingId = body["bookingId"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        app.bookings.row(booking_id).unwrap().status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn create_order_rejects_wrong_total() {
    let app = App::new();
    let response = app.create_order(&app.order_body(2, 1, 0, 1800.0)).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "AMOUNT_MISMATCH");
    assert_eq!(app.gateway.request_count(), 0);
    assert!(app.bookings.is_empty());
}

#[tokio::test]
async fn create_order_requires_session() {
    let app = App::new();
    let response = app
        .server
        .post("/api/payment/create-order")
        .json(&app.order_body(2, 1, 0, 1900.0))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(app.gateway.request_count(), 0);
}

#[tokio::test]
async fn create_order_lists_field_errors() {
    let app = App::new();
    let response = app
        .create_order(&json!({
            "eventId": "not-a-uuid",
            "userId": app.profile.id,
            "cart": {"women": 1.5, "couple": 0, "stag": 0},
            "totalAmount": 500.123,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn create_order_rejects_malformed_json() {
    let app = App::new();
    let response = app
        .server
        .post("/api/payment/create-order")
        .authorization_bearer(&app.token)
        .content_type("application/json")
        .text("{not json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_submission_is_a_conflict() {
    let app = App::new();
    let first = app.create_order(&app.order_body(2, 1, 0, 1900.0)).await;
    first.assert_status_ok();

    let second = app.create_order(&app.order_body(2, 1, 0, 1900.0)).await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["code"], "DUPLICATE_PAYMENT");
    assert_eq!(body["details"]["existingOrderId"], "order_test_1");
    assert_eq!(app.gateway.request_count(), 1);
}

#[tokio::test]
async fn fourth_create_in_a_minute_is_rate_limited() {
    let app = App::new();
    for (women, couple, stag, total) in [(1, 0, 0, 500.0), (0, 0, 1, 700.0), (0, 1, 0, 900.0)] {
        app.create_order(&app.order_body(women, couple, stag, total))
            .await
            .assert_status_ok();
    }

    let response = app.create_order(&app.order_body(1, 0, 1, 1200.0)).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
    let body: Value = response.json();
    assert_eq!(body["retryAfter"], retry_after);
    assert_eq!(app.gateway.request_count(), 3);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn verification_is_idempotent() {
    let app = App::new();
    let (order_id, booking_id) = app.created_order().await;
    let request = json!({
        "razorpay_payment_id": "pay_http_1",
        "razorpay_order_id": order_id,
        "razorpay_signature": sign_payment(KEY_SECRET, &order_id, "pay_http_1"),
        "bookingId": booking_id,
    });

    for _ in 0..2 {
        let response = app.server.post("/api/payment/verify").json(&request).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["booking"]["status"], "confirmed");
        assert_eq!(body["booking"]["event"]["title"], app.event.title.as_str());
    }

    let booking = app.bookings.row(booking_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.razorpay_payment_id.as_deref(), Some("pay_http_1"));
}

#[tokio::test]
async fn forged_verification_fails_the_booking() {
    let app = App::new();
    let (order_id, booking_id) = app.created_order().await;

    let response = app
        .server
        .post("/api/payment/verify")
        .json(&json!({
            "razorpay_payment_id": "pay_http_1",
            "razorpay_order_id": order_id,
            "razorpay_signature": sign_payment("wrong_secret", &order_id, "pay_http_1"),
            "bookingId": booking_id,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_SIGNATURE");
    assert_eq!(
        app.bookings.row(booking_id).unwrap().status,
        BookingStatus::Failed
    );
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
async fn webhook_with_wrong_secret_changes_nothing() {
    let app = App::new();
    let (order_id, booking_id) = app.created_order().await;

    let response = app
        .deliver_webhook(&captured(&order_id, "pay_1"), "not_the_secret")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid signature");

    assert_eq!(
        app.bookings.row(booking_id).unwrap().status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let app = App::new();
    let response = app
        .server
        .post("/api/payment/webhook")
        .bytes(captured("order_test_1", "pay_1").into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing signature");
}

#[tokio::test]
async fn redelivered_webhook_confirms_once() {
    let app = App::new();
    let (order_id, booking_id) = app.created_order().await;
    let body = captured(&order_id, "pay_1");

    for _ in 0..2 {
        let response = app.deliver_webhook(&body, WEBHOOK_SECRET).await;
        response.assert_status_ok();
        response.assert_json(&json!({"success": true}));
    }

    let booking = app.bookings.row(booking_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(booking.webhook_confirmed);
    assert_eq!(booking.razorpay_payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn webhook_for_unknown_order_is_acknowledged() {
    let app = App::new();
    let response = app
        .deliver_webhook(&captured("order_elsewhere", "pay_9"), WEBHOOK_SECRET)
        .await;
    response.assert_status_ok();
}

// ============================================================================
// Events and bookings
// ============================================================================

#[tokio::test]
async fn lists_and_fetches_events() {
    let app = App::new();

    let list = app.server.get("/api/events").await;
    list.assert_status_ok();
    let events: Value = list.json();
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["title"], app.event.title.as_str());

    app.server
        .get(&format!("/api/events/{}", app.event.id))
        .await
        .assert_status_ok();
    app.server
        .get(&format!("/api/events/{}", UserId::new()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/api/events/not-a-uuid")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bookings_are_visible_to_their_owner_only() {
    let app = App::new();
    let (_, booking_id) = app.created_order().await;

    let list = app
        .server
        .get("/api/bookings")
        .authorization_bearer(&app.token)
        .await;
    list.assert_status_ok();
    let bookings: Value = list.json();
    assert_eq!(bookings.as_array().unwrap().len(), 1);
    assert_eq!(bookings[0]["status"], "pending");

    let path = format!("/api/bookings/{booking_id}");
    app.server
        .get(&path)
        .authorization_bearer(&app.token)
        .await
        .assert_status_ok();

    let stranger = app.auth.login_as(UserId::new(), "someone@example.com");
    app.server
        .get(&path)
        .authorization_bearer(&stranger)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .get("/api/bookings")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn sign_up_then_sign_in() {
    let app = App::new();
    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({
            "email": "Neha@Example.com",
            "password": "nightout42",
            "fullName": "Neha Kapoor",
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "neha@example.com");

    let user_id: UserId = body["user"]["id"].as_str().unwrap().parse().unwrap();
    let profile = app.profiles.get(user_id).await.unwrap().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Neha Kapoor"));

    let session = app
        .server
        .post("/api/auth/signin")
        .json(&json!({"email": "neha@example.com", "password": "nightout42"}))
        .await;
    session.assert_status_ok();
    let session: Value = session.json();
    let token = session["access_token"].as_str().unwrap();

    app.server
        .get("/api/bookings")
        .authorization_bearer(token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn sign_up_strips_control_characters_from_name() {
    let app = App::new();
    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({
            "email": "ravi@example.com",
            "password": "nightout42",
            "fullName": "  Ravi\u{0} Menon\t",
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let user_id: UserId = body["user"]["id"].as_str().unwrap().parse().unwrap();
    let profile = app.profiles.get(user_id).await.unwrap().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Ravi Menon"));
}

#[tokio::test]
async fn sign_up_validates_input() {
    let app = App::new();
    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({"email": "not-an-email", "password": "short", "fullName": "N3ha"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"fullName"));
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_unauthorized() {
    let app = App::new();
    app.server
        .post("/api/auth/signup")
        .json(&json!({
            "email": "neha@example.com",
            "password": "nightout42",
            "fullName": "Neha Kapoor",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .post("/api/auth/signin")
        .json(&json!({"email": "neha@example.com", "password": "wrongpass1"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
