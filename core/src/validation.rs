//! Field validation for untrusted input.
//!
//! Every validator returns a [`ValidationResult`] instead of failing fast, so
//! a request can report all of its problems at once. Validators never panic
//! on malformed input.
//!
//! ```
//! use clubpass_core::validation::{ValidationLimits, ValidationResult, validate_uuid};
//!
//! let limits = ValidationLimits::default();
//! let result = ValidationResult::combine([
//!     limits.email("guest@example.com"),
//!     validate_uuid("not-a-uuid", "eventId"),
//! ]);
//! assert!(!result.is_valid());
//! assert_eq!(result.errors()[0].field, "eventId");
//! ```

use crate::error::BookingError;
use crate::types::has_at_most_two_decimals;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

#[allow(clippy::expect_used)]
static UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid regex is valid")
});

#[allow(clippy::expect_used)]
static HARMFUL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|data:").expect("harmful content regex is valid")
});

#[allow(clippy::expect_used)]
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-']+$").expect("name regex is valid"));

/// A single problem with one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one or more validators.
///
/// Valid exactly when there are no errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<FieldError>,
}

impl ValidationResult {
    /// A passing result.
    #[must_use]
    pub const fn valid() -> Self {
        Self { errors: Vec::new() }
    }

    /// A failing result with one error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Record an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Whether every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Merge results; errors are concatenated in input order.
    #[must_use]
    pub fn combine(results: impl IntoIterator<Item = Self>) -> Self {
        Self {
            errors: results.into_iter().flat_map(|r| r.errors).collect(),
        }
    }

    /// Convert into a service result.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] carrying every field error.
    pub fn into_result(self) -> Result<(), BookingError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BookingError::Validation(self.errors))
        }
    }
}

/// Configurable bounds for the validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Longest accepted email
    pub max_email_length: usize,
    /// Shortest accepted password
    pub min_password_length: usize,
    /// Longest accepted password
    pub max_password_length: usize,
    /// Smallest payable amount, in rupees
    pub min_payment_amount: f64,
    /// Largest payable amount, in rupees
    pub max_payment_amount: f64,
    /// Most tickets per tier
    pub max_ticket_quantity: u32,
    /// Shortest full name
    pub min_name_length: usize,
    /// Longest full name
    pub max_name_length: usize,
    /// Longest gateway identifier or signature
    pub max_identifier_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_email_length: 254,
            min_password_length: 8,
            max_password_length: 128,
            min_payment_amount: 1.0,
            max_payment_amount: 100_000.0,
            max_ticket_quantity: 10,
            min_name_length: 2,
            max_name_length: 50,
            max_identifier_length: 256,
        }
    }
}

impl ValidationLimits {
    /// Email: required, `local@domain.tld` shape, bounded length.
    #[must_use]
    pub fn email(&self, email: &str) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if email.is_empty() {
            result.add_error("email", "Email is required");
            return result;
        }
        if !EMAIL_REGEX.is_match(email) {
            result.add_error("email", "Invalid email format");
        }
        if email.chars().count() > self.max_email_length {
            result.add_error("email", "Email is too long");
        }
        result
    }

    /// Password: bounded length, at least one letter and one digit.
    #[must_use]
    pub fn password(&self, password: &str) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if password.is_empty() {
            result.add_error("password", "Password is required");
            return result;
        }
        let length = password.chars().count();
        if length < self.min_password_length {
            result.add_error(
                "password",
                format!(
                    "Password must be at least {} characters long",
                    self.min_password_length
                ),
            );
        }
        if length > self.max_password_length {
            result.add_error("password", "Password is too long");
        }
        let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        if !(has_letter && has_digit) {
            result.add_error(
                "password",
                "Password must contain at least one letter and one number",
            );
        }
        result
    }

    /// Payment amount in rupees: within bounds, at most two decimals.
    #[must_use]
    pub fn amount(&self, amount: f64, field: &str) -> ValidationResult {
        let mut result = validate_number(
            amount,
            field,
            Some(self.min_payment_amount),
            Some(self.max_payment_amount),
        );
        if result.is_valid() && !has_at_most_two_decimals(amount) {
            result.add_error(field, "Amount can have at most 2 decimal places");
        }
        result
    }

    /// One cart tier: a whole number in `[0, max_ticket_quantity]`.
    #[must_use]
    pub fn ticket_count(&self, count: f64, field: &str) -> ValidationResult {
        validate_ticket_quantity(count, field, 0, self.max_ticket_quantity)
    }

    /// Full name: free-text rules plus letters, spaces, hyphens, apostrophes.
    #[must_use]
    pub fn full_name(&self, name: &str) -> ValidationResult {
        let mut result =
            validate_text(name, "fullName", self.min_name_length, self.max_name_length);
        if result.is_valid() && !NAME_REGEX.is_match(name.trim()) {
            result.add_error(
                "fullName",
                "Name can only contain letters, spaces, hyphens, and apostrophes",
            );
        }
        result
    }

    /// Gateway identifier or signature: non-empty after trim, bounded.
    #[must_use]
    pub fn identifier(&self, value: &str, field: &str) -> ValidationResult {
        validate_required(value, field, self.max_identifier_length)
    }
}

/// Canonical 8-4-4-4-12 UUID, version 1–5, RFC variant, any case.
#[must_use]
pub fn validate_uuid(id: &str, field: &str) -> ValidationResult {
    if id.is_empty() {
        return ValidationResult::invalid(field, "ID is required");
    }
    if UUID_REGEX.is_match(id) {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(field, "Invalid ID format")
    }
}

/// Finite number within optional bounds.
#[must_use]
pub fn validate_number(value: f64, field: &str, min: Option<f64>, max: Option<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if !value.is_finite() {
        result.add_error(field, "Value must be a valid number");
        return result;
    }
    if let Some(min) = min {
        if value < min {
            result.add_error(field, format!("Value must be at least {min}"));
        }
    }
    if let Some(max) = max {
        if value > max {
            result.add_error(field, format!("Value must not exceed {max}"));
        }
    }
    result
}

/// Whole number within `[min, max]`, inclusive.
#[must_use]
pub fn validate_ticket_quantity(quantity: f64, field: &str, min: u32, max: u32) -> ValidationResult {
    let mut result = validate_number(
        quantity,
        field,
        Some(f64::from(min)),
        Some(f64::from(max)),
    );
    if result.is_valid() && quantity.fract() != 0.0 {
        result.add_error(field, "Ticket quantity must be a whole number");
    }
    result
}

/// Free text: trimmed length within bounds, no script-like content.
///
/// The content check is a blunt heuristic, not a sanitizer.
#[must_use]
pub fn validate_text(value: &str, field: &str, min_length: usize, max_length: usize) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if value.is_empty() {
        result.add_error(field, "Value is required");
        return result;
    }
    let length = value.trim().chars().count();
    if length < min_length {
        result.add_error(
            field,
            format!("Value must be at least {min_length} characters long"),
        );
    }
    if length > max_length {
        result.add_error(
            field,
            format!("Value must not exceed {max_length} characters"),
        );
    }
    if HARMFUL_REGEX.is_match(value) {
        result.add_error(field, "Value contains potentially harmful content");
    }
    result
}

/// Required opaque string: non-empty after trim, at most `max_length` chars.
#[must_use]
pub fn validate_required(value: &str, field: &str, max_length: usize) -> ValidationResult {
    if value.trim().is_empty() {
        ValidationResult::invalid(field, format!("{field} is required"))
    } else if value.chars().count() > max_length {
        ValidationResult::invalid(field, format!("{field} is too long"))
    } else {
        ValidationResult::valid()
    }
}

/// Strip control characters and surrounding whitespace before storage.
#[must_use]
pub fn sanitize_db_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}
