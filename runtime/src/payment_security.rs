//! Payment amount checks and attempt-pattern heuristics.

use crate::activity::RiskLevel;
use crate::ledger::PaymentAttempt;
use chrono::{DateTime, Duration, Utc};
use clubpass_core::types::{Money, UserId};

/// Thresholds for payment heuristics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentSecurityConfig {
    /// Largest acceptable amount
    pub max_amount: Money,
    /// Amounts that are multiples of this unit...
    pub round_amount_unit: Money,
    /// ...and above this threshold are flagged
    pub suspicious_amount_threshold: Money,
    /// More attempts than this by one user inside the window is flagged
    pub multiple_attempts_threshold: usize,
    /// More attempts than this at one amount inside the window is flagged
    pub same_amount_attempts_threshold: usize,
    /// Look-back window for pattern flags
    pub pattern_window: Duration,
}

impl Default for PaymentSecurityConfig {
    fn default() -> Self {
        Self {
            max_amount: Money::from_paise(10_000_000),
            round_amount_unit: Money::from_paise(100_000),
            suspicious_amount_threshold: Money::from_paise(500_000),
            multiple_attempts_threshold: 5,
            same_amount_attempts_threshold: 10,
            pattern_window: Duration::hours(1),
        }
    }
}

/// Flags raised by [`PaymentSecurity::assess_pattern`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternAssessment {
    /// One entry per heuristic that fired
    pub reasons: Vec<&'static str>,
    /// Low for none, medium for one, high for more
    pub risk: RiskLevel,
}

/// Stateless payment heuristics.
#[derive(Clone, Debug, Default)]
pub struct PaymentSecurity {
    config: PaymentSecurityConfig,
}

impl PaymentSecurity {
    /// Create with the given thresholds.
    #[must_use]
    pub const fn new(config: PaymentSecurityConfig) -> Self {
        Self { config }
    }

    /// Hard violations for an amount. Empty means acceptable.
    #[must_use]
    pub fn check_amount(&self, amount: Money) -> Vec<&'static str> {
        let mut violations = Vec::new();
        if amount.is_zero() {
            violations.push("Invalid payment amount");
        }
        if amount > self.config.max_amount {
            violations.push("Amount exceeds maximum limit");
        }
        if is_repeated_digit_amount(amount) {
            violations.push("Suspicious amount pattern");
        }
        violations
    }

    /// Score `attempts` for the given user and amount.
    ///
    /// Only attempts created inside the pattern window count.
    #[must_use]
    pub fn assess_pattern(
        &self,
        attempts: &[PaymentAttempt],
        user_id: UserId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> PatternAssessment {
        let cutoff = now - self.config.pattern_window;
        let recent: Vec<_> = attempts.iter().filter(|a| a.created_at > cutoff).collect();

        let mut reasons = Vec::new();

        let by_user = recent.iter().filter(|a| a.key.user_id == user_id).count();
        if by_user > self.config.multiple_attempts_threshold {
            reasons.push("Multiple payment attempts in short time period");
        }

        let same_amount = recent.iter().filter(|a| a.key.amount == amount).count();
        if same_amount > self.config.same_amount_attempts_threshold {
            reasons.push("Same amount attempted by multiple users (possible card testing)");
        }

        let unit = self.config.round_amount_unit.paise();
        if unit > 0
            && amount.paise() % unit == 0
            && amount > self.config.suspicious_amount_threshold
        {
            reasons.push("Round number amount (potentially suspicious)");
        }

        let risk = match reasons.len() {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };
        PatternAssessment { reasons, risk }
    }
}

/// Whole-rupee amount of two or more digits, all the same (₹55, ₹555555).
fn is_repeated_digit_amount(amount: Money) -> bool {
    if amount.paise() % 100 != 0 {
        return false;
    }
    let digits = (amount.paise() / 100).to_string();
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => digits.len() >= 2 && chars.all(|c| c == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AttemptKey, AttemptStatus};
    use clubpass_core::types::EventId;

    fn rupees(value: u64) -> Money {
        Money::from_paise(value * 100)
    }

    fn attempt(user_id: UserId, amount: Money, created_at: DateTime<Utc>) -> PaymentAttempt {
        PaymentAttempt {
            key: AttemptKey::new(user_id, EventId::new(), amount),
            created_at,
            updated_at: created_at,
            order_id: None,
            payment_id: None,
            status: AttemptStatus::Pending,
        }
    }

    #[test]
    fn test_amount_violations() {
        let security = PaymentSecurity::default();
        assert!(security.check_amount(rupees(1900)).is_empty());
        assert_eq!(security.check_amount(Money::ZERO), vec!["Invalid payment amount"]);
        assert_eq!(
            security.check_amount(rupees(100_001)),
            vec!["Amount exceeds maximum limit"]
        );
        assert!(security.check_amount(rupees(100_000)).is_empty());
    }

    #[test]
    fn test_repeated_digit_pattern() {
        let security = PaymentSecurity::default();
        assert_eq!(
            security.check_amount(rupees(555_555)),
            vec!["Amount exceeds maximum limit", "Suspicious amount pattern"]
        );
        assert_eq!(security.check_amount(rupees(55)), vec!["Suspicious amount pattern"]);
        assert!(security.check_amount(rupees(5)).is_empty());
        assert!(security.check_amount(Money::from_paise(5_550)).is_empty());
    }

    #[test]
    fn test_pattern_risk_levels() {
        let security = PaymentSecurity::default();
        let now = Utc::now();
        let user = UserId::new();

        let none = security.assess_pattern(&[], user, rupees(1900), now);
        assert_eq!(none.risk, RiskLevel::Low);

        let round = security.assess_pattern(&[], user, rupees(6000), now);
        assert_eq!(round.risk, RiskLevel::Medium);
        assert_eq!(round.reasons, vec!["Round number amount (potentially suspicious)"]);

        let busy: Vec<_> = (0..6).map(|_| attempt(user, rupees(6000), now)).collect();
        let both = security.assess_pattern(&busy, user, rupees(6000), now);
        assert_eq!(both.risk, RiskLevel::High);
    }

    #[test]
    fn test_same_amount_across_users() {
        let security = PaymentSecurity::default();
        let now = Utc::now();
        let attempts: Vec<_> = (0..11)
            .map(|_| attempt(UserId::new(), rupees(1900), now))
            .collect();
        let assessment = security.assess_pattern(&attempts, UserId::new(), rupees(1900), now);
        assert_eq!(
            assessment.reasons,
            vec!["Same amount attempted by multiple users (possible card testing)"]
        );
    }

    #[test]
    fn test_old_attempts_ignored() {
        let security = PaymentSecurity::default();
        let now = Utc::now();
        let user = UserId::new();
        let attempts: Vec<_> = (0..10)
            .map(|_| attempt(user, rupees(1900), now - Duration::hours(2)))
            .collect();
        let assessment = security.assess_pattern(&attempts, user, rupees(1900), now);
        assert_eq!(assessment.risk, RiskLevel::Low);
    }
}
