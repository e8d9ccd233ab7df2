//! Discount Code Validator
//!
//! Decides whether a rule may be applied to a cart at all, before any
//! amount is calculated. Pure given its inputs: the per-customer usage
//! count comes from the usage tracker and is passed in by the caller.

use super::{CartLine, cart_quantity, cart_subtotal};
use rust_decimal::Decimal;
use shared::models::{DiscountMethod, DiscountRule, MinimumRequirement, RuleStatus};
use std::fmt;

/// Why a code was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidReason {
    NotYetStarted,
    Expired,
    Inactive,
    UsageExhausted,
    /// The rule is automatic-only and cannot be applied as a code
    AutomaticOnly,
    CustomerNotEligible,
    CustomerLimitReached {
        limit: i64,
        used: i64,
    },
    MinimumSubtotalNotMet {
        required: Decimal,
        actual: Decimal,
    },
    MinimumQuantityNotMet {
        required: i64,
        actual: i64,
    },
    /// Value fields violate the numeric policy
    MalformedRule,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NotYetStarted => write!(f, "code is not active yet"),
            InvalidReason::Expired => write!(f, "code has expired"),
            InvalidReason::Inactive => write!(f, "code is inactive"),
            InvalidReason::UsageExhausted => write!(f, "code usage limit reached"),
            InvalidReason::AutomaticOnly => {
                write!(f, "rule is automatic and cannot be applied as a code")
            }
            InvalidReason::CustomerNotEligible => write!(f, "customer is not eligible"),
            InvalidReason::CustomerLimitReached { limit, used } => {
                write!(f, "customer usage limit reached ({} of {})", used, limit)
            }
            InvalidReason::MinimumSubtotalNotMet { required, actual } => {
                write!(f, "minimum purchase {} not met (cart {})", required, actual)
            }
            InvalidReason::MinimumQuantityNotMet { required, actual } => {
                write!(f, "minimum quantity {} not met (cart {})", required, actual)
            }
            InvalidReason::MalformedRule => write!(f, "rule value is malformed"),
        }
    }
}

/// Validation outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Validate a manually entered code against a cart.
///
/// `per_customer_used` is the number of usage audit rows already
/// recorded for (rule, customer); the caller obtains it from the usage
/// tracker.
pub fn validate_code(
    rule: &DiscountRule,
    customer_id: Option<i64>,
    cart: &[CartLine],
    per_customer_used: i64,
    now: i64,
) -> Validation {
    if !rule.value_well_formed() {
        return Validation::Invalid(InvalidReason::MalformedRule);
    }

    match rule.status_at(now) {
        RuleStatus::Active => {}
        RuleStatus::Inactive => return Validation::Invalid(InvalidReason::Inactive),
        RuleStatus::ScheduledFuture => return Validation::Invalid(InvalidReason::NotYetStarted),
        RuleStatus::Expired => return Validation::Invalid(InvalidReason::Expired),
        RuleStatus::UsageExhausted => return Validation::Invalid(InvalidReason::UsageExhausted),
    }

    if rule.method != DiscountMethod::Code {
        return Validation::Invalid(InvalidReason::AutomaticOnly);
    }

    if !rule.customer_eligibility.matches(customer_id) {
        return Validation::Invalid(InvalidReason::CustomerNotEligible);
    }

    if let Some(limit) = rule.usage_limit_per_customer
        && customer_id.is_some()
        && per_customer_used >= limit
    {
        return Validation::Invalid(InvalidReason::CustomerLimitReached {
            limit,
            used: per_customer_used,
        });
    }

    match rule.minimum {
        MinimumRequirement::None => {}
        MinimumRequirement::Subtotal(required) => {
            let actual = cart_subtotal(cart);
            if actual < required {
                return Validation::Invalid(InvalidReason::MinimumSubtotalNotMet {
                    required,
                    actual,
                });
            }
        }
        MinimumRequirement::Quantity(required) => {
            let actual = cart_quantity(cart);
            if actual < required {
                return Validation::Invalid(InvalidReason::MinimumQuantityNotMet {
                    required,
                    actual,
                });
            }
        }
    }

    Validation::Valid
}
