//! Discount Rule Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rule kind: how the value fields are interpreted.
///
/// `AmountOffOrder` and `FreeShipping` are reserved; evaluation reports
/// them as not implemented instead of silently computing zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    AmountOffProduct,
    BuyXGetY,
    AmountOffOrder,
    FreeShipping,
}

/// How the rule is applied: by entering a code, or automatically.
/// Automatic-only rules reject manual code application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountMethod {
    #[default]
    Code,
    Automatic,
}

/// Value of an amount-off-product rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "value")]
pub enum DiscountValue {
    /// Percentage in (0, 100]
    Percentage(Decimal),
    /// Fixed amount off per unit, must be > 0
    FixedAmount(Decimal),
}

/// Which products a filter matches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "scope", content = "ids")]
pub enum ProductFilter {
    #[default]
    AllProducts,
    Products(Vec<i64>),
    Variants(Vec<i64>),
}

impl ProductFilter {
    /// Does a line with the given product/variant refs match this filter?
    pub fn matches(&self, product_id: Option<i64>, variant_id: i64) -> bool {
        match self {
            ProductFilter::AllProducts => true,
            ProductFilter::Products(ids) => product_id.is_some_and(|p| ids.contains(&p)),
            ProductFilter::Variants(ids) => ids.contains(&variant_id),
        }
    }
}

/// Which customers may use the rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "scope", content = "ids")]
pub enum CustomerEligibility {
    #[default]
    Everyone,
    Customers(Vec<i64>),
}

impl CustomerEligibility {
    pub fn matches(&self, customer_id: Option<i64>) -> bool {
        match self {
            CustomerEligibility::Everyone => true,
            CustomerEligibility::Customers(ids) => customer_id.is_some_and(|c| ids.contains(&c)),
        }
    }
}

/// Cart-level requirement that must hold before the rule applies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "value")]
pub enum MinimumRequirement {
    #[default]
    None,
    /// Minimum cart subtotal
    Subtotal(Decimal),
    /// Minimum total item quantity
    Quantity(i64),
}

/// Trigger requirement for the "buys" side of a buy-x-get-y rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "value")]
pub enum TriggerRequirement {
    /// Minimum quantity across the buys filter
    MinQuantity(i64),
    /// Minimum amount across the buys filter
    MinAmount(Decimal),
}

/// What each matched "gets" unit receives
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "value")]
pub enum GetsValue {
    /// Full unit price off
    Free,
    /// Percentage of the unit price
    Percentage(Decimal),
    /// Fixed amount off each unit, capped at the unit price
    AmountOffEach(Decimal),
}

/// Buy-x-get-y configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuyXGetY {
    pub buys: TriggerRequirement,
    pub buys_filter: ProductFilter,
    pub gets_filter: ProductFilter,
    /// Number of units the customer gets discounted per order
    pub gets_quantity: i64,
    pub gets_value: GetsValue,
    /// Additional per-order cap on discounted units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses_per_order: Option<i64>,
}

/// Derived rule status. `ScheduledFuture` and `Expired` are computed
/// from the validity window, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Active,
    Inactive,
    ScheduledFuture,
    Expired,
    UsageExhausted,
}

/// Promotional rule definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountRule {
    /// Unique code, case-normalized via [`normalize_code`]
    pub code: String,
    pub kind: RuleKind,
    pub method: DiscountMethod,
    /// Value for amount-off-product rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<DiscountValue>,
    /// Configuration for buy-x-get-y rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_x_get_y: Option<BuyXGetY>,

    // === Validity window ===
    pub starts_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<i64>,
    pub is_active: bool,

    // === Usage limits ===
    /// None = unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit_per_customer: Option<i64>,
    /// Monotonically increasing; never exceeds `usage_limit` when set
    pub usage_count: i64,
    pub total_discount_amount: Decimal,

    // === Applicability ===
    pub minimum: MinimumRequirement,
    pub applies_to: ProductFilter,
    pub customer_eligibility: CustomerEligibility,
    /// Combinability flag kept from the rule definition
    #[serde(default)]
    pub combines_with_product_discounts: bool,

    pub created_at: i64,
}

impl DiscountRule {
    /// Derive the rule status at `now` (Unix millis)
    pub fn status_at(&self, now: i64) -> RuleStatus {
        if !self.is_active {
            return RuleStatus::Inactive;
        }
        if now < self.starts_at {
            return RuleStatus::ScheduledFuture;
        }
        if let Some(ends_at) = self.ends_at
            && now > ends_at
        {
            return RuleStatus::Expired;
        }
        if let Some(limit) = self.usage_limit
            && self.usage_count >= limit
        {
            return RuleStatus::UsageExhausted;
        }
        RuleStatus::Active
    }

    /// Numeric policy check: percentages in (0, 100], fixed amounts > 0
    pub fn value_well_formed(&self) -> bool {
        let pct_ok = |p: Decimal| p > Decimal::ZERO && p <= Decimal::ONE_HUNDRED;
        match self.kind {
            RuleKind::AmountOffProduct => match self.value {
                Some(DiscountValue::Percentage(p)) => pct_ok(p),
                Some(DiscountValue::FixedAmount(a)) => a > Decimal::ZERO,
                None => false,
            },
            RuleKind::BuyXGetY => match &self.buy_x_get_y {
                Some(cfg) => {
                    let trigger_ok = match cfg.buys {
                        TriggerRequirement::MinQuantity(q) => q > 0,
                        TriggerRequirement::MinAmount(a) => a > Decimal::ZERO,
                    };
                    let gets_ok = match cfg.gets_value {
                        GetsValue::Free => true,
                        GetsValue::Percentage(p) => pct_ok(p),
                        GetsValue::AmountOffEach(a) => a > Decimal::ZERO,
                    };
                    trigger_ok && gets_ok && cfg.gets_quantity > 0
                }
                None => false,
            },
            // Reserved kinds carry no value to validate
            RuleKind::AmountOffOrder | RuleKind::FreeShipping => true,
        }
    }
}

/// Audit row written once per successful discount application,
/// at payment confirmation. Per-customer usage limits are computed by
/// counting these rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountUsage {
    pub rule_code: String,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub order_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub applied_at: i64,
}

/// Canonical form of a discount code: trimmed, uppercase
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
