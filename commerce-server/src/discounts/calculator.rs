//! Discount Calculator
//!
//! Computes the discount amount a rule yields for a cart snapshot.
//! Stateless: everything it needs is in the rule and the cart. All
//! arithmetic is `Decimal`; per-line breakdowns are produced for
//! receipt display.

use super::CartLine;
use rust_decimal::Decimal;
use shared::models::{BuyXGetY, DiscountRule, DiscountValue, GetsValue, RuleKind, TriggerRequirement};
use shared::money::{percent_of, round_money};

/// Discount attributed to one cart line
#[derive(Debug, Clone, PartialEq)]
pub struct LineDiscount {
    pub variant_id: i64,
    /// Units of the line the discount touched
    pub units: i64,
    pub amount: Decimal,
}

/// Outcome of a calculation
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationResult {
    /// Rule applied; total discount plus per-line breakdown
    Applied {
        total: Decimal,
        lines: Vec<LineDiscount>,
    },
    /// Buy-x-get-y trigger requirement not met
    NotQualified { reason: String },
    /// Reserved rule kind: reported explicitly, never a silent zero
    NotImplemented { kind: RuleKind },
}

/// Calculate the discount for `rule` against `cart`
pub fn calculate(rule: &DiscountRule, cart: &[CartLine]) -> CalculationResult {
    match rule.kind {
        RuleKind::AmountOffProduct => amount_off_product(rule, cart),
        RuleKind::BuyXGetY => match &rule.buy_x_get_y {
            Some(cfg) => buy_x_get_y(cfg, cart),
            None => not_qualified("rule has no buy-x-get-y configuration"),
        },
        kind @ (RuleKind::AmountOffOrder | RuleKind::FreeShipping) => {
            CalculationResult::NotImplemented { kind }
        }
    }
}

fn not_qualified(reason: &str) -> CalculationResult {
    CalculationResult::NotQualified {
        reason: reason.to_string(),
    }
}

/// Per eligible line: `percentage * line_total` or
/// `min(fixed * quantity, line_total)`, summed across lines.
fn amount_off_product(rule: &DiscountRule, cart: &[CartLine]) -> CalculationResult {
    let mut total = Decimal::ZERO;
    let mut lines = Vec::new();

    for line in cart {
        if !rule.applies_to.matches(line.product_id, line.variant_id) {
            continue;
        }
        let line_total = line.line_total();
        let amount = match rule.value {
            Some(DiscountValue::Percentage(pct)) => percent_of(line_total, pct),
            Some(DiscountValue::FixedAmount(fixed)) => {
                round_money((fixed * Decimal::from(line.quantity)).min(line_total))
            }
            None => Decimal::ZERO,
        };
        if amount > Decimal::ZERO {
            total += amount;
            lines.push(LineDiscount {
                variant_id: line.variant_id,
                units: line.quantity,
                amount,
            });
        }
    }

    CalculationResult::Applied {
        total: round_money(total),
        lines,
    }
}

/// One unit of one cart line, used for trigger consumption and
/// discount allocation
#[derive(Debug, Clone, Copy)]
struct Unit {
    line_idx: usize,
    unit_price: Decimal,
}

/// Two-phase buy-x-get-y evaluation.
///
/// Phase 1 (qualification): sum quantity or amount across the buys
/// filter and compare against the trigger requirement. Trigger units
/// are consumed most-expensive-first so that, when the buys and gets
/// filters overlap, the units that remain discountable are the cheap
/// ones.
///
/// Phase 2 (application): discount the cheapest remaining gets units,
/// up to `gets_quantity`, additionally capped by `max_uses_per_order`.
fn buy_x_get_y(cfg: &BuyXGetY, cart: &[CartLine]) -> CalculationResult {
    // Phase 1: qualification across the buys filter
    let mut buy_units: Vec<Unit> = Vec::new();
    for (idx, line) in cart.iter().enumerate() {
        if cfg.buys_filter.matches(line.product_id, line.variant_id) {
            for _ in 0..line.quantity {
                buy_units.push(Unit {
                    line_idx: idx,
                    unit_price: line.unit_price,
                });
            }
        }
    }
    buy_units.sort_by(|a, b| b.unit_price.cmp(&a.unit_price));

    // consumed[i] = units of line i used up by the trigger
    let mut consumed = vec![0i64; cart.len()];
    match cfg.buys {
        TriggerRequirement::MinQuantity(required) => {
            let have = buy_units.len() as i64;
            if have < required {
                return CalculationResult::NotQualified {
                    reason: format!(
                        "requires {} qualifying unit(s), cart has {}",
                        required, have
                    ),
                };
            }
            for unit in buy_units.iter().take(required as usize) {
                consumed[unit.line_idx] += 1;
            }
        }
        TriggerRequirement::MinAmount(required) => {
            let mut sum = Decimal::ZERO;
            let mut used = 0;
            for unit in &buy_units {
                if sum >= required {
                    break;
                }
                sum += unit.unit_price;
                used += 1;
            }
            if sum < required {
                return CalculationResult::NotQualified {
                    reason: format!(
                        "requires {} in qualifying purchases, cart has {}",
                        required, sum
                    ),
                };
            }
            for unit in buy_units.iter().take(used) {
                consumed[unit.line_idx] += 1;
            }
        }
    }

    // Phase 2: allocate the discount across the gets filter
    let mut get_units: Vec<Unit> = Vec::new();
    for (idx, line) in cart.iter().enumerate() {
        if cfg.gets_filter.matches(line.product_id, line.variant_id) {
            let overlap = if cfg.buys_filter.matches(line.product_id, line.variant_id) {
                consumed[idx]
            } else {
                0
            };
            for _ in 0..(line.quantity - overlap).max(0) {
                get_units.push(Unit {
                    line_idx: idx,
                    unit_price: line.unit_price,
                });
            }
        }
    }
    get_units.sort_by(|a, b| a.unit_price.cmp(&b.unit_price));

    let mut cap = cfg.gets_quantity;
    if let Some(max_uses) = cfg.max_uses_per_order {
        cap = cap.min(max_uses);
    }

    let mut total = Decimal::ZERO;
    let mut per_line: Vec<(usize, i64, Decimal)> = Vec::new();
    for unit in get_units.iter().take(cap.max(0) as usize) {
        let amount = match cfg.gets_value {
            GetsValue::Free => unit.unit_price,
            GetsValue::Percentage(pct) => percent_of(unit.unit_price, pct),
            GetsValue::AmountOffEach(off) => off.min(unit.unit_price),
        };
        total += amount;
        match per_line.iter_mut().find(|(idx, _, _)| *idx == unit.line_idx) {
            Some((_, units, sum)) => {
                *units += 1;
                *sum += amount;
            }
            None => per_line.push((unit.line_idx, 1, amount)),
        }
    }

    if per_line.is_empty() {
        return not_qualified("no discountable units remain after qualification");
    }

    let lines = per_line
        .into_iter()
        .map(|(idx, units, amount)| LineDiscount {
            variant_id: cart[idx].variant_id,
            units,
            amount: round_money(amount),
        })
        .collect();

    CalculationResult::Applied {
        total: round_money(total),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        CustomerEligibility, DiscountMethod, MinimumRequirement, ProductFilter,
    };
    use shared::money::cents;

    fn make_rule(kind: RuleKind) -> DiscountRule {
        DiscountRule {
            code: "TEST".to_string(),
            kind,
            method: DiscountMethod::Code,
            value: None,
            buy_x_get_y: None,
            starts_at: 0,
            ends_at: None,
            is_active: true,
            usage_limit: None,
            usage_limit_per_customer: None,
            usage_count: 0,
            total_discount_amount: Decimal::ZERO,
            minimum: MinimumRequirement::None,
            applies_to: ProductFilter::AllProducts,
            customer_eligibility: CustomerEligibility::Everyone,
            combines_with_product_discounts: false,
            created_at: 0,
        }
    }

    fn bxgy_rule(buys: i64, gets: i64, value: GetsValue) -> DiscountRule {
        let mut rule = make_rule(RuleKind::BuyXGetY);
        rule.buy_x_get_y = Some(BuyXGetY {
            buys: TriggerRequirement::MinQuantity(buys),
            buys_filter: ProductFilter::AllProducts,
            gets_filter: ProductFilter::AllProducts,
            gets_quantity: gets,
            gets_value: value,
            max_uses_per_order: None,
        });
        rule
    }

    fn line(variant_id: i64, quantity: i64, price: Decimal) -> CartLine {
        CartLine {
            product_id: Some(variant_id),
            variant_id,
            quantity,
            unit_price: price,
        }
    }

    #[test]
    fn test_percentage_off_product() {
        let mut rule = make_rule(RuleKind::AmountOffProduct);
        rule.value = Some(DiscountValue::Percentage(Decimal::from(10)));

        let cart = vec![line(1, 2, cents(1000))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, lines } => {
                assert_eq!(total, cents(200));
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].units, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fixed_off_capped_at_line_total() {
        let mut rule = make_rule(RuleKind::AmountOffProduct);
        rule.value = Some(DiscountValue::FixedAmount(cents(800)));

        // 2 * 8.00 = 16.00 > line total 10.00: capped
        let cart = vec![line(1, 2, cents(500))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, .. } => assert_eq!(total, cents(1000)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_product_filter_limits_eligible_lines() {
        let mut rule = make_rule(RuleKind::AmountOffProduct);
        rule.value = Some(DiscountValue::Percentage(Decimal::from(50)));
        rule.applies_to = ProductFilter::Variants(vec![1]);

        let cart = vec![line(1, 1, cents(1000)), line(2, 1, cents(1000))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, lines } => {
                assert_eq!(total, cents(500));
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].variant_id, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_buy_two_get_one_free() {
        // 3 qualifying units: 2 trigger + 1 free: discount is exactly
        // one unit's price
        let rule = bxgy_rule(2, 1, GetsValue::Free);
        let cart = vec![line(1, 3, cents(700))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, lines } => {
                assert_eq!(total, cents(700));
                assert_eq!(lines[0].units, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_buy_two_get_one_not_qualified() {
        let rule = bxgy_rule(2, 1, GetsValue::Free);
        let cart = vec![line(1, 1, cents(700))];
        assert!(matches!(
            calculate(&rule, &cart),
            CalculationResult::NotQualified { .. }
        ));
    }

    #[test]
    fn test_bxgy_no_units_left_after_trigger() {
        // Exactly the trigger quantity in the cart: qualified, but every
        // unit is consumed by the trigger
        let rule = bxgy_rule(2, 1, GetsValue::Free);
        let cart = vec![line(1, 2, cents(700))];
        assert!(matches!(
            calculate(&rule, &cart),
            CalculationResult::NotQualified { .. }
        ));
    }

    #[test]
    fn test_bxgy_discounts_cheapest_gets_unit() {
        let mut rule = bxgy_rule(1, 1, GetsValue::Free);
        // Trigger on variant 1, reward on variant 2
        let cfg = rule.buy_x_get_y.as_mut().unwrap();
        cfg.buys_filter = ProductFilter::Variants(vec![1]);
        cfg.gets_filter = ProductFilter::Variants(vec![2]);

        let cart = vec![
            line(1, 1, cents(2000)),
            line(2, 1, cents(900)),
            line(2, 1, cents(400)),
        ];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, .. } => assert_eq!(total, cents(400)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bxgy_percentage_and_fixed_values() {
        let mut rule = bxgy_rule(1, 1, GetsValue::Percentage(Decimal::from(50)));
        let cfg = rule.buy_x_get_y.as_mut().unwrap();
        cfg.buys_filter = ProductFilter::Variants(vec![1]);
        cfg.gets_filter = ProductFilter::Variants(vec![2]);

        let cart = vec![line(1, 1, cents(1000)), line(2, 1, cents(600))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, .. } => assert_eq!(total, cents(300)),
            other => panic!("unexpected: {other:?}"),
        }

        // Fixed amount off each unit, capped at the unit price
        let cfg = rule.buy_x_get_y.as_mut().unwrap();
        cfg.gets_value = GetsValue::AmountOffEach(cents(1000));
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, .. } => assert_eq!(total, cents(600)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bxgy_max_uses_per_order_caps_units() {
        let mut rule = bxgy_rule(2, 3, GetsValue::Free);
        rule.buy_x_get_y.as_mut().unwrap().max_uses_per_order = Some(1);

        let cart = vec![line(1, 6, cents(500))];
        match calculate(&rule, &cart) {
            CalculationResult::Applied { total, lines } => {
                assert_eq!(total, cents(500));
                assert_eq!(lines[0].units, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_min_amount_trigger() {
        let mut rule = bxgy_rule(1, 1, GetsValue::Free);
        let cfg = rule.buy_x_get_y.as_mut().unwrap();
        cfg.buys = TriggerRequirement::MinAmount(cents(3000));
        cfg.buys_filter = ProductFilter::Variants(vec![1]);
        cfg.gets_filter = ProductFilter::Variants(vec![2]);

        let short = vec![line(1, 1, cents(2000)), line(2, 1, cents(500))];
        assert!(matches!(
            calculate(&rule, &short),
            CalculationResult::NotQualified { .. }
        ));

        let enough = vec![line(1, 2, cents(2000)), line(2, 1, cents(500))];
        match calculate(&rule, &enough) {
            CalculationResult::Applied { total, .. } => assert_eq!(total, cents(500)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_reserved_kinds_report_not_implemented() {
        let rule = make_rule(RuleKind::AmountOffOrder);
        assert!(matches!(
            calculate(&rule, &[line(1, 1, cents(100))]),
            CalculationResult::NotImplemented {
                kind: RuleKind::AmountOffOrder
            }
        ));

        let rule = make_rule(RuleKind::FreeShipping);
        assert!(matches!(
            calculate(&rule, &[line(1, 1, cents(100))]),
            CalculationResult::NotImplemented {
                kind: RuleKind::FreeShipping
            }
        ));
    }
}
