//! Shared fixtures for integration tests
#![allow(dead_code)]

use commerce_server::collaborators::{AllowAll, FlatRates, InMemoryCustomers, RecordingAnalytics};
use commerce_server::notify::NotificationSender;
use commerce_server::orders::service::RequestContext;
use commerce_server::{CommerceStore, Config, OrderService};
use rust_decimal::Decimal;
use shared::models::{
    BuyXGetY, Customer, CustomerEligibility, DiscountMethod, DiscountRule, DiscountValue,
    GetsValue, MinimumRequirement, ProductFilter, ProductSnapshot, RuleKind, ShippingInfo,
    TriggerRequirement,
};
use shared::money::cents;
use shared::request::{CreateOrderRequest, OrderItemRequest};
use std::sync::Arc;

pub struct Fixture {
    pub service: Arc<OrderService>,
    pub customers: Arc<InMemoryCustomers>,
    pub analytics: Arc<RecordingAnalytics>,
}

pub fn make_fixture() -> Fixture {
    make_fixture_with_config(Config::default())
}

pub fn make_fixture_with_config(config: Config) -> Fixture {
    let store = CommerceStore::open_in_memory().unwrap();
    let customers = Arc::new(InMemoryCustomers::new());
    for id in 1..=3 {
        customers.insert(Customer {
            id,
            name: format!("Customer {}", id),
            email: Some(format!("c{}@example.com", id)),
            phone: None,
            orders_count: 0,
            total_spent: Decimal::ZERO,
        });
    }
    let analytics = Arc::new(RecordingAnalytics::new());
    let rates = Arc::new(FlatRates::new());
    rates.set_fee(1, "north", cents(500));

    let service = OrderService::new(
        store,
        config,
        Arc::new(AllowAll),
        rates,
        customers.clone(),
        analytics.clone(),
        NotificationSender::disabled(),
    );

    Fixture {
        service: Arc::new(service),
        customers,
        analytics,
    }
}

pub fn ctx() -> RequestContext {
    RequestContext {
        actor_id: 1,
        actor_name: Some("Ops".to_string()),
        workspace_id: 1,
    }
}

pub fn seed_stock(service: &OrderService, variant: i64, location: i64, on_hand: i64) {
    let txn = service.store().begin_write().unwrap();
    commerce_server::stock::set_level(service.store(), &txn, variant, location, on_hand).unwrap();
    txn.commit().unwrap();
}

pub fn simple_item(variant: i64, quantity: i32, price: Decimal) -> OrderItemRequest {
    OrderItemRequest {
        product_id: Some(variant),
        variant_id: variant,
        location_id: 1,
        quantity,
        unit_price: price,
        product: ProductSnapshot {
            name: format!("Product {}", variant),
            sku: Some(format!("SKU-{}", variant)),
            category: None,
            images: vec![],
        },
        shipping_package_id: None,
    }
}

pub fn simple_request(customer_id: i64, items: Vec<OrderItemRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id,
        shipping: ShippingInfo {
            recipient: "Ada".to_string(),
            phone: None,
            region: "north".to_string(),
            address: Some("1 Main St".to_string()),
        },
        items,
        payment_method: "cash".to_string(),
        source: Default::default(),
        discount_code: None,
        shipping_cost: Some(Decimal::ZERO),
        tax_amount: None,
    }
}

pub fn percentage_rule(code: &str, percentage: i64, usage_limit: Option<i64>) -> DiscountRule {
    DiscountRule {
        code: code.to_string(),
        kind: RuleKind::AmountOffProduct,
        method: DiscountMethod::Code,
        value: Some(DiscountValue::Percentage(Decimal::from(percentage))),
        buy_x_get_y: None,
        starts_at: 0,
        ends_at: None,
        is_active: true,
        usage_limit,
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

pub fn buy_x_get_y_rule(code: &str, buys: i64, gets: i64) -> DiscountRule {
    let mut rule = percentage_rule(code, 10, None);
    rule.kind = RuleKind::BuyXGetY;
    rule.value = None;
    rule.buy_x_get_y = Some(BuyXGetY {
        buys: TriggerRequirement::MinQuantity(buys),
        buys_filter: ProductFilter::AllProducts,
        gets_filter: ProductFilter::AllProducts,
        gets_quantity: gets,
        gets_value: GetsValue::Free,
        max_uses_per_order: None,
    });
    rule
}
