//! External collaborator interfaces
//!
//! The engine consumes out-of-scope systems (authorization, shipping
//! rates, the customer directory, analytics) through these narrow
//! traits. Services are constructed with their collaborators injected -
//! there is no ambient global lookup. The in-memory implementations
//! double as default wiring for single-node deployments and as test
//! fixtures.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::models::Customer;

/// Authorization check consulted before every mutating operation.
/// A denial surfaces as a structured authorization error, never
/// silently ignored.
pub trait PermissionGate: Send + Sync {
    fn has_permission(&self, actor_id: i64, workspace_id: i64, action: &str) -> bool;
}

/// Grants everything: single-operator deployments and tests
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn has_permission(&self, _actor_id: i64, _workspace_id: i64, _action: &str) -> bool {
        true
    }
}

/// Denies everything: authorization-path tests
pub struct DenyAll;

impl PermissionGate for DenyAll {
    fn has_permission(&self, _actor_id: i64, _workspace_id: i64, _action: &str) -> bool {
        false
    }
}

/// Regional shipping fee lookup, keyed by (package, region).
/// `None` means the package/region pair has no configured fee.
pub trait ShippingRates: Send + Sync {
    fn region_fee(&self, package_id: i64, region: &str) -> Option<Decimal>;
}

/// Fee table held in memory
#[derive(Default)]
pub struct FlatRates {
    fees: DashMap<(i64, String), Decimal>,
}

impl FlatRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fee(&self, package_id: i64, region: &str, fee: Decimal) {
        self.fees.insert((package_id, region.to_string()), fee);
    }
}

impl ShippingRates for FlatRates {
    fn region_fee(&self, package_id: i64, region: &str) -> Option<Decimal> {
        self.fees
            .get(&(package_id, region.to_string()))
            .map(|f| *f)
    }
}

/// No shipping configured anywhere
pub struct NoShipping;

impl ShippingRates for NoShipping {
    fn region_fee(&self, _package_id: i64, _region: &str) -> Option<Decimal> {
        None
    }
}

/// Customer lookup and aggregate-stat updates
pub trait CustomerDirectory: Send + Sync {
    fn get_customer(&self, id: i64) -> Option<Customer>;
    /// Bump orders_count / total_spent after a successful creation
    fn update_order_stats(&self, id: i64, amount: Decimal);
    /// Append a note to the customer's activity timeline
    fn record_timeline(&self, id: i64, note: &str);
}

/// In-memory customer directory
#[derive(Default)]
pub struct InMemoryCustomers {
    customers: DashMap<i64, Customer>,
    timeline: Mutex<Vec<(i64, String)>>,
}

impl InMemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, customer: Customer) {
        self.customers.insert(customer.id, customer);
    }

    pub fn timeline_for(&self, id: i64) -> Vec<String> {
        self.timeline
            .lock()
            .iter()
            .filter(|(cid, _)| *cid == id)
            .map(|(_, note)| note.clone())
            .collect()
    }
}

impl CustomerDirectory for InMemoryCustomers {
    fn get_customer(&self, id: i64) -> Option<Customer> {
        self.customers.get(&id).map(|c| c.clone())
    }

    fn update_order_stats(&self, id: i64, amount: Decimal) {
        if let Some(mut customer) = self.customers.get_mut(&id) {
            customer.orders_count += 1;
            customer.total_spent += amount;
        }
    }

    fn record_timeline(&self, id: i64, note: &str) {
        self.timeline.lock().push((id, note.to_string()));
    }
}

/// Analytics cache invalidation keyed by workspace + time window,
/// invoked after every create/status-change
pub trait AnalyticsCache: Send + Sync {
    fn invalidate(&self, workspace_id: i64, window: &str);
}

/// No analytics wired up
pub struct NullAnalytics;

impl AnalyticsCache for NullAnalytics {
    fn invalidate(&self, _workspace_id: i64, _window: &str) {}
}

/// Records invalidations for assertions in tests
#[derive(Default)]
pub struct RecordingAnalytics {
    invalidations: Mutex<Vec<(i64, String)>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(i64, String)> {
        std::mem::take(&mut self.invalidations.lock())
    }
}

impl AnalyticsCache for RecordingAnalytics {
    fn invalidate(&self, workspace_id: i64, window: &str) {
        self.invalidations
            .lock()
            .push((workspace_id, window.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::cents;

    #[test]
    fn test_in_memory_customers_stats() {
        let directory = InMemoryCustomers::new();
        directory.insert(Customer {
            id: 1,
            name: "Ada".to_string(),
            email: None,
            phone: None,
            orders_count: 0,
            total_spent: Decimal::ZERO,
        });

        directory.update_order_stats(1, cents(1500));
        directory.update_order_stats(1, cents(500));

        let customer = directory.get_customer(1).unwrap();
        assert_eq!(customer.orders_count, 2);
        assert_eq!(customer.total_spent, cents(2000));
    }

    #[test]
    fn test_flat_rates_lookup() {
        let rates = FlatRates::new();
        rates.set_fee(1, "north", cents(700));
        assert_eq!(rates.region_fee(1, "north"), Some(cents(700)));
        assert_eq!(rates.region_fee(1, "south"), None);
        assert_eq!(rates.region_fee(2, "north"), None);
    }
}
