//! Order Processing Service
//!
//! The only component allowed to mutate the stock ledger and the
//! discount usage tracker together with the order aggregate. Every
//! operation runs inside one write transaction: the atomic unit of
//! work: so a failure at any step leaves zero observable side
//! effects.
//!
//! # Creation flow
//!
//! ```text
//! create_order(ctx, request)
//!     ├─ 1. Permission check
//!     ├─ 2. Payload validation (fields, quantities, text limits)
//!     ├─ 3. Resolve customer via directory
//!     ├─ 4. Begin write transaction
//!     ├─ 5. Stock check: collect ALL shortfalls before failing
//!     ├─ 6. Validate + calculate discount (usage NOT consumed here)
//!     ├─ 7. Compute shipping (explicit, or per-line package fees)
//!     ├─ 8. Generate collision-checked order number
//!     ├─ 9. Persist order + line items, reserve stock, history entry
//!     ├─ 10. Commit
//!     └─ 11. Post-commit: customer stats, timeline, analytics, DM
//! ```
//!
//! Discount usage is consumed at payment confirmation only: an order
//! that is created but never paid must not exhaust a limited-use code.

use crate::collaborators::{AnalyticsCache, CustomerDirectory, PermissionGate, ShippingRates};
use crate::core::config::Config;
use crate::discounts::CartLine;
use crate::discounts::calculator::{self, CalculationResult};
use crate::discounts::usage;
use crate::discounts::validator::{self, Validation};
use crate::notify::{Notification, NotificationSender};
use crate::orders::error::{ServiceError, ServiceResult};
use crate::orders::history::merge_timeline;
use crate::orders::status::can_transition;
use crate::stock;
use crate::storage::{CommerceStore, StorageError};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};
use redb::WriteTransaction;
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    CustomerSnapshot, HistoryAction, Order, OrderComment, OrderLineItem, OrderSource, OrderStatus,
    PaymentStatus, TimelineEntry, normalize_code,
};
use shared::money::round_money;
use shared::request::{CreateOrderRequest, StatusUpdate};
use shared::response::{BulkFailure, BulkResult, OrderResult, UnavailableItem};
use shared::util::{now_millis, random_suffix};
use std::sync::Arc;

const ACTION_CREATE: &str = "orders.create";
const ACTION_UPDATE_STATUS: &str = "orders.update_status";
const ACTION_CANCEL: &str = "orders.cancel";
const ACTION_MARK_PAID: &str = "orders.mark_paid";
const ACTION_ARCHIVE: &str = "orders.archive";
const ACTION_COMMENT: &str = "orders.comment";

/// Injected clock, overridable in tests for validity-window checks
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Caller identity attached to every mutating operation
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor_id: i64,
    pub actor_name: Option<String>,
    pub workspace_id: i64,
}

/// Order processing service
///
/// Constructed with its dependencies injected; holds no ambient
/// global state.
pub struct OrderService {
    store: CommerceStore,
    config: Config,
    permissions: Arc<dyn PermissionGate>,
    shipping: Arc<dyn ShippingRates>,
    customers: Arc<dyn CustomerDirectory>,
    analytics: Arc<dyn AnalyticsCache>,
    notifier: NotificationSender,
    clock: Clock,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: CommerceStore,
        config: Config,
        permissions: Arc<dyn PermissionGate>,
        shipping: Arc<dyn ShippingRates>,
        customers: Arc<dyn CustomerDirectory>,
        analytics: Arc<dyn AnalyticsCache>,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            store,
            config,
            permissions,
            shipping,
            customers,
            analytics,
            notifier,
            clock: Arc::new(now_millis),
        }
    }

    /// Replace the clock (tests: validity windows, timeline ordering)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Daily analytics window for cache invalidation
    fn window(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.now())
            .unwrap_or_else(chrono::Utc::now)
            .format("%Y%m%d")
            .to_string()
    }

    fn check_permission(&self, ctx: &RequestContext, action: &str) -> ServiceResult<()> {
        if self
            .permissions
            .has_permission(ctx.actor_id, ctx.workspace_id, action)
        {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied {
                action: action.to_string(),
            })
        }
    }

    /// Convert a business outcome into a structured result; storage
    /// errors propagate for transport-level retry.
    fn respond(outcome: ServiceResult<Order>) -> Result<OrderResult, StorageError> {
        match outcome {
            Ok(order) => Ok(OrderResult::ok(order)),
            Err(ServiceError::Storage(e)) => Err(e),
            Err(err) => {
                let body = err.to_body();
                match err {
                    ServiceError::InsufficientStock(items) => {
                        Ok(OrderResult::insufficient_stock(body, items))
                    }
                    _ => Ok(OrderResult::failure(body)),
                }
            }
        }
    }

    // ========== Order creation ==========

    pub fn create_order(
        &self,
        ctx: &RequestContext,
        request: CreateOrderRequest,
    ) -> Result<OrderResult, StorageError> {
        let outcome = self.create_order_inner(ctx, request);

        if let Ok(order) = &outcome {
            // Post-commit collaborator updates; none of these can undo
            // the committed order
            if let Some(customer_id) = order.customer_id {
                self.customers
                    .update_order_stats(customer_id, order.total_amount);
                self.customers.record_timeline(
                    customer_id,
                    &format!(
                        "Placed order {} for {} {}",
                        order.order_number, order.total_amount, order.currency
                    ),
                );
            }
            if order.source == OrderSource::ChatChannel {
                self.notifier.send(Notification::AdminDirectMessage {
                    workspace_id: order.workspace_id,
                    text: format!(
                        "New chat order {}: {} {}",
                        order.order_number, order.total_amount, order.currency
                    ),
                });
            }
            self.analytics.invalidate(ctx.workspace_id, &self.window());
            tracing::info!(
                order_number = %order.order_number,
                total = %order.total_amount,
                "order created"
            );
        }

        Self::respond(outcome)
    }

    fn create_order_inner(
        &self,
        ctx: &RequestContext,
        request: CreateOrderRequest,
    ) -> ServiceResult<Order> {
        // 1. Permission
        self.check_permission(ctx, ACTION_CREATE)?;

        // 2. Payload validation, before any side effect
        validate_create_request(&request)?;

        // 3. Resolve customer
        let customer = self
            .customers
            .get_customer(request.customer_id)
            .ok_or(ServiceError::CustomerNotFound(request.customer_id))?;

        let now = self.now();

        // 4. Atomic unit of work
        let txn = self.store.begin_write()?;

        // 5. Stock check: every line, all shortfalls collected so the
        // caller sees the complete picture in one response
        let mut shortfalls = Vec::new();
        for item in &request.items {
            let record =
                stock::get_or_create(&self.store, &txn, item.variant_id, item.location_id)?;
            let requested = item.quantity as i64;
            if record.available < requested {
                shortfalls.push(UnavailableItem {
                    variant_id: item.variant_id,
                    location_id: item.location_id,
                    name: item.product.name.clone(),
                    requested,
                    available: record.available,
                });
            }
        }
        if !shortfalls.is_empty() {
            return Err(ServiceError::InsufficientStock(shortfalls));
        }

        // 6. Discount evaluation (usage is consumed at payment time)
        let cart: Vec<CartLine> = request
            .items
            .iter()
            .map(|i| CartLine {
                product_id: i.product_id,
                variant_id: i.variant_id,
                quantity: i.quantity as i64,
                unit_price: i.unit_price,
            })
            .collect();
        let (discount_amount, applied_discount) = match &request.discount_code {
            Some(raw) => {
                let code = normalize_code(raw);
                let amount = self.evaluate_discount(&txn, &code, request.customer_id, &cart, now)?;
                (amount, Some(code))
            }
            None => (Decimal::ZERO, None),
        };

        // 7. Shipping cost
        let shipping_cost = match request.shipping_cost {
            Some(explicit) => explicit,
            None => self.sum_package_fees(&request),
        };

        // 8. Order number, collision-checked
        let order_number = self.generate_order_number(&txn, now)?;

        // 9. Build and persist the aggregate
        let items: Vec<OrderLineItem> = request
            .items
            .iter()
            .map(|i| OrderLineItem {
                product_id: i.product_id,
                variant_id: i.variant_id,
                location_id: i.location_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
                line_total: round_money(i.unit_price * Decimal::from(i.quantity)),
                product: i.product.clone(),
                shipping_package_id: i.shipping_package_id,
            })
            .collect();

        let mut order = Order {
            order_number: order_number.clone(),
            workspace_id: ctx.workspace_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: Decimal::ZERO,
            shipping_cost,
            tax_amount: request.tax_amount.unwrap_or(Decimal::ZERO),
            discount_amount,
            total_amount: Decimal::ZERO,
            currency: self.config.currency.clone(),
            applied_discount: applied_discount.clone(),
            discount_code: applied_discount,
            customer_id: Some(customer.id),
            customer: CustomerSnapshot {
                name: customer.name.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
            shipping: request.shipping.clone(),
            source: request.source,
            payment_method: request.payment_method.clone(),
            tracking_number: None,
            is_archived: false,
            archived_at: None,
            paid_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            items,
        };
        order.recompute_total();

        // Reservation batch: all-or-nothing within the transaction.
        // Availability was checked above under the same write lock, so
        // a failure here means a logic error, not a race.
        for item in &order.items {
            stock::reserve(
                &self.store,
                &txn,
                item.variant_id,
                item.location_id,
                item.quantity as i64,
            )?;
        }

        self.store.put_order_txn(&txn, &order)?;
        self.store.append_history_txn(
            &txn,
            &order_number,
            HistoryAction::Created,
            json!({
                "total": order.total_amount,
                "lines": order.items.len(),
                "source": order.source,
            }),
            ctx.actor_name.clone(),
            now,
        )?;

        // 10. Commit: everything above becomes visible atomically
        txn.commit().map_err(StorageError::from)?;

        Ok(order)
    }

    /// Validate the code and compute the discount amount for the cart
    fn evaluate_discount(
        &self,
        txn: &WriteTransaction,
        code: &str,
        customer_id: i64,
        cart: &[CartLine],
        now: i64,
    ) -> ServiceResult<Decimal> {
        let rule = self
            .store
            .get_rule_txn(txn, code)?
            .ok_or_else(|| ServiceError::DiscountNotFound(code.to_string()))?;

        let per_customer_used = self
            .store
            .count_customer_usage_txn(txn, code, customer_id)?;

        match validator::validate_code(&rule, Some(customer_id), cart, per_customer_used, now) {
            Validation::Valid => {}
            Validation::Invalid(reason) => {
                return Err(ServiceError::DiscountRejected(reason.to_string()));
            }
        }

        match calculator::calculate(&rule, cart) {
            CalculationResult::Applied { total, .. } => Ok(total),
            CalculationResult::NotQualified { reason } => {
                Err(ServiceError::DiscountRejected(reason))
            }
            CalculationResult::NotImplemented { kind } => Err(ServiceError::DiscountRejected(
                format!("rule kind {:?} is not implemented", kind),
            )),
        }
    }

    /// Sum the per-line shipping package fees, falling back to the
    /// workspace default package for lines without one
    fn sum_package_fees(&self, request: &CreateOrderRequest) -> Decimal {
        let region = &request.shipping.region;
        let mut total = Decimal::ZERO;
        for item in &request.items {
            let package = item
                .shipping_package_id
                .or(self.config.default_shipping_package);
            match package {
                Some(package_id) => match self.shipping.region_fee(package_id, region) {
                    Some(fee) => total += fee,
                    None => {
                        tracing::debug!(package_id, %region, "no shipping fee configured");
                    }
                },
                None => {
                    tracing::debug!(
                        variant_id = item.variant_id,
                        "line has no shipping package and no workspace default"
                    );
                }
            }
        }
        round_money(total)
    }

    fn generate_order_number(
        &self,
        txn: &WriteTransaction,
        now: i64,
    ) -> ServiceResult<String> {
        let date = chrono::DateTime::from_timestamp_millis(now)
            .unwrap_or_else(chrono::Utc::now)
            .format("%Y%m%d")
            .to_string();
        loop {
            let count = self.store.next_order_count(txn)?;
            let candidate = format!("SO{}{:06}{}", date, count, random_suffix());
            if !self.store.order_exists_txn(txn, &candidate)? {
                return Ok(candidate);
            }
            tracing::warn!(%candidate, "order number collision, regenerating");
        }
    }

    // ========== Status transitions ==========

    pub fn update_order_status(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        new_status: OrderStatus,
    ) -> Result<OrderResult, StorageError> {
        let outcome = self.update_status_inner(ctx, order_number, new_status);
        let outcome = match outcome {
            Ok((order, auto_paid)) => {
                if auto_paid {
                    self.notify_paid(&order);
                }
                self.analytics.invalidate(ctx.workspace_id, &self.window());
                Ok(order)
            }
            Err(e) => Err(e),
        };
        Self::respond(outcome)
    }

    /// Returns the updated order and whether delivery auto-confirmed a
    /// pending payment
    fn update_status_inner(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        new_status: OrderStatus,
    ) -> ServiceResult<(Order, bool)> {
        self.check_permission(ctx, ACTION_UPDATE_STATUS)?;

        let now = self.now();
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_number)?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_string()))?;

        let from = order.status;
        if !can_transition(from, new_status) {
            // Transaction dropped: the order's status is untouched
            return Err(ServiceError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        order.status = new_status;
        order.updated_at = now;

        // Fulfillment boundary side effects, exactly once per transition
        if new_status.is_fulfilled() && !from.is_fulfilled() {
            if new_status == OrderStatus::Shipped && order.tracking_number.is_none() {
                order.tracking_number = Some(generate_tracking_number());
            }
            self.store.append_history_txn(
                &txn,
                order_number,
                HistoryAction::Fulfilled,
                json!({ "status": new_status }),
                ctx.actor_name.clone(),
                now,
            )?;
        } else if !new_status.is_fulfilled() && from.is_fulfilled() {
            self.store.append_history_txn(
                &txn,
                order_number,
                HistoryAction::Unfulfilled,
                json!({ "status": new_status }),
                ctx.actor_name.clone(),
                now,
            )?;
        }

        // Delivery auto-confirms a still-pending payment. Lenient mode:
        // an exhausted discount never blocks a delivery, the counter
        // just stays capped.
        let mut auto_paid = false;
        if new_status == OrderStatus::Delivered && order.payment_status == PaymentStatus::Pending {
            self.confirm_payment_txn(&txn, ctx, &mut order, now, false)?;
            auto_paid = true;
        }

        self.store.append_history_txn(
            &txn,
            order_number,
            HistoryAction::StatusChanged,
            json!({ "from": from, "to": new_status }),
            ctx.actor_name.clone(),
            now,
        )?;
        self.store.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        Ok((order, auto_paid))
    }

    // ========== Cancellation ==========

    pub fn cancel_order(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        reason: Option<String>,
    ) -> Result<OrderResult, StorageError> {
        let outcome = self.cancel_order_inner(ctx, order_number, reason);
        if outcome.is_ok() {
            self.analytics.invalidate(ctx.workspace_id, &self.window());
        }
        Self::respond(outcome)
    }

    fn cancel_order_inner(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        reason: Option<String>,
    ) -> ServiceResult<Order> {
        self.check_permission(ctx, ACTION_CANCEL)?;
        validate_optional_text(&reason, "reason", MAX_NOTE_LEN)?;

        let now = self.now();
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_number)?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_string()))?;

        if !order.can_be_cancelled() {
            return Err(ServiceError::NotCancellable {
                order_number: order_number.to_string(),
                status: order.status,
                payment_status: order.payment_status,
            });
        }

        // Restore exactly the quantities reserved at creation, before
        // the status flips
        for item in &order.items {
            stock::restore(
                &self.store,
                &txn,
                item.variant_id,
                item.location_id,
                item.quantity as i64,
            )?;
        }

        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(now);
        order.cancel_reason = reason.clone();
        order.updated_at = now;

        self.store.append_history_txn(
            &txn,
            order_number,
            HistoryAction::Cancelled,
            json!({ "reason": reason, "restored_lines": order.items.len() }),
            ctx.actor_name.clone(),
            now,
        )?;
        self.store.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(order)
    }

    // ========== Payment confirmation ==========

    pub fn mark_as_paid(
        &self,
        ctx: &RequestContext,
        order_number: &str,
    ) -> Result<OrderResult, StorageError> {
        let outcome = self.mark_as_paid_inner(ctx, order_number);
        if let Ok(order) = &outcome {
            self.notify_paid(order);
            self.analytics.invalidate(ctx.workspace_id, &self.window());
        }
        Self::respond(outcome)
    }

    fn mark_as_paid_inner(
        &self,
        ctx: &RequestContext,
        order_number: &str,
    ) -> ServiceResult<Order> {
        self.check_permission(ctx, ACTION_MARK_PAID)?;

        let now = self.now();
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_number)?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_string()))?;

        match order.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => {
                return Err(ServiceError::AlreadyPaid {
                    order_number: order_number.to_string(),
                });
            }
            other => {
                return Err(ServiceError::PaymentNotPending {
                    order_number: order_number.to_string(),
                    payment_status: other,
                });
            }
        }

        // Strict mode: an exhausted usage limit rejects the explicit
        // payment confirmation. The flip and the usage increment commit
        // together or not at all.
        self.confirm_payment_txn(&txn, ctx, &mut order, now, true)?;
        self.store.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(order)
    }

    /// Shared by explicit `mark_as_paid` and the delivery auto-confirm
    /// path, so discount usage increments exactly once either way
    fn confirm_payment_txn(
        &self,
        txn: &WriteTransaction,
        ctx: &RequestContext,
        order: &mut Order,
        now: i64,
        strict: bool,
    ) -> ServiceResult<()> {
        let consumed = usage::record_usage(&self.store, txn, order, now, strict)?.is_some();

        order.payment_status = PaymentStatus::Paid;
        order.paid_at = Some(now);
        order.updated_at = now;

        self.store.append_history_txn(
            txn,
            &order.order_number,
            HistoryAction::PaymentConfirmed,
            json!({ "discount_consumed": consumed }),
            ctx.actor_name.clone(),
            now,
        )?;
        Ok(())
    }

    fn notify_paid(&self, order: &Order) {
        self.notifier.send(Notification::OrderPaid {
            workspace_id: order.workspace_id,
            order_number: order.order_number.clone(),
            total: order.total_amount,
            currency: order.currency.clone(),
        });
    }

    // ========== Bulk updates ==========

    /// Bounded batch; each item is attempted independently and partial
    /// success is reported per item
    pub fn bulk_update_status(
        &self,
        ctx: &RequestContext,
        updates: &[StatusUpdate],
    ) -> Result<BulkResult, StorageError> {
        if let Err(e) = self.check_permission(ctx, ACTION_UPDATE_STATUS) {
            return Ok(BulkResult::rejected(e.to_body()));
        }
        if updates.len() > self.config.bulk_update_cap {
            let err = ServiceError::BatchTooLarge {
                size: updates.len(),
                cap: self.config.bulk_update_cap,
            };
            return Ok(BulkResult::rejected(err.to_body()));
        }

        let mut successful_count = 0;
        let mut failed = Vec::new();
        for update in updates {
            match self.update_status_inner(ctx, &update.order_number, update.new_status) {
                Ok((order, auto_paid)) => {
                    successful_count += 1;
                    if auto_paid {
                        self.notify_paid(&order);
                    }
                }
                Err(ServiceError::Storage(e)) => return Err(e),
                Err(err) => failed.push(BulkFailure {
                    order_number: update.order_number.clone(),
                    error: err.to_body(),
                }),
            }
        }

        self.analytics.invalidate(ctx.workspace_id, &self.window());
        Ok(BulkResult {
            successful_count,
            failed,
            error: None,
        })
    }

    // ========== Archival ==========

    pub fn archive_order(
        &self,
        ctx: &RequestContext,
        order_number: &str,
    ) -> Result<OrderResult, StorageError> {
        Self::respond(self.set_archived(ctx, order_number, true))
    }

    pub fn unarchive_order(
        &self,
        ctx: &RequestContext,
        order_number: &str,
    ) -> Result<OrderResult, StorageError> {
        Self::respond(self.set_archived(ctx, order_number, false))
    }

    fn set_archived(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        archived: bool,
    ) -> ServiceResult<Order> {
        self.check_permission(ctx, ACTION_ARCHIVE)?;

        let now = self.now();
        let txn = self.store.begin_write()?;
        let mut order = self
            .store
            .get_order_txn(&txn, order_number)?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_string()))?;

        if archived {
            if !order.can_be_archived() {
                return Err(ServiceError::NotArchivable {
                    order_number: order_number.to_string(),
                    status: order.status,
                });
            }
            if order.is_archived {
                return Err(ServiceError::validation("order", "already archived"));
            }
            order.is_archived = true;
            order.archived_at = Some(now);
        } else {
            if !order.is_archived {
                return Err(ServiceError::validation("order", "not archived"));
            }
            order.is_archived = false;
            order.archived_at = None;
        }
        order.updated_at = now;

        self.store.append_history_txn(
            &txn,
            order_number,
            if archived {
                HistoryAction::Archived
            } else {
                HistoryAction::Unarchived
            },
            json!({}),
            ctx.actor_name.clone(),
            now,
        )?;
        self.store.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(order)
    }

    // ========== Timeline ==========

    pub fn add_comment(
        &self,
        ctx: &RequestContext,
        order_number: &str,
        body: &str,
    ) -> ServiceResult<OrderComment> {
        self.check_permission(ctx, ACTION_COMMENT)?;
        validate_required_text(body, "body", MAX_NOTE_LEN)?;

        let now = self.now();
        let txn = self.store.begin_write()?;
        if self.store.get_order_txn(&txn, order_number)?.is_none() {
            return Err(ServiceError::OrderNotFound(order_number.to_string()));
        }
        let author = ctx
            .actor_name
            .clone()
            .unwrap_or_else(|| format!("user-{}", ctx.actor_id));
        let comment = self
            .store
            .append_comment_txn(&txn, order_number, author, body.to_string(), now)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(comment)
    }

    /// Merged history + comments, newest first
    pub fn timeline(&self, order_number: &str) -> ServiceResult<Vec<TimelineEntry>> {
        if self.store.get_order(order_number)?.is_none() {
            return Err(ServiceError::OrderNotFound(order_number.to_string()));
        }
        let history = self.store.history_for_order(order_number)?;
        let comments = self.store.comments_for_order(order_number)?;
        Ok(merge_timeline(history, comments))
    }

    // ========== Reads ==========

    pub fn get_order(&self, order_number: &str) -> Result<Option<Order>, StorageError> {
        self.store.get_order(order_number)
    }

    pub fn store(&self) -> &CommerceStore {
        &self.store
    }
}

/// Field-level validation of the creation payload
fn validate_create_request(request: &CreateOrderRequest) -> ServiceResult<()> {
    if request.items.is_empty() {
        return Err(ServiceError::validation("items", "must not be empty"));
    }
    for (idx, item) in request.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(ServiceError::validation(
                format!("items[{}].quantity", idx),
                format!("must be positive, got {}", item.quantity),
            ));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::validation(
                format!("items[{}].unit_price", idx),
                "must be non-negative",
            ));
        }
        validate_required_text(
            &item.product.name,
            &format!("items[{}].product.name", idx),
            MAX_NAME_LEN,
        )?;
    }
    validate_required_text(&request.payment_method, "payment_method", MAX_NAME_LEN)?;
    validate_required_text(&request.shipping.recipient, "shipping.recipient", MAX_NAME_LEN)?;
    validate_required_text(&request.shipping.region, "shipping.region", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&request.shipping.address, "shipping.address", MAX_ADDRESS_LEN)?;
    validate_optional_text(
        &request.discount_code,
        "discount_code",
        MAX_SHORT_TEXT_LEN,
    )?;
    if let Some(cost) = request.shipping_cost
        && cost < Decimal::ZERO
    {
        return Err(ServiceError::validation(
            "shipping_cost",
            "must be non-negative",
        ));
    }
    if let Some(tax) = request.tax_amount
        && tax < Decimal::ZERO
    {
        return Err(ServiceError::validation("tax_amount", "must be non-negative"));
    }
    Ok(())
}

fn generate_tracking_number() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("TRK-{}", id[..12].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        AllowAll, DenyAll, FlatRates, InMemoryCustomers, RecordingAnalytics,
    };
    use shared::models::{Customer, ProductSnapshot, ShippingInfo};
    use shared::money::cents;
    use shared::request::OrderItemRequest;

    fn make_customer(id: i64) -> Customer {
        Customer {
            id,
            name: format!("Customer {}", id),
            email: Some(format!("c{}@example.com", id)),
            phone: None,
            orders_count: 0,
            total_spent: Decimal::ZERO,
        }
    }

    struct Fixture {
        service: OrderService,
        customers: Arc<InMemoryCustomers>,
        analytics: Arc<RecordingAnalytics>,
    }

    fn make_service() -> Fixture {
        let store = CommerceStore::open_in_memory().unwrap();
        let customers = Arc::new(InMemoryCustomers::new());
        customers.insert(make_customer(1));
        let analytics = Arc::new(RecordingAnalytics::new());
        let rates = Arc::new(FlatRates::new());
        rates.set_fee(1, "north", cents(500));
        let service = OrderService::new(
            store,
            Config::default(),
            Arc::new(AllowAll),
            rates,
            customers.clone(),
            analytics.clone(),
            NotificationSender::disabled(),
        );
        Fixture {
            service,
            customers,
            analytics,
        }
    }

    fn seed_stock(service: &OrderService, variant: i64, location: i64, on_hand: i64) {
        let txn = service.store().begin_write().unwrap();
        stock::set_level(service.store(), &txn, variant, location, on_hand).unwrap();
        txn.commit().unwrap();
    }

    fn ctx() -> RequestContext {
        RequestContext {
            actor_id: 1,
            actor_name: Some("Ops".to_string()),
            workspace_id: 1,
        }
    }

    fn simple_item(variant: i64, quantity: i32, price: Decimal) -> OrderItemRequest {
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
            shipping_package_id: Some(1),
        }
    }

    fn simple_request(items: Vec<OrderItemRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: 1,
            shipping: ShippingInfo {
                recipient: "Ada".to_string(),
                phone: None,
                region: "north".to_string(),
                address: Some("1 Main St".to_string()),
            },
            items,
            payment_method: "cash".to_string(),
            source: OrderSource::Storefront,
            discount_code: None,
            shipping_cost: None,
            tax_amount: None,
        }
    }

    #[test]
    fn test_create_order_success() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 10);

        let result = fx
            .service
            .create_order(&ctx(), simple_request(vec![simple_item(1, 2, cents(1000))]))
            .unwrap();
        assert!(result.success, "{:?}", result.error);

        let order = result.order.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.subtotal, cents(2000));
        // Per-line package fee
        assert_eq!(order.shipping_cost, cents(500));
        assert!(order.totals_consistent());
        assert!(order.order_number.starts_with("SO"));

        // Stock reserved
        let record = fx.service.store().get_stock(1, 1).unwrap().unwrap();
        assert_eq!(record.available, 8);

        // Customer stats updated post-commit
        let customer = fx.customers.get_customer(1).unwrap();
        assert_eq!(customer.orders_count, 1);
        assert_eq!(customer.total_spent, order.total_amount);
        assert_eq!(fx.customers.timeline_for(1).len(), 1);

        // Analytics invalidated
        assert_eq!(fx.analytics.take().len(), 1);
    }

    #[test]
    fn test_create_order_empty_items_rejected() {
        let fx = make_service();
        let result = fx
            .service
            .create_order(&ctx(), simple_request(vec![]))
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().code,
            shared::response::ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn test_create_order_unknown_customer() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 10);
        let mut request = simple_request(vec![simple_item(1, 1, cents(1000))]);
        request.customer_id = 99;
        let result = fx.service.create_order(&ctx(), request).unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().code,
            shared::response::ErrorCode::CustomerNotFound
        );
    }

    #[test]
    fn test_create_order_reports_every_shortfall() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 1);
        seed_stock(&fx.service, 2, 1, 0);

        let result = fx
            .service
            .create_order(
                &ctx(),
                simple_request(vec![
                    simple_item(1, 5, cents(1000)),
                    simple_item(2, 1, cents(500)),
                ]),
            )
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.unavailable_items.len(), 2);
        // No partial reservation
        assert_eq!(fx.service.store().get_stock(1, 1).unwrap().unwrap().available, 1);
    }

    #[test]
    fn test_permission_denied_surfaces() {
        let store = CommerceStore::open_in_memory().unwrap();
        let customers = Arc::new(InMemoryCustomers::new());
        customers.insert(make_customer(1));
        let service = OrderService::new(
            store,
            Config::default(),
            Arc::new(DenyAll),
            Arc::new(crate::collaborators::NoShipping),
            customers,
            Arc::new(crate::collaborators::NullAnalytics),
            NotificationSender::disabled(),
        );
        let result = service
            .create_order(&ctx(), simple_request(vec![simple_item(1, 1, cents(100))]))
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().code,
            shared::response::ErrorCode::PermissionDenied
        );
    }

    #[test]
    fn test_explicit_shipping_cost_wins() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 10);
        let mut request = simple_request(vec![simple_item(1, 1, cents(1000))]);
        request.shipping_cost = Some(cents(999));
        let order = fx
            .service
            .create_order(&ctx(), request)
            .unwrap()
            .order
            .unwrap();
        assert_eq!(order.shipping_cost, cents(999));
    }

    #[test]
    fn test_order_numbers_are_unique() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 100);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let order = fx
                .service
                .create_order(&ctx(), simple_request(vec![simple_item(1, 1, cents(100))]))
                .unwrap()
                .order
                .unwrap();
            assert!(seen.insert(order.order_number));
        }
    }

    #[test]
    fn test_comment_and_timeline() {
        let fx = make_service();
        seed_stock(&fx.service, 1, 1, 10);
        let order = fx
            .service
            .create_order(&ctx(), simple_request(vec![simple_item(1, 1, cents(100))]))
            .unwrap()
            .order
            .unwrap();

        fx.service
            .add_comment(&ctx(), &order.order_number, "called the customer")
            .unwrap();
        let timeline = fx.service.timeline(&order.order_number).unwrap();
        // Created entry + comment
        assert_eq!(timeline.len(), 2);
        assert!(matches!(timeline[0], TimelineEntry::Comment(_)));

        assert!(matches!(
            fx.service.timeline("SO-MISSING"),
            Err(ServiceError::OrderNotFound(_))
        ));
    }
}
