use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use futures::future::try_join_all;
use kohi_common::Vnd;
use log::*;

use crate::{
    api::{
        errors::OrderFlowError,
        order_objects::{OrderDetail, OrderItemDetail, OrderPage, Pagination, PaymentReturnResult},
    },
    db_types::{Meal, NewOrderItem, Order, OrderStatusType, PaymentStatusType},
    events::{EventProducers, NewOrderEvent, OrderPaidEvent, OrderStatusChangedEvent},
    traits::{MealCatalog, OrderManagementDatabase},
    vnpay,
    vnpay::{PaymentUrlParams, VnPayConfig},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: creation, payment URL issuance, gateway callback
/// reconciliation, staff claiming and status transitions.
pub struct OrderFlowApi<B> {
    db: B,
    vnpay: VnPayConfig,
    producers: EventProducers,
}

impl<B> std::fmt::Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, vnpay: VnPayConfig, producers: EventProducers) -> Self {
        Self { db, vnpay, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagementDatabase + MealCatalog
{
    /// Creates a new order from a sequence of meal ids (repeats are collapsed into quantities).
    ///
    /// Meals that do not exist or are unavailable are silently dropped; the customer gets what the kitchen can
    /// make. If nothing remains after filtering, the order is rejected with [`OrderFlowError::EmptyOrder`].
    /// The order and its line items are persisted in a single transaction with the meal prices frozen onto the
    /// line items. A signed gateway redirect URL for the payable total is stored on the order and returned as part
    /// of the order detail. A `NewOrderEvent` is published once everything has committed.
    pub async fn create_order(&self, meal_ids: &[i64], client_ip: &str) -> Result<OrderDetail, OrderFlowError> {
        let mut quantities: BTreeMap<i64, i64> = BTreeMap::new();
        for id in meal_ids {
            *quantities.entry(*id).or_insert(0) += 1;
        }
        // Distinct meal lookups have no ordering dependency, so they run concurrently.
        let lookups = quantities.keys().map(|id| self.db.fetch_meal_by_id(*id));
        let meals: Vec<Meal> = try_join_all(lookups).await?.into_iter().flatten().filter(|m| m.is_available).collect();
        if meals.is_empty() {
            debug!("🍽️ Order request had no available meals. Rejecting.");
            return Err(OrderFlowError::EmptyOrder);
        }
        let items = meals
            .iter()
            .map(|meal| NewOrderItem::new(meal.id, quantities[&meal.id], meal.price))
            .collect::<Vec<NewOrderItem>>();
        let total: Vnd = items.iter().map(NewOrderItem::line_total).sum();
        let order = self.db.create_order(items).await?;
        debug!("🍽️ Order #{} created with {} line items, total {total}", order.id, meals.len());
        let params = PaymentUrlParams::new(order.id, total, client_ip, order.created_at);
        let payment_url = vnpay::build_payment_url(&self.vnpay, &params)?;
        self.db.update_payment_url(order.id, &payment_url).await?;
        let order = self
            .db
            .fetch_order_by_id(order.id)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order.id))?;
        let detail = self.assemble_detail(order.clone()).await?;
        self.call_new_order_hook(&order).await;
        Ok(detail)
    }

    /// Recomputes the signed gateway redirect URL for an order whose payment is still pending.
    ///
    /// The amount is summed from the frozen line-item prices, so later catalog price changes never move it. The
    /// create-date and client IP are fresh on every call, which keeps the URL within the gateway's validity
    /// window. The refreshed URL replaces the stored one.
    pub async fn payment_url_for_order(&self, order_id: i64, client_ip: &str) -> Result<String, OrderFlowError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.payment_status.is_terminal() {
            return Err(OrderFlowError::PaymentNotPending(order_id));
        }
        let total = self.db.fetch_order_total(order_id).await?;
        let params = PaymentUrlParams::new(order_id, total, client_ip, Utc::now());
        let payment_url = vnpay::build_payment_url(&self.vnpay, &params)?;
        self.db.update_payment_url(order_id, &payment_url).await?;
        trace!("💳️ Refreshed payment URL for order #{order_id}");
        Ok(payment_url)
    }

    /// Processes a gateway return callback.
    ///
    /// The signature is verified first; a mismatch aborts with [`OrderFlowError::InvalidSignature`] and no order
    /// state is touched. Valid callbacks settle the payment through an atomic conditional update, so a replayed
    /// callback (gateways deliver at least once) or a concurrent duplicate finds the payment already terminal and
    /// returns the stored outcome without mutating anything.
    pub async fn handle_payment_return(
        &self,
        query_params: &HashMap<String, String>,
    ) -> Result<PaymentReturnResult, OrderFlowError> {
        let callback = vnpay::verify_callback(&self.vnpay, query_params).map_err(|e| {
            warn!("💳️ Rejected payment callback: {e}");
            e
        })?;
        let order_id = callback
            .txn_ref
            .parse::<i64>()
            .map_err(|_| OrderFlowError::MalformedCallback(format!("vnp_TxnRef {} is not an order id", callback.txn_ref)))?;
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.payment_status.is_terminal() {
            debug!("💳️ Callback replay for order #{order_id}; payment already {}", order.payment_status);
            return Ok(replay_result(&order, &callback));
        }
        let new_status =
            if callback.is_success() { PaymentStatusType::Paid } else { PaymentStatusType::Failed };
        let settled = self.db.settle_payment(order_id, new_status).await?;
        if !settled {
            // A concurrent delivery of the same callback won the conditional update. Report what it stored.
            let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
            debug!("💳️ Lost settlement race for order #{order_id}; payment is {}", order.payment_status);
            return Ok(replay_result(&order, &callback));
        }
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        info!("💳️ Payment for order #{order_id} settled as {new_status}");
        if new_status == PaymentStatusType::Paid {
            self.call_order_paid_hook(&order).await;
        }
        let message = if callback.is_success() {
            format!("Payment for order #{order_id} completed")
        } else {
            format!("Payment for order #{order_id} failed with gateway code {}", callback.response_code)
        };
        Ok(PaymentReturnResult {
            order_id,
            payment_status: new_status,
            message,
            bank_code: callback.bank_code,
            amount: callback.amount,
            new_settlement: true,
        })
    }

    /// Claims the order for a staff member.
    ///
    /// The claim is an exclusive, single-writer assignment backed by an atomic conditional update at the
    /// persistence layer. Claiming an order you already hold is a no-op success; an order held by someone else
    /// yields [`OrderFlowError::AlreadyClaimed`].
    pub async fn claim_order(&self, order_id: i64, staff_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.staff_id == Some(staff_id) {
            trace!("🧑‍🍳️ Staff #{staff_id} re-claimed order #{order_id}");
            return Ok(order);
        }
        let claimed = self.db.claim_order(order_id, staff_id).await?;
        if !claimed {
            debug!("🧑‍🍳️ Staff #{staff_id} lost the claim race for order #{order_id}");
            return Err(OrderFlowError::AlreadyClaimed(order_id));
        }
        info!("🧑‍🍳️ Order #{order_id} is now the responsibility of staff #{staff_id}");
        self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    /// Applies a staff-driven status transition.
    ///
    /// Only the legal forward transitions of [`OrderStatusType::can_transition_to`] are accepted; same-state and
    /// backward changes are rejected with [`OrderFlowError::InvalidTransition`]. The write itself is an atomic
    /// conditional update keyed on the status that was validated, so two staff racing from the same state cannot
    /// both land their transition, and a stale write can never overwrite a terminal state. Publishes an
    /// `OrderStatusChangedEvent` after the change commits and returns the full order detail.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        staff_id: i64,
        new_status: OrderStatusType,
    ) -> Result<OrderDetail, OrderFlowError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let old_status = order.order_status;
        if !old_status.can_transition_to(new_status) {
            debug!("🧑‍🍳️ Staff #{staff_id} requested illegal transition {old_status} -> {new_status} on order #{order_id}");
            return Err(OrderFlowError::InvalidTransition { from: old_status, to: new_status });
        }
        let updated = self.db.update_order_status(order_id, old_status, new_status).await?;
        if !updated {
            // A concurrent request moved the order between our read and the conditional write.
            let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
            debug!(
                "🧑‍🍳️ Order #{order_id} is now {} so the {old_status} -> {new_status} transition requested by staff \
                 #{staff_id} no longer applies",
                order.order_status
            );
            return Err(OrderFlowError::InvalidTransition { from: order.order_status, to: new_status });
        }
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        info!("🧑‍🍳️ Order #{order_id} moved {old_status} -> {new_status} by staff #{staff_id}");
        self.call_status_changed_hook(&order, old_status).await;
        self.assemble_detail(order).await
    }

    /// Fetches the full detail of a single order.
    pub async fn order_by_id(&self, order_id: i64) -> Result<OrderDetail, OrderFlowError> {
        let order = self.db.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        self.assemble_detail(order).await
    }

    /// Offset-paginated order listing, optionally filtered on whether a staff member has claimed the order.
    ///
    /// Each order in the page is returned in full detail, with its line items resolved against the catalog, and
    /// the envelope echoes the page and size the listing was built from.
    pub async fn fetch_orders(
        &self,
        pagination: Pagination,
        claimed: Option<bool>,
    ) -> Result<OrderPage, OrderFlowError> {
        let orders = self.db.fetch_orders(pagination, claimed).await?;
        let details = try_join_all(orders.into_iter().map(|order| self.assemble_detail(order))).await?;
        Ok(OrderPage { page: pagination.page, size: pagination.size, orders: details })
    }

    /// Resolves the line items of an order against the catalog's display metadata.
    async fn assemble_detail(&self, order: Order) -> Result<OrderDetail, OrderFlowError> {
        let items = self.db.fetch_order_items(order.id).await?;
        let lookups = items.iter().map(|i| self.db.fetch_meal_by_id(i.meal_id));
        let meals: HashMap<i64, Meal> =
            try_join_all(lookups).await?.into_iter().flatten().map(|m| (m.id, m)).collect();
        let details = items
            .iter()
            .filter_map(|item| meals.get(&item.meal_id).map(|meal| OrderItemDetail::from_parts(item, meal)))
            .collect();
        Ok(OrderDetail::from_parts(order, details))
    }

    async fn call_new_order_hook(&self, order: &Order) {
        for emitter in &self.producers.new_order_producer {
            trace!("📬️ Notifying new-order hook subscribers");
            emitter.publish_event(NewOrderEvent::new(order.clone())).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            trace!("📬️ Notifying order-paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_status_changed_hook(&self, order: &Order, old_status: OrderStatusType) {
        for emitter in &self.producers.status_changed_producer {
            trace!("📬️ Notifying status-changed hook subscribers");
            emitter.publish_event(OrderStatusChangedEvent::new(order.clone(), old_status)).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

fn replay_result(order: &Order, callback: &vnpay::CallbackResult) -> PaymentReturnResult {
    PaymentReturnResult {
        order_id: order.id,
        payment_status: order.payment_status,
        message: format!("Payment for order #{} was already processed as {}", order.id, order.payment_status),
        bank_code: callback.bank_code.clone(),
        amount: callback.amount,
        new_settlement: false,
    }
}
