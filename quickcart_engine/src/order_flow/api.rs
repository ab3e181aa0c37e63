use std::fmt::Debug;

use log::*;
use qc_common::Money;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderStatusType},
    helpers::generate_order_id,
    order_flow::OrderFlowError,
    order_objects::{NewOrderRequest, OrderQueryFilter, OrderSearchResult, OrderView, PaymentInitResult, Pagination},
    traits::{
        IdentityResolver,
        NewCharge,
        OrderManagement,
        PaymentEventType,
        PaymentGateway,
        StatusManagement,
        StatusTransition,
    },
};

/// The result of applying a webhook event.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The event changed the order's state.
    Applied(Order),
    /// The order had already settled; nothing changed. Webhook delivery is at-least-once and unordered, so this is
    /// routine.
    AlreadyApplied(Order),
    /// The event type is not one the engine acts on. Accepted and ignored.
    Ignored(String),
}

/// `OrderFlowApi` is the primary API for placing orders and reconciling them with payment outcomes.
///
/// It validates requests, computes authoritative totals, and drives each order through its status transitions in
/// response to synchronous confirmation calls and asynchronous webhook events from the payment provider.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: OrderManagement + StatusManagement,
    G: PaymentGateway,
{
    /// Seeds the status registry. Idempotent; must run before the orchestrator accepts traffic.
    pub async fn bootstrap(&self) -> Result<(), OrderFlowError> {
        let inserted = self.db.seed_statuses_if_empty(&OrderStatusType::ALL).await?;
        if inserted > 0 {
            info!("🔄️🏷️ Status registry seeded with {inserted} statuses");
        } else {
            debug!("🔄️🏷️ Status registry already seeded. Nothing to do.");
        }
        Ok(())
    }

    /// Places a new order on behalf of the caller identified by `token`.
    ///
    /// The flow is:
    /// 1. Resolve the caller identity from the token.
    /// 2. Validate the request (at least one line item; positive quantities and prices; sane discounts).
    /// 3. Recompute the total as `Σ(unit_price − discount)`. The caller-supplied total is never used for charging.
    /// 4. Create a payment authorization for the computed total.
    /// 5. Persist the order with a fresh id, `PENDING` status, the authorization id, and the line items.
    ///
    /// Creation is atomic from the caller's view: if the gateway call fails the order is not persisted, and if
    /// persistence fails the fresh authorization is cancelled on a best-effort basis.
    pub async fn create_order<A: IdentityResolver>(
        &self,
        request: NewOrderRequest,
        token: &str,
        identity: &A,
    ) -> Result<PaymentInitResult, OrderFlowError> {
        let customer_id = identity.resolve_token(token).await?;
        self.create_order_for_customer(request, &customer_id).await
    }

    /// As [`Self::create_order`], for a caller identity that has already been resolved.
    pub async fn create_order_for_customer(
        &self,
        request: NewOrderRequest,
        customer_id: &str,
    ) -> Result<PaymentInitResult, OrderFlowError> {
        validate_order_request(&request)?;
        let total = order_total(&request.items);
        if let Some(caller_total) = request.total_amount {
            if caller_total != total {
                debug!(
                    "🔄️📦️ Caller-supplied total {caller_total} differs from computed total {total}. Using the \
                     computed value."
                );
            }
        }
        // The PENDING status must be present before we go anywhere near the gateway.
        let pending = OrderStatusType::Pending;
        if self.db.find_status_by_name(pending.as_str()).await?.is_none() {
            return Err(OrderFlowError::ConfigurationError(format!(
                "Order status {pending} has not been seeded. Contact an administrator to resolve this issue."
            )));
        }
        let currency = request.currency.clone().unwrap_or_else(|| qc_common::DEFAULT_CURRENCY_CODE.to_string());
        let mut charge = NewCharge::new(total, currency.clone());
        if let Some(pm) = request.payment_method_id.clone() {
            charge = charge.with_payment_method(pm, request.auto_confirm);
        }
        if let Some(email) = request.receipt_email.clone() {
            charge = charge.with_receipt_email(email);
        }
        let auth = self.gateway.create_authorization(charge).await?;
        debug!("🔄️📦️ Payment authorization [{}] created for {total} ({})", auth.id, auth.status);
        let order_id = generate_order_id();
        let new_order = NewOrder::new(order_id.clone(), customer_id.to_string(), total, auth.id.clone())
            .with_currency(currency);
        match self.db.insert_order(new_order, request.items).await {
            Ok(order) => {
                info!("🔄️📦️ Order [{}] created for customer {customer_id} with total {total}", order.order_id);
                Ok(PaymentInitResult {
                    order_id: order.order_id,
                    authorization_id: auth.id,
                    client_secret: auth.client_secret,
                    status: auth.status.to_string(),
                    amount_minor: auth.amount_minor,
                    currency: auth.currency,
                })
            },
            Err(e) => {
                warn!("🔄️📦️ Order [{order_id}] could not be persisted. Cancelling authorization [{}]. {e}", auth.id);
                if let Err(cancel_err) = self.gateway.cancel(&auth.id).await {
                    error!(
                        "🔄️📦️ Could not cancel authorization [{}] after a failed order insert. An operator must \
                         reconcile this authorization manually. {cancel_err}",
                        auth.id
                    );
                }
                Err(e.into())
            },
        }
    }

    /// The synchronous confirmation path: confirms the authorization with the provider and projects the returned
    /// provider status onto the order, recording the raw provider status in the remark trail.
    pub async fn confirm_payment_and_update_order(&self, auth_id: &str) -> Result<Order, OrderFlowError> {
        let auth = self.gateway.confirm(auth_id).await?;
        let order = self
            .db
            .fetch_order_by_auth_id(auth_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(format!("No order for payment authorization {auth_id}")))?;
        let new_status = OrderStatusType::from_provider(&auth.status);
        let remark = format!("Payment Status: {}", auth.status);
        let order = self.db.transition_status(&order.order_id, new_status, Some(remark)).await?;
        info!("🔄️✅️ Order [{}] moved to {new_status} after confirmation of [{auth_id}]", order.order_id);
        Ok(order)
    }

    /// Forces the order referencing `auth_id` into `PAYMENT_FAILED`, recording the reason in the remark trail.
    pub async fn handle_failed_payment(&self, auth_id: &str, reason: &str) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_auth_id(auth_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(format!("No order for payment authorization {auth_id}")))?;
        let remark = format!("Payment Failed: {reason}");
        let order = self.db.transition_status(&order.order_id, OrderStatusType::PaymentFailed, Some(remark)).await?;
        warn!("🔄️❌️ Order [{}] marked as payment-failed. Reason: {reason}", order.order_id);
        Ok(order)
    }

    /// Verifies and applies a webhook event from the payment provider.
    ///
    /// Delivery is at-least-once and unordered, so every branch is idempotent: re-applying `succeeded` to an order
    /// that is already `CONFIRMED` is a no-op, not an error. Unknown event types are accepted and ignored for
    /// forward compatibility with provider event additions.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, OrderFlowError> {
        let event = self.gateway.verify_and_parse_event(payload, signature_header).await?;
        let auth_id = event.authorization_id.clone();
        match event.event_type {
            PaymentEventType::PaymentSucceeded => {
                let order = self.db.fetch_order_by_auth_id(&auth_id).await?.ok_or_else(|| {
                    OrderFlowError::OrderNotFound(format!("No order for payment authorization {auth_id}"))
                })?;
                let remark = "Payment Status: succeeded".to_string();
                let transition = self
                    .db
                    .transition_status_checked(&order.order_id, OrderStatusType::Confirmed, Some(remark), |current| {
                        current != OrderStatusType::Confirmed
                    })
                    .await?;
                match transition {
                    StatusTransition::Applied(order) => {
                        info!("🔄️✅️ Order [{}] confirmed by provider webhook", order.order_id);
                        Ok(WebhookOutcome::Applied(order))
                    },
                    StatusTransition::Refused(order) => {
                        debug!("🔄️✅️ Order [{}] is already confirmed. Ignoring re-delivered event.", order.order_id);
                        Ok(WebhookOutcome::AlreadyApplied(order))
                    },
                }
            },
            PaymentEventType::PaymentFailed | PaymentEventType::PaymentCanceled => {
                let reason = if event.event_type == PaymentEventType::PaymentCanceled {
                    "canceled".to_string()
                } else {
                    event.reason.clone().unwrap_or_else(|| "payment failed".to_string())
                };
                let order = self.db.fetch_order_by_auth_id(&auth_id).await?.ok_or_else(|| {
                    OrderFlowError::OrderNotFound(format!("No order for payment authorization {auth_id}"))
                })?;
                // A late failure event must not override an outcome that has already settled. The guard runs
                // inside the write transaction, so a concurrent confirmation cannot be clobbered by a stale read.
                let remark = format!("Payment Failed: {reason}");
                let transition = self
                    .db
                    .transition_status_checked(
                        &order.order_id,
                        OrderStatusType::PaymentFailed,
                        Some(remark),
                        |current| !current.is_terminal(),
                    )
                    .await?;
                match transition {
                    StatusTransition::Applied(order) => {
                        warn!(
                            "🔄️❌️ Order [{}] marked as payment-failed by provider webhook. Reason: {reason}",
                            order.order_id
                        );
                        Ok(WebhookOutcome::Applied(order))
                    },
                    StatusTransition::Refused(order) => {
                        if order.status == OrderStatusType::PaymentFailed {
                            debug!(
                                "🔄️🪝️ Order [{}] is already payment-failed. Ignoring re-delivered event.",
                                order.order_id
                            );
                        } else {
                            warn!(
                                "🔄️🪝️ Late failure event for order [{}], which has already settled as {}. Leaving \
                                 it untouched.",
                                order.order_id, order.status
                            );
                        }
                        Ok(WebhookOutcome::AlreadyApplied(order))
                    },
                }
            },
            PaymentEventType::Other(event_type) => {
                debug!("🔄️🪝️ Ignoring webhook event type {event_type} for authorization [{auth_id}]");
                Ok(WebhookOutcome::Ignored(event_type))
            },
        }
    }

    /// An explicit admin status override. The target status name must exist in the registry.
    pub async fn modify_status_for_order(&self, oid: &OrderId, status_name: &str) -> Result<Order, OrderFlowError> {
        let new_status: OrderStatusType = status_name
            .parse()
            .map_err(|_| OrderFlowError::InvalidRequest(format!("{status_name} is not a valid order status")))?;
        if self.db.find_status_by_name(new_status.as_str()).await?.is_none() {
            return Err(OrderFlowError::ConfigurationError(format!(
                "Order status {new_status} has not been seeded. Contact an administrator to resolve this issue."
            )));
        }
        let order = self.db.transition_status(oid, new_status, None).await?;
        info!("🔄️🏷️ Order [{oid}] status manually set to {new_status}");
        Ok(order)
    }

    /// Appends an entry to the order's remark trail. The trail is append-only; existing entries are never rewritten.
    pub async fn modify_remark_for_order(&self, oid: &OrderId, remark: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.append_remark(oid, remark).await?;
        debug!("🔄️📝️ Remark appended to order [{oid}]");
        Ok(order)
    }

    /// Re-dates the order and recomputes its total from its own stored line items. Caller-supplied totals are never
    /// persisted.
    pub async fn refresh_order(&self, oid: &OrderId) -> Result<Order, OrderFlowError> {
        let items = self.db.fetch_line_items_for_order(oid).await?;
        let total = items.iter().map(|i| i.unit_price - i.discount).sum::<Money>();
        let order = self.db.refresh_order(oid, total).await?;
        info!("🔄️📦️ Order [{oid}] refreshed. Total recomputed as {total}.");
        Ok(order)
    }

    /// Deletes the order unconditionally.
    ///
    /// Deleting an order with a committed payment is almost certainly an operator mistake, but the policy decision
    /// to forbid it has not been taken; the engine logs a warning instead.
    pub async fn delete_order(&self, oid: &OrderId) -> Result<(), OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_id(oid)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(oid.to_string()))?;
        if order.status.is_financially_committed() {
            warn!(
                "🔄️🗑️ Order [{oid}] is being deleted while in {} with live authorization [{}]",
                order.status, order.payment_auth_id
            );
        }
        self.db.delete_order(oid).await?;
        info!("🔄️🗑️ Order [{oid}] deleted");
        Ok(())
    }

    /// Materializes the order, its line items and current status name into a read view.
    pub async fn fetch_order(&self, oid: &OrderId) -> Result<OrderView, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_id(oid)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(oid.to_string()))?;
        let items = self.db.fetch_line_items_for_order(oid).await?;
        Ok(OrderView::new(order, items))
    }

    /// Paginated search over orders, returning the total match count together with the materialized page.
    pub async fn search_orders(
        &self,
        query: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderSearchResult, OrderFlowError> {
        let count = self.db.search_count(query.clone()).await?;
        let orders = self.db.search_orders(query, pagination).await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.db.fetch_line_items_for_order(&order.order_id).await?;
            views.push(OrderView::new(order, items));
        }
        Ok(OrderSearchResult { count, orders: views })
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

/// Computes the authoritative order total, `Σ(unit_price − discount)` over the line items.
pub fn order_total(items: &[NewLineItem]) -> Money {
    items.iter().map(|i| i.unit_price - i.discount).sum()
}

fn validate_order_request(request: &NewOrderRequest) -> Result<(), OrderFlowError> {
    if request.items.is_empty() {
        return Err(OrderFlowError::InvalidRequest("Order must contain at least one line item".into()));
    }
    for item in &request.items {
        if item.product_id.trim().is_empty() {
            return Err(OrderFlowError::InvalidRequest("product_id must not be empty".into()));
        }
        if item.qty <= 0 {
            return Err(OrderFlowError::InvalidRequest(format!(
                "qty must be greater than zero for product {}",
                item.product_id
            )));
        }
        if !item.unit_price.is_positive() {
            return Err(OrderFlowError::InvalidRequest(format!(
                "unit_price must be greater than zero for product {}",
                item.product_id
            )));
        }
        if item.discount.is_negative() {
            return Err(OrderFlowError::InvalidRequest(format!(
                "discount cannot be negative for product {}",
                item.product_id
            )));
        }
        if item.discount >= item.unit_price {
            return Err(OrderFlowError::InvalidRequest(format!(
                "discount must be less than unit_price for product {}",
                item.product_id
            )));
        }
    }
    Ok(())
}
