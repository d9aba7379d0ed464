//! Business rules around order creation and mutation, independent of
//! transport.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::order;
use crate::errors::ServiceError;
use crate::models::OrderStatus;
use crate::pricing::{self, LineItem};
use crate::repositories::{NewOrderItem, OrderRecord, OrderRepository};

/// One cart line as submitted at checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrderItem {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Aggregate pricing as the client computed it. Never authoritative; kept
/// only to detect drift between cart display and server-side pricing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientQuote {
    pub subtotal: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
}

#[derive(Clone)]
pub struct OrderService {
    repository: OrderRepository,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            repository: OrderRepository::new(db),
        }
    }

    /// Places an order: validates the cart, prices it server-side, and
    /// persists the aggregate atomically.
    #[instrument(skip(self, items, client_quote), fields(user_id = user_id, item_count = items.len()))]
    pub async fn place_order(
        &self,
        user_id: i64,
        items: Vec<PlaceOrderItem>,
        shipping_address: Option<String>,
        client_quote: Option<ClientQuote>,
    ) -> Result<OrderRecord, ServiceError> {
        validate_cart(&items)?;

        let lines: Vec<LineItem> = items
            .iter()
            .map(|item| LineItem::new(item.product_price, item.quantity))
            .collect();
        let quote = pricing::price_cart(&lines).ok_or_else(amounts_out_of_range)?;

        if let Some(client) = client_quote {
            if let Some(client_total) = client.total {
                if client_total != quote.total {
                    warn!(
                        user_id = user_id,
                        client_total = %client_total,
                        server_total = %quote.total,
                        "Client-supplied total diverges from server-side pricing; using server value"
                    );
                }
            }
        }

        let mut new_items = Vec::with_capacity(items.len());
        for item in items {
            let subtotal = pricing::line_subtotal(item.product_price, item.quantity)
                .ok_or_else(amounts_out_of_range)?;
            new_items.push(NewOrderItem {
                subtotal,
                product_id: item.product_id,
                product_name: item.product_name,
                product_price: item.product_price,
                quantity: item.quantity,
                size: item.size,
                color: item.color,
            });
        }

        let record = self
            .repository
            .create_order(user_id, &quote, shipping_address, &new_items)
            .await?;

        info!(
            order_id = record.order.order_id,
            order_number = %record.order.order_number,
            total = %record.order.total,
            "Order placed"
        );

        Ok(record)
    }

    /// Lists orders visible to the actor. Non-administrators are always
    /// scoped to their own orders; requesting another user's orders fails.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        user_id: Option<i64>,
        status: Option<&str>,
    ) -> Result<Vec<OrderRecord>, ServiceError> {
        let status = status.map(OrderStatus::parse).transpose()?;
        let scope = resolve_list_scope(actor, user_id)?;
        self.repository.list(scope, status).await
    }

    /// Fetches one order, enforcing owner-or-admin visibility.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id, order_id = order_id))]
    pub async fn get_order(
        &self,
        actor: &AuthUser,
        order_id: i64,
    ) -> Result<OrderRecord, ServiceError> {
        let record = self
            .repository
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        ensure_can_view(actor, &record.order)?;
        Ok(record)
    }

    /// Moves an order to a new status. Administrator-only; the transition
    /// must be allowed by the status state machine.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id, order_id = order_id))]
    pub async fn set_status(
        &self,
        actor: &AuthUser,
        order_id: i64,
        new_status: &str,
    ) -> Result<OrderRecord, ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only administrators may change order status".to_string(),
            ));
        }

        let next = OrderStatus::parse(new_status)?;

        let mut record = self
            .repository
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let current = OrderStatus::parse(&record.order.status).map_err(|_| {
            ServiceError::InternalError(format!(
                "order {order_id} has unrecognized stored status '{}'",
                record.order.status
            ))
        })?;

        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order from '{current}' to '{next}'"
            )));
        }

        if current == next {
            // Idempotent no-op
            return Ok(record);
        }

        let updated = self
            .repository
            .update_status(order_id, next)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        info!(
            order_id = order_id,
            old_status = %current,
            new_status = %next,
            "Order status updated"
        );

        record.order = updated;
        Ok(record)
    }
}

fn amounts_out_of_range() -> ServiceError {
    ServiceError::InvalidOrder("cart amounts exceed the representable monetary range".to_string())
}

fn validate_cart(items: &[PlaceOrderItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::InvalidOrder(
            "order must contain at least one item".to_string(),
        ));
    }

    for (idx, item) in items.iter().enumerate() {
        if item.product_name.trim().is_empty() {
            return Err(ServiceError::InvalidOrder(format!(
                "item {idx} is missing a product name"
            )));
        }
        if item.quantity < 1 {
            return Err(ServiceError::InvalidOrder(format!(
                "item {idx} has a non-positive quantity"
            )));
        }
        if item.product_price < Decimal::ZERO {
            return Err(ServiceError::InvalidOrder(format!(
                "item {idx} has a negative unit price"
            )));
        }
    }

    Ok(())
}

fn resolve_list_scope(actor: &AuthUser, requested: Option<i64>) -> Result<Option<i64>, ServiceError> {
    if actor.is_admin() {
        return Ok(requested);
    }

    match requested {
        Some(user_id) if user_id != actor.user_id => Err(ServiceError::Forbidden(
            "Access denied".to_string(),
        )),
        _ => Ok(Some(actor.user_id)),
    }
}

fn ensure_can_view(actor: &AuthUser, order: &order::Model) -> Result<(), ServiceError> {
    if actor.is_admin() || order.user_id == actor.user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Access denied".to_string()))
    }
}
