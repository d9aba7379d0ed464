//! Durable storage for the Order/OrderItem aggregate.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{order, order_item, user};
use crate::errors::ServiceError;
use crate::models::OrderStatus;
use crate::pricing::Pricing;

/// Line item as handed to the repository: already priced, snapshot fields
/// captured.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub subtotal: Decimal,
}

/// An order hydrated with its items and the owner's display fields.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order: order::Model,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<order_item::Model>,
}

#[derive(Clone)]
pub struct OrderRepository {
    db: Arc<DbPool>,
}

impl OrderRepository {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Inserts the order row and all item rows in one transaction and returns
    /// the hydrated aggregate. Retries once with a fresh order number if the
    /// generated one collides.
    pub async fn create_order(
        &self,
        user_id: i64,
        pricing: &Pricing,
        shipping_address: Option<String>,
        items: &[NewOrderItem],
    ) -> Result<OrderRecord, ServiceError> {
        self.create_order_numbered(user_id, pricing, shipping_address, items, generate_order_number)
            .await
    }

    async fn create_order_numbered(
        &self,
        user_id: i64,
        pricing: &Pricing,
        shipping_address: Option<String>,
        items: &[NewOrderItem],
        mut next_number: impl FnMut() -> String,
    ) -> Result<OrderRecord, ServiceError> {
        for attempt in 0..2 {
            let order_number = next_number();
            match self
                .insert_order_with_items(user_id, &order_number, pricing, &shipping_address, items)
                .await
            {
                Err(ServiceError::Conflict(_)) if attempt == 0 => {
                    warn!(
                        order_number = %order_number,
                        "Order number collision, retrying with a fresh number"
                    );
                }
                result => return result,
            }
        }

        Err(ServiceError::Conflict(
            "could not allocate a unique order number".to_string(),
        ))
    }

    async fn insert_order_with_items(
        &self,
        user_id: i64,
        order_number: &str,
        pricing: &Pricing,
        shipping_address: &Option<String>,
        items: &[NewOrderItem],
    ) -> Result<OrderRecord, ServiceError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let order_model = order::ActiveModel {
            order_number: Set(order_number.to_string()),
            user_id: Set(user_id),
            subtotal: Set(pricing.subtotal),
            shipping: Set(pricing.shipping),
            discount: Set(pricing.discount),
            total: Set(pricing.total),
            status: Set(OrderStatus::Pending.to_string()),
            shipping_address: Set(shipping_address.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;

        let mut item_models = Vec::with_capacity(items.len());
        for item in items {
            let item_model = order_item::ActiveModel {
                order_id: Set(order_model.order_id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                product_price: Set(item.product_price),
                quantity: Set(item.quantity),
                size: Set(item.size.clone()),
                color: Set(item.color.clone()),
                subtotal: Set(item.subtotal),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(map_db_err)?;
            item_models.push(item_model);
        }

        txn.commit().await.map_err(map_db_err)?;

        info!(
            order_id = order_model.order_id,
            order_number = %order_model.order_number,
            item_count = item_models.len(),
            "Order persisted"
        );

        let owner = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(OrderRecord {
            order: order_model,
            customer_name: owner.as_ref().map(|u| u.name.clone()),
            customer_email: owner.map(|u| u.email),
            items: item_models,
        })
    }

    /// Fetches one order with its items and the owner's display fields.
    pub async fn get_by_id(&self, order_id: i64) -> Result<Option<OrderRecord>, ServiceError> {
        let found = order::Entity::find_by_id(order_id)
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        let Some((order_model, owner)) = found else {
            return Ok(None);
        };

        let items = self.items_for(order_model.order_id).await?;

        Ok(Some(OrderRecord {
            order: order_model,
            customer_name: owner.as_ref().map(|u| u.name.clone()),
            customer_email: owner.map(|u| u.email),
            items,
        }))
    }

    /// Lists orders, optionally filtered by owner and status, newest first.
    pub async fn list(
        &self,
        user_id: Option<i64>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderRecord>, ServiceError> {
        let mut query = order::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(order::Column::CreatedAt);

        if let Some(uid) = user_id {
            query = query.filter(order::Column::UserId.eq(uid));
        }
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let rows = query.all(&*self.db).await.map_err(map_db_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for (order_model, owner) in rows {
            let items = self.items_for(order_model.order_id).await?;
            records.push(OrderRecord {
                order: order_model,
                customer_name: owner.as_ref().map(|u| u.name.clone()),
                customer_email: owner.map(|u| u.email),
                items,
            });
        }

        Ok(records)
    }

    /// Persists a new status. Returns `None` when the order does not exist.
    pub async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<Option<order::Model>, ServiceError> {
        let Some(existing) = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status.to_string());
        let updated = active.update(&*self.db).await.map_err(map_db_err)?;

        Ok(Some(updated))
    }

    async fn items_for(&self, order_id: i64) -> Result<Vec<order_item::Model>, ServiceError> {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::OrderItemId)
            .all(&*self.db)
            .await
            .map_err(map_db_err)
    }
}

/// Timestamp-prefixed order number with a random suffix. The suffix plus the
/// storage-level unique index (and one retry) covers same-millisecond
/// checkouts.
fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = (Uuid::new_v4().as_u128() & 0xFF_FFFF) as u32;
    format!("ORD-{millis}-{suffix:06X}")
}

fn map_db_err(err: DbErr) -> ServiceError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return ServiceError::Conflict(format!("uniqueness violation: {detail}"));
    }
    ServiceError::DatabaseError(err)
}
