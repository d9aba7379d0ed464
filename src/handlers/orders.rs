use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::order_item;
use crate::errors::ServiceError;
use crate::models::OrderStatus;
use crate::repositories::OrderRecord;
use crate::services::orders::{ClientQuote, PlaceOrderItem};
use crate::{ApiResponse, AppState};

// Order DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItemRequest>,

    pub shipping_address: Option<String>,

    // Aggregates as the cart displayed them. Accepted for wire compatibility
    // with existing checkout clients; pricing is recomputed server-side.
    pub subtotal: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Option<i64>,

    #[validate(length(min = 1, message = "Product name is required"))]
    pub product_name: String,

    pub product_price: Decimal,

    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,

    pub size: Option<String>,
    pub color: Option<String>,

    // Line subtotal as the cart computed it; recomputed server-side.
    pub subtotal: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersQuery {
    /// Filter by owning user (administrators only may name another user)
    pub user_id: Option<i64>,
    /// Filter by order status
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: i64,
    pub order_number: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub order_item_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub subtotal: Decimal,
}

fn map_item(model: order_item::Model) -> OrderItemResponse {
    OrderItemResponse {
        order_item_id: model.order_item_id,
        product_id: model.product_id,
        product_name: model.product_name,
        product_price: model.product_price,
        quantity: model.quantity,
        size: model.size,
        color: model.color,
        subtotal: model.subtotal,
    }
}

fn map_record(record: OrderRecord) -> Result<OrderResponse, ServiceError> {
    let status = OrderStatus::parse(&record.order.status).map_err(|_| {
        ServiceError::InternalError(format!(
            "order {} has unrecognized stored status '{}'",
            record.order.order_id, record.order.status
        ))
    })?;

    Ok(OrderResponse {
        order_id: record.order.order_id,
        order_number: record.order.order_number,
        user_id: record.order.user_id,
        customer_name: record.customer_name,
        customer_email: record.customer_email,
        subtotal: record.order.subtotal,
        shipping: record.order.shipping,
        discount: record.order.discount,
        total: record.order.total,
        status,
        shipping_address: record.order.shipping_address,
        created_at: record.order.created_at,
        items: record.items.into_iter().map(map_item).collect(),
    })
}

/// Create a new order from the authenticated user's cart
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Empty or malformed item list", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order number conflict", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    payload.validate()?;

    let quote = ClientQuote {
        subtotal: payload.subtotal,
        shipping: payload.shipping,
        discount: payload.discount,
        total: payload.total,
    };

    let items: Vec<PlaceOrderItem> = payload
        .items
        .into_iter()
        .map(|item| PlaceOrderItem {
            product_id: item.product_id,
            product_name: item.product_name,
            product_price: item.product_price,
            quantity: item.quantity,
            size: item.size,
            color: item.color,
        })
        .collect();

    let record = state
        .services
        .orders
        .place_order(
            auth_user.user_id,
            items,
            payload.shipping_address,
            Some(quote),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_record(record)?)),
    ))
}

/// List orders visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    params(
        ("user_id" = Option<i64>, Query, description = "Filter by owning user (admin only)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Orders, newest first", body = ApiResponse<Vec<OrderResponse>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Foreign user_id requested by non-admin", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let records = state
        .services
        .orders
        .list_orders(&auth_user, query.user_id, query.status.as_deref())
        .await?;

    let orders = records
        .into_iter()
        .map(map_record)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::success(orders)))
}

/// Fetch one order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = i64, Path, description = "Order identifier")),
    responses(
        (status = 200, description = "The order with its items", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is neither owner nor admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "No such order", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let record = state.services.orders.get_order(&auth_user, id).await?;
    Ok(Json(ApiResponse::success(map_record(record)?)))
}

/// Update an order's fulfillment status (administrators only)
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    summary = "Update order status",
    params(("id" = i64, Path, description = "Order identifier")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Unknown status or disallowed transition", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = crate::errors::ErrorResponse),
        (status = 404, description = "No such order", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let record = state
        .services
        .orders
        .set_status(&auth_user, id, &payload.status)
        .await?;

    Ok(Json(ApiResponse::success(map_record(record)?)))
}
