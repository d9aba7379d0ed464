use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
REST backend for a small storefront. Covers order placement with
server-side pricing, order listing and retrieval, and administrator
status transitions.

## Authentication

All order endpoints require a bearer JWT issued by the auth service:

```
Authorization: Bearer <your-jwt-token>
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order lifecycle endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
    ),
    components(schemas(
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::CreateOrderItemRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::OrderItemResponse,
        crate::models::OrderStatus,
        crate::errors::ErrorResponse,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
