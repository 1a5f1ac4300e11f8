use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Identity, PageParams, PageResponse};
use crate::application::OrderService;
use crate::domain::order::{OrderStatus, OrderView};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_price: String,
    pub status: String,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            total_price: order.total_price.to_string(),
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.id,
                    product_id: l.product_id,
                    vendor_id: l.vendor_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of `in_progress`, `delivered`, `cancelled`.
    pub status: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checks the caller's cart out into a new order. The order, its lines, the
/// cart clearing and an outbox event are written in a single database
/// transaction; the customer is notified after commit.
#[utoipa::path(
    post,
    path = "/orders",
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Cart is empty"),
        (status = 403, description = "Caller is not a customer"),
        (status = 404, description = "A product in the cart no longer exists"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    Identity(actor): Identity,
    orders: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let order = orders.place_order(&actor).await?;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Returns the order together with its order lines.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    Identity(actor): Identity,
    orders: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = orders.get_order(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns a paginated list of the orders visible to the caller, newest
/// first. Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = PageResponse<OrderResponse>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    Identity(actor): Identity,
    orders: web::Data<OrderService>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let request = query.request();
    let page = orders.list_orders(&actor, request).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(page, request, OrderResponse::from)))
}

/// PATCH /orders/{id}/status
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Caller may not manage this order"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    Identity(actor): Identity,
    orders: web::Data<OrderService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let status: OrderStatus = body.status.parse()?;
    let order = orders
        .update_status(&actor, path.into_inner(), status)
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
