use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Identity;
use crate::application::CartService;
use crate::domain::catalog::CartView;
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    /// Defaults to 1.
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    /// 0 removes the line.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    /// Decimal total as a string, e.g. "25.00"
    pub total: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        CartResponse {
            lines: cart
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    product_id: l.product_id,
                    name: l.name,
                    unit_price: l.unit_price.to_string(),
                    quantity: l.quantity,
                    subtotal: l.subtotal.to_string(),
                })
                .collect(),
            total: cart.total.to_string(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 401, description = "Missing or unknown caller"),
        (status = 403, description = "Caller is not a customer"),
    ),
    tag = "cart"
)]
pub async fn view_cart(
    Identity(actor): Identity,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.view(&actor).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
///
/// Adds units of a product on top of what the cart already holds.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    Identity(actor): Identity,
    carts: web::Data<CartService>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let cart = carts
        .add_item(&actor, body.product_id, body.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn set_quantity(
    Identity(actor): Identity,
    carts: web::Data<CartService>,
    path: web::Path<Uuid>,
    body: web::Json<SetQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let cart = carts
        .set_quantity(&actor, path.into_inner(), body.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Product not in cart"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    Identity(actor): Identity,
    carts: web::Data<CartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.remove_item(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    tag = "cart"
)]
pub async fn clear_cart(
    Identity(actor): Identity,
    carts: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = carts.clear(&actor).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
