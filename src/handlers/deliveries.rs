use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Identity, PageParams, PageResponse};
use crate::application::DeliveryService;
use crate::domain::delivery::{DeliveryStatus, DeliveryView};
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDeliveryRequest {
    pub order_id: Uuid,
    pub courier_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    /// One of `pending`, `picked_up`, `in_transit`, `delivered`, `cancelled`.
    pub status: String,
    /// Omit to keep the last known location.
    pub location: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub status: String,
    pub location: String,
    pub assigned_at: String,
    pub updated_at: String,
}

impl From<DeliveryView> for DeliveryResponse {
    fn from(d: DeliveryView) -> Self {
        DeliveryResponse {
            id: d.id,
            order_id: d.order_id,
            courier_id: d.courier_id,
            status: d.status.to_string(),
            location: d.location,
            assigned_at: d.assigned_at.to_rfc3339(),
            updated_at: d.updated_at.to_rfc3339(),
        }
    }
}

/// POST /deliveries/assign
#[utoipa::path(
    post,
    path = "/deliveries/assign",
    request_body = AssignDeliveryRequest,
    responses(
        (status = 200, description = "Courier assigned", body = DeliveryResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order or courier not found"),
    ),
    tag = "deliveries"
)]
pub async fn assign_delivery(
    Identity(actor): Identity,
    deliveries: web::Data<DeliveryService>,
    body: web::Json<AssignDeliveryRequest>,
) -> Result<HttpResponse, AppError> {
    let delivery = deliveries
        .assign(&actor, body.order_id, body.courier_id)
        .await?;
    Ok(HttpResponse::Ok().json(DeliveryResponse::from(delivery)))
}

/// GET /deliveries
#[utoipa::path(
    get,
    path = "/deliveries",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of deliveries", body = PageResponse<DeliveryResponse>),
        (status = 403, description = "Caller is neither an administrator nor a courier"),
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    Identity(actor): Identity,
    deliveries: web::Data<DeliveryService>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let request = query.request();
    let page = deliveries.list(&actor, request).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(
        page,
        request,
        DeliveryResponse::from,
    )))
}

/// PATCH /deliveries/{id}/status
#[utoipa::path(
    patch,
    path = "/deliveries/{id}/status",
    params(("id" = Uuid, Path, description = "Delivery UUID")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = DeliveryResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Caller is not the assigned courier"),
        (status = 404, description = "Delivery not found"),
    ),
    tag = "deliveries"
)]
pub async fn update_delivery_status(
    Identity(actor): Identity,
    deliveries: web::Data<DeliveryService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateDeliveryStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let status: DeliveryStatus = body.status.parse()?;
    let delivery = deliveries
        .update_status(&actor, path.into_inner(), status, body.location)
        .await?;
    Ok(HttpResponse::Ok().json(DeliveryResponse::from(delivery)))
}
