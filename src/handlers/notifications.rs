use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures::{future, stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Identity, PageParams, PageResponse};
use crate::application::NotificationService;
use crate::domain::notification::{NotificationView, RealtimeMessage};
use crate::errors::AppError;
use crate::infrastructure::BroadcastHub;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    /// `sms` or `in_app`
    pub channel: String,
    pub message: String,
    pub phone_number: Option<String>,
    /// `sent` or `failed`
    pub status: String,
    pub created_at: String,
}

impl From<NotificationView> for NotificationResponse {
    fn from(n: NotificationView) -> Self {
        NotificationResponse {
            id: n.id,
            recipient_id: n.recipient_id,
            kind: n.kind.to_string(),
            channel: n.channel.as_str().to_string(),
            message: n.message,
            phone_number: n.phone_number,
            status: n.status.as_str().to_string(),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// GET /notifications
#[utoipa::path(
    get,
    path = "/notifications",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated notification log, newest first", body = PageResponse<NotificationResponse>),
        (status = 401, description = "Missing or unknown caller"),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    Identity(actor): Identity,
    notifications: web::Data<NotificationService>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let request = query.request();
    let page = notifications.list(&actor, request).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(
        page,
        request,
        NotificationResponse::from,
    )))
}

/// GET /notifications/stream
///
/// Server-sent events carrying the caller's in-app notifications as they are
/// dispatched. Messages sent while the caller is not connected are only
/// available through the notification log.
#[utoipa::path(
    get,
    path = "/notifications/stream",
    responses(
        (status = 200, description = "text/event-stream of notifications"),
        (status = 401, description = "Missing or unknown caller"),
    ),
    tag = "notifications"
)]
pub async fn notification_stream(
    Identity(actor): Identity,
    hub: web::Data<BroadcastHub>,
) -> HttpResponse {
    let recipient_id = actor.id;
    let receiver = hub.subscribe(recipient_id);
    log::debug!("Live notification stream opened for {}", recipient_id);

    let opened = stream::once(future::ready(Ok::<_, actix_web::Error>(
        web::Bytes::from_static(b": connected\n\n"),
    )));
    let events = BroadcastStream::new(receiver).filter_map(move |item| {
        future::ready(match item {
            Ok(message) => event_frame(&message).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::warn!(
                    "Live stream for {} lagged, {} messages skipped",
                    recipient_id,
                    skipped
                );
                None
            }
        })
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(opened.chain(events))
}

fn event_frame(message: &RealtimeMessage) -> Option<web::Bytes> {
    match serde_json::to_string(message) {
        Ok(json) => Some(web::Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            log::error!("Failed to encode live notification: {}", e);
            None
        }
    }
}
