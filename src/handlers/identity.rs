use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use crate::domain::access::Actor;
use crate::domain::ports::UserDirectory;
use crate::errors::AppError;

/// Header set by the authentication gateway in front of this service.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller, resolved from [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok());
        let users = req.app_data::<web::Data<dyn UserDirectory>>().cloned();

        Box::pin(async move {
            let user_id = user_id.ok_or(AppError::Unauthorized)?;
            let users = users
                .ok_or_else(|| AppError::Internal("user directory not registered".to_string()))?;
            let user = web::block(move || users.find_user(user_id))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
                .ok_or(AppError::Unauthorized)?;
            Ok(Identity(user.actor()))
        })
    }
}
