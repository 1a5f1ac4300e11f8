pub mod cart;
pub mod deliveries;
pub mod identity;
pub mod notifications;
pub mod orders;
pub mod payments;

use actix_web::error::JsonPayloadError;
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Page, PageRequest, DEFAULT_PAGE_LIMIT};
use crate::errors::AppError;

pub use identity::Identity;

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> PageResponse<T> {
    pub fn from_page<S>(page: Page<S>, request: PageRequest, f: impl Fn(S) -> T) -> Self {
        PageResponse {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
            page: request.page,
            limit: request.limit,
        }
    }
}

/// Malformed or mistyped JSON bodies are client errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}
