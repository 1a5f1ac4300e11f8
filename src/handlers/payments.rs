use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Identity;
use crate::application::{CallbackOutcome, PaymentService};
use crate::domain::payment::{CallbackMetadata, MetadataItem, PaymentView, StkCallback};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
    /// Safaricom number in international form, e.g. "254712345678"
    pub phone_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: String,
    pub status: String,
    pub transaction_code: Option<String>,
    pub phone_number: String,
    pub checkout_request_id: Option<String>,
    pub created_at: String,
}

impl From<PaymentView> for PaymentResponse {
    fn from(p: PaymentView) -> Self {
        PaymentResponse {
            id: p.id,
            order_id: p.order_id,
            amount: p.amount.to_string(),
            status: p.status.to_string(),
            transaction_code: p.transaction_code,
            phone_number: p.phone_number,
            checkout_request_id: p.checkout_request_id,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentMessageResponse {
    pub message: String,
    pub payment: PaymentResponse,
}

/// Daraja STK callback: `{ "Body": { "stkCallback": { ... } } }`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StkCallbackRequest {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallbackPayload,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallbackPayload {
    #[serde(default, rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(default, rename = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    /// 0 on success. Some relays send it as a string.
    pub result_code: ResultCode,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadataPayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ResultCode {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackMetadataPayload {
    #[serde(default)]
    pub item: Vec<MetadataItemPayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataItemPayload {
    /// e.g. `MpesaReceiptNumber`, `Amount`, `PhoneNumber`
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub value: Option<Value>,
}

impl TryFrom<StkCallbackPayload> for StkCallback {
    type Error = AppError;

    fn try_from(p: StkCallbackPayload) -> Result<Self, Self::Error> {
        let result_code = match p.result_code {
            ResultCode::Number(n) => n,
            ResultCode::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid ResultCode '{s}'")))?,
        };
        Ok(StkCallback {
            merchant_request_id: p.merchant_request_id,
            checkout_request_id: p.checkout_request_id,
            result_code,
            result_desc: p.result_desc,
            callback_metadata: p.callback_metadata.map(|m| CallbackMetadata {
                item: m
                    .item
                    .into_iter()
                    .map(|i| MetadataItem {
                        name: i.name,
                        value: i.value,
                    })
                    .collect(),
            }),
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Shared secret embedded in the callback URL.
    pub token: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments/initiate
///
/// Sends an STK push to the customer's phone. The payment stays pending
/// until Daraja calls back.
#[utoipa::path(
    post,
    path = "/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Payment initiated", body = PaymentMessageResponse),
        (status = 400, description = "Invalid phone number or order already paid"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "M-Pesa rejected or could not be reached"),
    ),
    tag = "payments"
)]
pub async fn initiate_payment(
    Identity(actor): Identity,
    payments: web::Data<PaymentService>,
    body: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let payment = payments
        .initiate(&actor, body.order_id, &body.phone_number)
        .await?;
    Ok(HttpResponse::Ok().json(PaymentMessageResponse {
        message: "Payment initiated, awaiting user confirmation".to_string(),
        payment: payment.into(),
    }))
}

/// POST /payments/callback/{payment_id}
///
/// Daraja's asynchronous result for an STK push. Repeated deliveries are
/// acknowledged without side effects.
#[utoipa::path(
    post,
    path = "/payments/callback/{payment_id}",
    params(
        ("payment_id" = Uuid, Path, description = "Payment UUID"),
        CallbackParams,
    ),
    request_body = StkCallbackRequest,
    responses(
        (status = 200, description = "Callback applied or already processed", body = PaymentMessageResponse),
        (status = 400, description = "Malformed callback"),
        (status = 403, description = "Callback token mismatch"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Transaction code already recorded"),
    ),
    tag = "payments"
)]
pub async fn payment_callback(
    payments: web::Data<PaymentService>,
    path: web::Path<Uuid>,
    query: web::Query<CallbackParams>,
    body: web::Json<StkCallbackRequest>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let callback = StkCallback::try_from(body.into_inner().body.stk_callback)?;
    let outcome = payments
        .handle_callback(payment_id, query.token.as_deref(), &callback)
        .await?;

    let (message, payment) = match outcome {
        CallbackOutcome::Completed(p) => ("Payment processed successfully", p),
        CallbackOutcome::Failed(p) => ("Payment failed", p),
        CallbackOutcome::AlreadyProcessed(p) => ("Payment already processed", p),
    };
    Ok(HttpResponse::Ok().json(PaymentMessageResponse {
        message: message.to_string(),
        payment: payment.into(),
    }))
}
