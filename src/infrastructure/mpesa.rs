//! Safaricom Daraja client: OAuth client-credentials token and Lipa Na
//! M-Pesa Online (STK push) requests.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::errors::TransportError;
use crate::domain::ports::{PaymentProvider, PushAck, PushRequest};

/// Daraja timestamps are East Africa Time (UTC+3), which has no DST.
const EAT_OFFSET_SECS: i32 = 3 * 3600;
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const ACCEPTED: &str = "0";

#[derive(Debug, Clone)]
pub struct DarajaSettings {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub short_code: String,
    pub passkey: String,
}

pub struct DarajaClient {
    http: Client,
    settings: DarajaSettings,
}

impl DarajaClient {
    pub fn new(http: Client, settings: DarajaSettings) -> Self {
        Self { http, settings }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }
}

/// `YYYYMMDDHHMMSS` in East Africa Time.
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(EAT_OFFSET_SECS) {
        Some(eat) => now.with_timezone(&eat).format(TIMESTAMP_FORMAT).to_string(),
        None => now.format(TIMESTAMP_FORMAT).to_string(),
    }
}

/// `base64(short_code + passkey + timestamp)`.
pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{short_code}{passkey}{timestamp}"))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: u64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'a str,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "ResponseCode")]
    response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

impl From<StkPushResponse> for PushAck {
    fn from(r: StkPushResponse) -> Self {
        PushAck {
            accepted: r.response_code.as_deref() == Some(ACCEPTED),
            checkout_request_id: r.checkout_request_id,
            description: r.response_description.or(r.error_message),
        }
    }
}

#[async_trait]
impl PaymentProvider for DarajaClient {
    async fn access_token(&self) -> Result<String, TransportError> {
        let response = self
            .http
            .get(self.url("/oauth/v1/generate"))
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(
                &self.settings.consumer_key,
                Some(&self.settings.consumer_secret),
            )
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Failed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn push_payment(
        &self,
        access_token: &str,
        request: &PushRequest,
    ) -> Result<PushAck, TransportError> {
        let timestamp = stk_timestamp(Utc::now());
        let body = StkPushBody {
            business_short_code: &self.settings.short_code,
            password: stk_password(&self.settings.short_code, &self.settings.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: request.amount,
            party_a: &request.phone_number,
            party_b: &self.settings.short_code,
            phone_number: &request.phone_number,
            callback_url: &request.callback_url,
            account_reference: &request.account_reference,
            transaction_desc: &request.description,
        };

        // Daraja reports rejections with a 4xx/5xx and a JSON body; both
        // shapes decode into the same acknowledgement.
        let response = self
            .http
            .post(self.url("/mpesa/stkpush/v1/processrequest"))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let parsed: StkPushResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("STK push returned {status}: {e}"))
        })?;
        Ok(parsed.into())
    }
}
