use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, One};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;

/// Name of the callback metadata item carrying the M-Pesa receipt number.
pub const TRANSACTION_CODE_ITEM: &str = "MpesaReceiptNumber";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::Internal(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub status: PaymentStatus,
    pub transaction_code: Option<String>,
    pub phone_number: String,
    pub checkout_request_id: Option<String>,
    pub result_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The terminal state a pending payment is moved into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Completed { transaction_code: String },
    Failed { description: Option<String> },
}

/// Result of attempting to settle a payment.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The payment was pending and now carries the outcome.
    Applied {
        payment: PaymentView,
        customer_id: Uuid,
    },
    /// The payment had already reached a terminal state; nothing changed.
    AlreadySettled(PaymentView),
}

/// Daraja STK callback envelope: `{ "Body": { "stkCallback": { ... } } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(default, rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(default, rename = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    #[serde(deserialize_with = "result_code")]
    pub result_code: i64,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackMetadata {
    #[serde(default)]
    pub item: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataItem {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Daraja sends `ResultCode` as a number; some relays stringify it.
fn result_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Text(String),
    }

    match Code::deserialize(deserializer)? {
        Code::Int(n) => Ok(n),
        Code::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid ResultCode '{s}'"))),
    }
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Looks a metadata item up by name. Item order is not stable across
    /// Daraja versions.
    pub fn metadata_value(&self, name: &str) -> Option<String> {
        let item = self
            .callback_metadata
            .as_ref()?
            .item
            .iter()
            .find(|i| i.name == name)?;
        match item.value.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Result<SettlementOutcome, DomainError> {
        if !self.is_success() {
            return Ok(SettlementOutcome::Failed {
                description: self.result_desc.clone(),
            });
        }
        let code = self.metadata_value(TRANSACTION_CODE_ITEM).ok_or_else(|| {
            DomainError::Validation(format!(
                "successful callback carries no {TRANSACTION_CODE_ITEM}"
            ))
        })?;
        Ok(SettlementOutcome::Completed {
            transaction_code: code,
        })
    }
}

/// Accepts Safaricom MSISDNs in international form: `2547XXXXXXXX` or
/// `2541XXXXXXXX`.
pub fn validate_phone_number(phone: &str) -> Result<(), DomainError> {
    let valid = phone.len() == 12
        && phone.bytes().all(|b| b.is_ascii_digit())
        && (phone.starts_with("2547") || phone.starts_with("2541"));
    if valid {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "invalid phone number '{phone}', expected 2547XXXXXXXX"
        )))
    }
}

/// STK push amounts are whole shillings; any fractional part is rounded up so
/// the order is never under-collected.
pub fn whole_units(amount: &BigDecimal) -> Result<u64, DomainError> {
    let mut whole = amount.with_scale(0);
    if &whole < amount {
        whole += BigDecimal::one();
    }
    whole
        .to_string()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DomainError::Validation(format!("cannot charge amount {amount}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(payload: Value) -> StkCallback {
        serde_json::from_value::<CallbackEnvelope>(payload)
            .expect("valid envelope")
            .body
            .stk_callback
    }

    #[test]
    fn success_callback_yields_receipt_number_by_name() {
        let callback = parse(json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": { "Item": [
                    { "Name": "Amount", "Value": 25.00 },
                    { "Name": "TransactionDate", "Value": 20191219102115u64 },
                    { "Name": "PhoneNumber", "Value": 254708374149u64 },
                    { "Name": "MpesaReceiptNumber", "Value": "XYZ123" }
                ]}
            }}
        }));

        assert_eq!(
            callback.outcome().unwrap(),
            SettlementOutcome::Completed {
                transaction_code: "XYZ123".to_string()
            }
        );
        assert_eq!(
            callback.checkout_request_id.as_deref(),
            Some("ws_CO_191220191020363925")
        );
    }

    #[test]
    fn failure_callback_carries_description() {
        let callback = parse(json!({
            "Body": { "stkCallback": {
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }}
        }));

        assert_eq!(
            callback.outcome().unwrap(),
            SettlementOutcome::Failed {
                description: Some("Request cancelled by user".to_string())
            }
        );
    }

    #[test]
    fn stringified_result_code_is_accepted() {
        let callback = parse(json!({
            "Body": { "stkCallback": {
                "ResultCode": "0",
                "CallbackMetadata": { "Item": [
                    { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }
                ]}
            }}
        }));
        assert!(callback.is_success());
    }

    #[test]
    fn success_without_receipt_number_is_rejected() {
        let callback = parse(json!({
            "Body": { "stkCallback": {
                "ResultCode": 0,
                "CallbackMetadata": { "Item": [
                    { "Name": "Amount", "Value": 1 },
                    { "Name": "Balance" }
                ]}
            }}
        }));
        assert!(matches!(
            callback.outcome(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn non_numeric_result_code_fails_to_parse() {
        let result = serde_json::from_value::<CallbackEnvelope>(json!({
            "Body": { "stkCallback": { "ResultCode": "ok" } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn phone_numbers_must_be_safaricom_msisdns() {
        assert!(validate_phone_number("254712345678").is_ok());
        assert!(validate_phone_number("254112345678").is_ok());
        assert!(validate_phone_number("0712345678").is_err());
        assert!(validate_phone_number("25471234567a").is_err());
        assert!(validate_phone_number("2547123456789").is_err());
    }

    #[test]
    fn amounts_round_up_to_whole_shillings() {
        let amount = |s: &str| BigDecimal::from_str(s).unwrap();
        assert_eq!(whole_units(&amount("25.00")).unwrap(), 25);
        assert_eq!(whole_units(&amount("25.01")).unwrap(), 26);
        assert!(whole_units(&amount("0.00")).is_err());
    }
}
