use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::errors::TransportError;
use crate::domain::ports::SmsTransport;

#[derive(Debug, Clone)]
pub struct AfricasTalkingSettings {
    pub base_url: String,
    pub username: String,
    pub api_key: String,
    pub sender_id: Option<String>,
}

/// Africa's Talking bulk SMS gateway.
pub struct AfricasTalkingSms {
    http: Client,
    settings: AfricasTalkingSettings,
}

impl AfricasTalkingSms {
    pub fn new(http: Client, settings: AfricasTalkingSettings) -> Self {
        Self { http, settings }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(rename = "SMSMessageData")]
    data: MessageData,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
struct Recipient {
    #[serde(default)]
    status: String,
}

impl SendResponse {
    /// The gateway answers 201 even when every recipient was rejected.
    fn into_result(self) -> Result<(), TransportError> {
        if self.data.recipients.iter().any(|r| r.status == "Success") {
            Ok(())
        } else {
            Err(TransportError::Failed(self.data.message))
        }
    }
}

#[async_trait]
impl SmsTransport for AfricasTalkingSms {
    async fn send(&self, message: &str, phone_number: &str) -> Result<(), TransportError> {
        let to = format!("+{}", phone_number.trim_start_matches('+'));
        let mut form = vec![
            ("username", self.settings.username.as_str()),
            ("to", to.as_str()),
            ("message", message),
        ];
        if let Some(sender) = &self.settings.sender_id {
            form.push(("from", sender.as_str()));
        }

        let response = self
            .http
            .post(format!(
                "{}/version1/messaging",
                self.settings.base_url.trim_end_matches('/')
            ))
            .header("apiKey", &self.settings.api_key)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Failed(format!(
                "SMS gateway returned {}",
                response.status()
            )));
        }
        let body: SendResponse = response.json().await?;
        body.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> SendResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepted_recipient_is_success() {
        let response = parse(serde_json::json!({
            "SMSMessageData": {
                "Message": "Sent to 1/1 Total Cost: KES 0.8000",
                "Recipients": [{
                    "statusCode": 101,
                    "number": "+254712345678",
                    "status": "Success",
                    "cost": "KES 0.8000",
                    "messageId": "ATPid_1"
                }]
            }
        }));
        assert!(response.into_result().is_ok());
    }

    #[test]
    fn no_accepted_recipient_is_failure() {
        let response = parse(serde_json::json!({
            "SMSMessageData": {
                "Message": "Sent to 0/1 Total Cost: 0",
                "Recipients": [{ "statusCode": 403, "status": "InvalidPhoneNumber" }]
            }
        }));
        assert!(matches!(
            response.into_result(),
            Err(TransportError::Failed(m)) if m.starts_with("Sent to 0/1")
        ));
    }
}
