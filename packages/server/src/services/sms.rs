use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::SmsConfig;
use crate::utils::phone::mask;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("SMS gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SMS gateway rejected the message: {0}")]
    Rejected(String),
}

/// How a message left the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { message_id: Option<String> },
    /// No gateway is configured; the message was only logged.
    DryRun,
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    phone: &'a str,
    content: &'a str,
    sign_name: &'a str,
}

#[derive(Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

struct Endpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

/// Thin client for an HTTP SMS gateway that accepts
/// `POST {phone, content, sign_name}` and answers `{success, message_id, message}`.
pub struct SmsGateway {
    endpoint: Option<Endpoint>,
    sign_name: String,
    admin_phone: Option<String>,
}

impl SmsGateway {
    pub fn new(config: &SmsConfig) -> Result<Self, SmsError> {
        let endpoint = match config.gateway_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Some(Endpoint {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(SmsError::Client)?,
                url: url.to_string(),
                api_key: config.api_key.clone(),
            }),
            None => None,
        };

        Ok(Self {
            endpoint,
            sign_name: config.sign_name.clone(),
            admin_phone: config.admin_phone.clone(),
        })
    }

    pub fn is_live(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Recipient for admin verification codes.
    pub fn admin_phone(&self) -> Option<&str> {
        self.admin_phone.as_deref()
    }

    #[instrument(skip(self, content), fields(phone = %mask(phone)))]
    pub async fn send(&self, phone: &str, content: &str) -> Result<Delivery, SmsError> {
        let Some(endpoint) = &self.endpoint else {
            info!(chars = content.chars().count(), "SMS gateway not configured, dry run");
            return Ok(Delivery::DryRun);
        };

        let mut request = endpoint.client.post(&endpoint.url).json(&GatewayRequest {
            phone,
            content,
            sign_name: &self.sign_name,
        });
        if let Some(key) = &endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected(format!("HTTP {status}: {body}")));
        }

        let body: GatewayResponse = response.json().await?;
        if body.success == Some(false) {
            return Err(SmsError::Rejected(
                body.message.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        info!("SMS delivered to gateway");
        Ok(Delivery::Sent {
            message_id: body.message_id,
        })
    }
}
