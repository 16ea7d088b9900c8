// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API template sender.
//!
//! Only approved template messages are supported; the fallback sequencer
//! parameterizes them with the lead's first name. Dry-run mode fabricates a
//! message id without touching the network so the rest of the pipeline
//! (sent-flags, conversation log) behaves identically.

use std::time::Duration;

use async_trait::async_trait;
use leadflow_config::WhatsappConfig;
use leadflow_core::{LeadflowError, WhatsappGateway, WhatsappTemplate};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct TemplateRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    template: TemplatePayload<'a>,
}

#[derive(Debug, Serialize)]
struct TemplatePayload<'a> {
    name: &'a str,
    language: LanguagePayload<'a>,
    components: Vec<ComponentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct LanguagePayload<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct ComponentPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    parameters: Vec<ParameterPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct ParameterPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// WhatsApp Cloud API client.
pub struct WhatsappClient {
    client: reqwest::Client,
    phone_number_id: String,
    base_url: String,
    dry_run: bool,
}

impl WhatsappClient {
    pub fn new(config: &WhatsappConfig) -> Result<Self, LeadflowError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.access_token.as_deref() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| LeadflowError::Config(format!("invalid WhatsApp token: {e}")))?;
            auth.set_sensitive(true);
            headers.insert("authorization", auth);
        } else if !config.dry_run {
            return Err(LeadflowError::Config(
                "whatsapp.access_token is required when dry_run is off".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LeadflowError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            phone_number_id: config.phone_number_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dry_run: config.dry_run,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WhatsappGateway for WhatsappClient {
    async fn send_template(&self, msg: &WhatsappTemplate) -> Result<String, LeadflowError> {
        if self.dry_run {
            let id = format!("dry-run-{}", uuid::Uuid::new_v4());
            info!(to = %msg.to, template = %msg.template_name, "dry-run WhatsApp send");
            return Ok(id);
        }

        let request = TemplateRequest {
            messaging_product: "whatsapp",
            to: &msg.to,
            kind: "template",
            template: TemplatePayload {
                name: &msg.template_name,
                language: LanguagePayload {
                    code: &msg.language,
                },
                components: if msg.params.is_empty() {
                    Vec::new()
                } else {
                    vec![ComponentPayload {
                        kind: "body",
                        parameters: msg
                            .params
                            .iter()
                            .map(|p| ParameterPayload {
                                kind: "text",
                                text: p,
                            })
                            .collect(),
                    }]
                },
            },
        };

        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LeadflowError::Channel {
                message: format!("WhatsApp send failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadflowError::Channel {
                message: format!("WhatsApp API returned {status}: {body}"),
                source: None,
            });
        }

        let sent: SendResponse = response.json().await.map_err(|e| LeadflowError::Channel {
            message: format!("failed to parse WhatsApp response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let id = sent
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| LeadflowError::Channel {
                message: "WhatsApp response carried no message id".to_string(),
                source: None,
            })?;
        debug!(to = %msg.to, message_id = %id, "WhatsApp template sent");
        Ok(id)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
