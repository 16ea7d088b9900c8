// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP sender for the missed-call and fallback emails.
//!
//! Dry-run is the default: a bare configuration logs the message instead of
//! relaying it, so the sent-flag and conversation-log pipeline can be
//! exercised without a mail server.

use async_trait::async_trait;
use leadflow_config::EmailConfig;
use leadflow_core::{EmailGateway, EmailMessage, LeadflowError};
use lettre::message::header::HeaderName;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

fn channel_err(message: String) -> LeadflowError {
    LeadflowError::Channel {
        message,
        source: None,
    }
}

/// SMTP email sender.
pub struct EmailClient {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    reply_to: Option<Mailbox>,
}

impl EmailClient {
    pub fn new(config: &EmailConfig) -> Result<Self, LeadflowError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| LeadflowError::Config(format!("invalid email.from address: {e}")))?;
        let reply_to = config
            .reply_to
            .as_deref()
            .map(|addr| {
                addr.parse::<Mailbox>().map_err(|e| {
                    LeadflowError::Config(format!("invalid email.reply_to address: {e}"))
                })
            })
            .transpose()?;

        let transport = if config.dry_run {
            None
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| LeadflowError::Config(format!("invalid SMTP relay: {e}")))?
                    .port(config.smtp_port);
            if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
            Some(builder.build())
        };

        Ok(Self {
            transport,
            from,
            reply_to,
        })
    }

    fn build_message(&self, msg: &EmailMessage) -> Result<Message, LeadflowError> {
        let to: Mailbox = msg
            .to
            .parse()
            .map_err(|e| channel_err(format!("invalid recipient address '{}': {e}", msg.to)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&msg.subject);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        let mut message = builder
            .body(msg.body.clone())
            .map_err(|e| channel_err(format!("failed to build email: {e}")))?;

        for (name, value) in &msg.headers {
            let header_name = HeaderName::new_from_ascii(name.clone())
                .map_err(|e| channel_err(format!("invalid email header '{name}': {e}")))?;
            message.headers_mut().insert_raw(
                lettre::message::header::HeaderValue::new(header_name, value.clone()),
            );
        }
        Ok(message)
    }
}

#[async_trait]
impl EmailGateway for EmailClient {
    async fn send(&self, msg: &EmailMessage) -> Result<(), LeadflowError> {
        let message = self.build_message(msg)?;
        match &self.transport {
            Some(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| LeadflowError::Channel {
                        message: format!("SMTP send failed: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                debug!(to = %msg.to, subject = %msg.subject, "email sent");
            }
            None => {
                info!(to = %msg.to, subject = %msg.subject, "dry-run email send");
            }
        }
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.transport.is_none()
    }
}
