// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-channel fallback sequencing.
//!
//! Once call retries are exhausted the lead gets a WhatsApp template message
//! and a fallback email, each guarded by its sent-flag so webhook redelivery
//! cannot double-send. The same email path serves the once-only missed-call
//! email and the optional post-engagement follow-up. Every attempted send is
//! logged as a [`ConversationEntry`], dry-run or live.

use std::sync::Arc;

use leadflow_config::{EmailConfig, WhatsappConfig};
use leadflow_core::{
    Channel, ConversationEntry, EmailGateway, EmailMessage, Lead, LeadPatch, LeadRepository,
    LeadflowError, WhatsappGateway, WhatsappTemplate,
};
use tracing::{info, warn};

use crate::backoff::{with_backoff, BackoffPolicy};

pub struct FallbackSequencer {
    repo: Arc<dyn LeadRepository>,
    whatsapp: Arc<dyn WhatsappGateway>,
    email: Arc<dyn EmailGateway>,
    whatsapp_config: WhatsappConfig,
    email_config: EmailConfig,
    backoff: BackoffPolicy,
}

impl FallbackSequencer {
    pub fn new(
        repo: Arc<dyn LeadRepository>,
        whatsapp: Arc<dyn WhatsappGateway>,
        email: Arc<dyn EmailGateway>,
        whatsapp_config: WhatsappConfig,
        email_config: EmailConfig,
    ) -> Self {
        Self {
            repo,
            whatsapp,
            email,
            whatsapp_config,
            email_config,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Run the full exhaustion fallback: WhatsApp, then email.
    ///
    /// Channel failures are isolated; a WhatsApp error never blocks the
    /// email. Each channel is skipped when its sent-flag is already set,
    /// which makes replayed exhaustion events harmless.
    pub async fn run_exhausted(&self, lead: &Lead) {
        if let Err(err) = self.send_whatsapp_fallback(lead).await {
            warn!(lead_id = %lead.id, error = %err, "whatsapp fallback failed");
        }
        if let Err(err) = self.send_email_once(lead).await {
            warn!(lead_id = %lead.id, error = %err, "email fallback failed");
        }
    }

    /// Send the WhatsApp fallback template if the channel is usable and the
    /// lead has not received it yet.
    async fn send_whatsapp_fallback(&self, lead: &Lead) -> Result<(), LeadflowError> {
        if lead.whatsapp_sent {
            return Ok(());
        }
        if !self.whatsapp_config.enabled || self.whatsapp_config.fallback_template.is_empty() {
            return Ok(());
        }
        if lead.whatsapp_phone.is_empty() {
            warn!(lead_id = %lead.id, "no whatsapp number, skipping fallback");
            return Ok(());
        }

        let msg = WhatsappTemplate {
            to: lead.whatsapp_phone.clone(),
            template_name: self.whatsapp_config.fallback_template.clone(),
            language: self.whatsapp_config.language.clone(),
            params: vec![lead.first_name().to_string()],
        };
        let message_id = self.whatsapp.send_template(&msg).await?;

        let status = if self.whatsapp.is_dry_run() { "dry-run" } else { "sent" };
        info!(lead_id = %lead.id, message_id, status, "whatsapp fallback sent");

        self.mark_sent(lead, Channel::Whatsapp).await?;
        let entry = ConversationEntry::outbound(
            lead.id,
            Channel::Whatsapp,
            &self.whatsapp_config.fallback_template,
            &format!("template parameters: [{}]", lead.first_name()),
        )
        .with_status(status);
        self.repo.log_conversation(&entry).await?;
        Ok(())
    }

    /// Send the missed-call / fallback email once per lead.
    ///
    /// Returns `true` when an email actually went out, `false` when the
    /// `email_sent` guard or a missing address suppressed it.
    pub async fn send_email_once(&self, lead: &Lead) -> Result<bool, LeadflowError> {
        if lead.email_sent {
            return Ok(false);
        }
        if lead.email.is_empty() {
            warn!(lead_id = %lead.id, "no email address, skipping email");
            return Ok(false);
        }

        let body = self
            .email_config
            .body_template
            .replace("{name}", lead.first_name());
        let msg = EmailMessage {
            to: lead.email.clone(),
            subject: self.email_config.subject.clone(),
            body: body.clone(),
            headers: vec![("X-Leadflow-Lead".to_string(), lead.id.to_string())],
        };
        self.email.send(&msg).await?;

        let status = if self.email.is_dry_run() { "dry-run" } else { "sent" };
        info!(lead_id = %lead.id, status, "fallback email sent");

        self.mark_sent(lead, Channel::Email).await?;
        let entry =
            ConversationEntry::outbound(lead.id, Channel::Email, &self.email_config.subject, &body)
                .with_status(status);
        self.repo.log_conversation(&entry).await?;
        Ok(true)
    }

    /// Persist the sent-flag for one channel with backoff.
    async fn mark_sent(&self, lead: &Lead, channel: Channel) -> Result<(), LeadflowError> {
        let patch = match channel {
            Channel::Whatsapp => LeadPatch {
                whatsapp_sent: Some(true),
                ..Default::default()
            },
            Channel::Email => LeadPatch {
                email_sent: Some(true),
                ..Default::default()
            },
            Channel::Call => return Ok(()),
        };
        with_backoff(self.backoff, "mark_sent", || {
            self.repo.update_fields(lead.id, &patch)
        })
        .await
    }
}
