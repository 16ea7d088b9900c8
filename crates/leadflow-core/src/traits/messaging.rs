// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging channel traits for the fallback sequencer.
//!
//! Both channels support a dry-run mode that simulates success without a
//! network call; the sequencer logs the conversation entry either way.

use async_trait::async_trait;

use crate::error::LeadflowError;

/// A parameterized WhatsApp template send.
#[derive(Debug, Clone)]
pub struct WhatsappTemplate {
    /// Recipient in E.164 format.
    pub to: String,
    /// Approved template name.
    pub template_name: String,
    /// BCP-47 language code, e.g. "en".
    pub language: String,
    /// Positional body parameters mapped to {{1}}, {{2}}, ...
    pub params: Vec<String>,
}

/// A plain-text email send.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Extra headers, e.g. the lead correlation header.
    pub headers: Vec<(String, String)>,
}

/// WhatsApp template sender.
#[async_trait]
pub trait WhatsappGateway: Send + Sync {
    /// Send a template message; returns the provider message id.
    async fn send_template(&self, msg: &WhatsappTemplate) -> Result<String, LeadflowError>;

    /// Whether sends are simulated.
    fn is_dry_run(&self) -> bool;
}

/// Outbound email sender.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, msg: &EmailMessage) -> Result<(), LeadflowError>;

    /// Whether sends are simulated.
    fn is_dry_run(&self) -> bool;
}
