// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing WhatsApp and email mocks.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::{
    EmailGateway, EmailMessage, LeadflowError, WhatsappGateway, WhatsappTemplate,
};
use tokio::sync::Mutex;

/// A WhatsApp gateway that captures sends instead of hitting the network.
pub struct MockWhatsapp {
    sent: Arc<Mutex<Vec<WhatsappTemplate>>>,
    fail_all: Arc<Mutex<bool>>,
    dry_run: bool,
}

impl MockWhatsapp {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_all: Arc::new(Mutex::new(false)),
            dry_run: false,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::new()
        }
    }

    /// Make every subsequent send fail.
    pub async fn fail_sends(&self) {
        *self.fail_all.lock().await = true;
    }

    pub async fn sent_messages(&self) -> Vec<WhatsappTemplate> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockWhatsapp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhatsappGateway for MockWhatsapp {
    async fn send_template(&self, msg: &WhatsappTemplate) -> Result<String, LeadflowError> {
        if *self.fail_all.lock().await {
            return Err(LeadflowError::Channel {
                message: "injected whatsapp failure".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(msg.clone());
        Ok(format!("wamid.mock-{}", uuid::Uuid::new_v4()))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// An email gateway that captures sends instead of speaking SMTP.
pub struct MockEmail {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail_all: Arc<Mutex<bool>>,
    dry_run: bool,
}

impl MockEmail {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_all: Arc::new(Mutex::new(false)),
            dry_run: false,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::new()
        }
    }

    /// Make every subsequent send fail.
    pub async fn fail_sends(&self) {
        *self.fail_all.lock().await = true;
    }

    pub async fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockEmail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailGateway for MockEmail {
    async fn send(&self, msg: &EmailMessage) -> Result<(), LeadflowError> {
        if *self.fail_all.lock().await {
            return Err(LeadflowError::Channel {
                message: "injected email failure".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(msg.clone());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn whatsapp_captures_sends() {
        let gateway = MockWhatsapp::new();
        let msg = WhatsappTemplate {
            to: "+15550001111".to_string(),
            template_name: "missed_you".to_string(),
            language: "en".to_string(),
            params: vec!["Ada".to_string()],
        };
        let id = gateway.send_template(&msg).await.unwrap();
        assert!(id.starts_with("wamid.mock-"));
        assert_eq!(gateway.sent_count().await, 1);
        assert_eq!(gateway.sent_messages().await[0].params, vec!["Ada"]);
    }

    #[tokio::test]
    async fn email_failure_injection() {
        let gateway = MockEmail::new();
        gateway.fail_sends().await;
        let msg = EmailMessage {
            to: "a@b.c".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
            headers: vec![],
        };
        assert!(gateway.send(&msg).await.is_err());
        assert_eq!(gateway.sent_count().await, 0);
    }

    #[test]
    fn dry_run_constructors() {
        assert!(MockWhatsapp::dry_run().is_dry_run());
        assert!(!MockEmail::new().is_dry_run());
    }
}
