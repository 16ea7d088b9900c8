// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadflow engagement engine.
//!
//! This crate provides the domain model (leads, call statuses, conversation
//! log entries, inbound voice events), the shared error type, and the
//! adapter traits the orchestration engine talks through. The engine and
//! all channel/storage adapters depend on this crate only.

pub mod error;
pub mod event;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadflowError;
pub use event::{
    EngagementAnalysis, EngagementReport, EventOutcome, EventStatus, StatusUpdate, VoiceEvent,
    VoiceEventKind,
};
pub use types::{
    CallId, CallStatus, Channel, ConversationEntry, Direction, Lead, LeadFilter, LeadId, LeadPatch,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    CallPlacement, EmailGateway, EmailMessage, GatewayCallState, LeadRepository, VoiceGateway,
    WhatsappGateway, WhatsappTemplate,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = LeadflowError::Config("test".into());
        let _repo = LeadflowError::Repository {
            source: Box::new(std::io::Error::other("test")),
        };
        let _gateway = LeadflowError::Gateway {
            message: "test".into(),
            source: None,
        };
        let _channel = LeadflowError::Channel {
            message: "test".into(),
            source: None,
        };
        let _not_found = LeadflowError::LeadNotFound { id: LeadId::new() };
        let _timeout = LeadflowError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = LeadflowError::Internal("test".into());
    }

    #[test]
    fn transient_classification() {
        assert!(
            LeadflowError::Repository {
                source: Box::new(std::io::Error::other("rate limited"))
            }
            .is_transient()
        );
        assert!(!LeadflowError::Config("bad".into()).is_transient());
        assert!(
            !LeadflowError::Gateway {
                message: "rejected".into(),
                source: None
            }
            .is_transient()
        );
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter trait is reachable from the
        // crate root.
        fn _assert_repository<T: LeadRepository>() {}
        fn _assert_voice<T: VoiceGateway>() {}
        fn _assert_whatsapp<T: WhatsappGateway>() {}
        fn _assert_email<T: EmailGateway>() {}
    }
}
