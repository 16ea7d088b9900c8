// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams of the engine.
//!
//! The engine owns orchestration; everything it talks to — the lead store,
//! the voice platform, the messaging channels — sits behind one of these
//! traits so tests can substitute deterministic mocks.

pub mod messaging;
pub mod repository;
pub mod voice;

pub use messaging::{EmailGateway, EmailMessage, WhatsappGateway, WhatsappTemplate};
pub use repository::LeadRepository;
pub use voice::{CallPlacement, GatewayCallState, VoiceGateway};
