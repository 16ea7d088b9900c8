// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice platform integration: outbound call client and inbound webhook
//! interpretation.

pub mod client;
pub mod webhook;

pub use client::VoiceClient;
pub use webhook::{interpret, WebhookDisposition, WebhookEnvelope};
