// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic Leadflow tests.
//!
//! Every adapter trait in `leadflow-core` has an in-memory counterpart here:
//! a [`MockRepository`] backed by a `HashMap`, a [`MockVoiceGateway`] with
//! scriptable placement results, and capturing [`MockWhatsapp`] /
//! [`MockEmail`] channels. All support failure injection so backoff and
//! error-isolation paths can be exercised without a network.

pub mod mock_messaging;
pub mod mock_repository;
pub mod mock_voice;

pub use mock_messaging::{MockEmail, MockWhatsapp};
pub use mock_repository::MockRepository;
pub use mock_voice::MockVoiceGateway;

use leadflow_core::Lead;

/// A pending lead with plausible contact details for tests.
pub fn sample_lead(name: &str) -> Lead {
    Lead::new_pending(
        "+15550001111",
        None,
        &format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        name,
        "test-partner",
    )
}
