// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead repository trait: the single shared mutable resource.
//!
//! No transaction support is assumed. Every write is a batched field
//! overwrite that stays correct when repeated, because webhook redelivery
//! and sweep/webhook races can apply the same patch twice.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::{ConversationEntry, Lead, LeadFilter, LeadId, LeadPatch};

/// Row-keyed, quota-limited lead store.
///
/// Implementations must tolerate unknown `LeadPatch::extra` fields by
/// creating the backing column on first write.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// List leads matching the filter.
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, LeadflowError>;

    /// Fetch one lead by id, or `None` if it does not exist.
    async fn get_by_id(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError>;

    /// Apply every set field of the patch in a single batched write.
    async fn update_fields(&self, id: LeadId, patch: &LeadPatch) -> Result<(), LeadflowError>;

    /// Append a new lead row.
    async fn append(&self, lead: &Lead) -> Result<(), LeadflowError>;

    /// Delete a lead row. Returns false when the id is unknown.
    async fn delete(&self, id: LeadId) -> Result<bool, LeadflowError>;

    /// Append one interaction to the write-once conversation log.
    async fn log_conversation(&self, entry: &ConversationEntry) -> Result<(), LeadflowError>;

    /// All logged interactions for a lead, oldest first.
    async fn conversations_for(
        &self,
        id: LeadId,
    ) -> Result<Vec<ConversationEntry>, LeadflowError>;
}
