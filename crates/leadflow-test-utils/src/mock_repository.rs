// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory lead repository for deterministic testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::{
    CallStatus, ConversationEntry, Lead, LeadFilter, LeadId, LeadPatch, LeadRepository,
    LeadflowError,
};
use tokio::sync::Mutex;

/// A `HashMap`-backed repository with failure injection.
///
/// `fail_next_writes(n)` makes the next `n` calls to `update_fields` return
/// a transient repository error, for exercising backoff paths.
pub struct MockRepository {
    leads: Arc<Mutex<HashMap<LeadId, Lead>>>,
    conversations: Arc<Mutex<Vec<ConversationEntry>>>,
    /// Flattened extra columns written through `LeadPatch::extra`.
    extra_columns: Arc<Mutex<HashMap<LeadId, BTreeMap<String, String>>>>,
    failing_writes: Arc<Mutex<u32>>,
    write_count: Arc<Mutex<u32>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            leads: Arc::new(Mutex::new(HashMap::new())),
            conversations: Arc::new(Mutex::new(Vec::new())),
            extra_columns: Arc::new(Mutex::new(HashMap::new())),
            failing_writes: Arc::new(Mutex::new(0)),
            write_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Seed a lead directly, bypassing `append`.
    pub async fn insert(&self, lead: Lead) {
        self.leads.lock().await.insert(lead.id, lead);
    }

    /// Make the next `n` `update_fields` calls fail transiently.
    pub async fn fail_next_writes(&self, n: u32) {
        *self.failing_writes.lock().await = n;
    }

    /// Total `update_fields` calls, including failed ones.
    pub async fn write_count(&self) -> u32 {
        *self.write_count.lock().await
    }

    /// All conversation entries, oldest first.
    pub async fn conversation_log(&self) -> Vec<ConversationEntry> {
        self.conversations.lock().await.clone()
    }

    /// Extra columns that have been written for a lead.
    pub async fn extra_columns_for(&self, id: LeadId) -> BTreeMap<String, String> {
        self.extra_columns
            .lock()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn matches(lead: &Lead, filter: &LeadFilter) -> bool {
        if !filter.statuses.is_empty() && !filter.statuses.contains(&lead.call_status) {
            return false;
        }
        if filter.with_external_call_id && lead.external_call_id.is_none() {
            return false;
        }
        if let Some(due_before) = filter.due_before {
            match lead.next_retry_at {
                Some(at) => {
                    if at > due_before {
                        return false;
                    }
                }
                // Pending leads have no schedule but are always due.
                None => {
                    if lead.call_status != CallStatus::Pending {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply every set field of a patch to a lead in place.
pub fn apply_patch(lead: &mut Lead, patch: &LeadPatch) {
    if let Some(status) = patch.call_status {
        lead.call_status = status;
    }
    if let Some(count) = patch.retry_count {
        lead.retry_count = count;
    }
    if let Some(next) = patch.next_retry_at {
        lead.next_retry_at = next;
    }
    if let Some(sent) = patch.whatsapp_sent {
        lead.whatsapp_sent = sent;
    }
    if let Some(sent) = patch.email_sent {
        lead.email_sent = sent;
    }
    if let Some(call_id) = &patch.external_call_id {
        lead.external_call_id = call_id.clone();
    }
    if let Some(summary) = &patch.summary {
        lead.summary = Some(summary.clone());
    }
    if let Some(qualification) = &patch.qualification {
        lead.qualification = Some(qualification.clone());
    }
    if let Some(fields) = &patch.structured_fields {
        lead.structured_fields = Some(fields.clone());
    }
    if let Some(at) = patch.last_call_at {
        lead.last_call_at = Some(at);
    }
    if let Some(reason) = &patch.last_terminal_reason {
        lead.last_terminal_reason = Some(reason.clone());
    }
    if let Some(at) = patch.callback_requested_at {
        lead.callback_requested_at = at;
    }
}

#[async_trait]
impl LeadRepository for MockRepository {
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, LeadflowError> {
        let leads = self.leads.lock().await;
        let mut matched: Vec<Lead> = leads
            .values()
            .filter(|lead| Self::matches(lead, filter))
            .cloned()
            .collect();
        matched.sort_by_key(|lead| lead.created_at);
        Ok(matched)
    }

    async fn get_by_id(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
        Ok(self.leads.lock().await.get(&id).cloned())
    }

    async fn update_fields(&self, id: LeadId, patch: &LeadPatch) -> Result<(), LeadflowError> {
        *self.write_count.lock().await += 1;
        {
            let mut failing = self.failing_writes.lock().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(LeadflowError::Repository {
                    source: Box::new(std::io::Error::other("injected write failure")),
                });
            }
        }
        let mut leads = self.leads.lock().await;
        let lead = leads
            .get_mut(&id)
            .ok_or(LeadflowError::LeadNotFound { id })?;
        apply_patch(lead, patch);
        if !patch.extra.is_empty() {
            let mut columns = self.extra_columns.lock().await;
            columns.entry(id).or_default().extend(patch.extra.clone());
        }
        Ok(())
    }

    async fn append(&self, lead: &Lead) -> Result<(), LeadflowError> {
        self.leads.lock().await.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn delete(&self, id: LeadId) -> Result<bool, LeadflowError> {
        Ok(self.leads.lock().await.remove(&id).is_some())
    }

    async fn log_conversation(&self, entry: &ConversationEntry) -> Result<(), LeadflowError> {
        self.conversations.lock().await.push(entry.clone());
        Ok(())
    }

    async fn conversations_for(
        &self,
        id: LeadId,
    ) -> Result<Vec<ConversationEntry>, LeadflowError> {
        Ok(self
            .conversations
            .lock()
            .await
            .iter()
            .filter(|e| e.lead_id == id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn pending_leads_pass_the_due_filter_without_schedule() {
        let repo = MockRepository::new();
        let lead = crate::sample_lead("Pending Person");
        repo.insert(lead).await;

        let due = repo
            .list(&LeadFilter::due_for_call(Utc::now(), true))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn future_retries_are_not_due() {
        let repo = MockRepository::new();
        let mut lead = crate::sample_lead("Missed Person");
        lead.call_status = CallStatus::Missed;
        lead.next_retry_at = Some(Utc::now() + Duration::hours(1));
        let id = lead.id;
        repo.insert(lead).await;

        let due = repo
            .list(&LeadFilter::due_for_call(Utc::now(), true))
            .await
            .unwrap();
        assert!(due.is_empty());

        // Move the schedule into the past and it becomes due.
        let mut patch = LeadPatch::default();
        patch.next_retry_at = Some(Some(Utc::now() - Duration::minutes(5)));
        repo.update_fields(id, &patch).await.unwrap();
        let due = repo
            .list(&LeadFilter::due_for_call(Utc::now(), true))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_missed_leads_are_not_due() {
        let repo = MockRepository::new();
        let mut lead = crate::sample_lead("Exhausted Person");
        lead.call_status = CallStatus::Missed;
        lead.next_retry_at = None;
        repo.insert(lead).await;

        let due = repo
            .list(&LeadFilter::due_for_call(Utc::now(), true))
            .await
            .unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_consume_then_recover() {
        let repo = MockRepository::new();
        let lead = crate::sample_lead("Flaky Writes");
        let id = lead.id;
        repo.insert(lead).await;
        repo.fail_next_writes(2).await;

        let patch = LeadPatch::default().status(CallStatus::Initiated);
        assert!(repo.update_fields(id, &patch).await.is_err());
        assert!(repo.update_fields(id, &patch).await.is_err());
        assert!(repo.update_fields(id, &patch).await.is_ok());
        assert_eq!(repo.write_count().await, 3);
    }

    #[tokio::test]
    async fn extra_fields_accumulate() {
        let repo = MockRepository::new();
        let lead = crate::sample_lead("Analysed Person");
        let id = lead.id;
        repo.insert(lead).await;

        let mut patch = LeadPatch::default();
        patch.extra.insert("country".to_string(), "Germany".to_string());
        repo.update_fields(id, &patch).await.unwrap();

        let columns = repo.extra_columns_for(id).await;
        assert_eq!(columns.get("country").map(String::as_str), Some("Germany"));
    }
}
