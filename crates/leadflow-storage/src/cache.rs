// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-TTL read cache in front of a lead repository.
//!
//! Webhook bursts for one call hit `get_by_id` repeatedly within a few
//! seconds; the cache absorbs those re-reads. Writes invalidate the cached
//! entry, and a stale entry is served when the backing store errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use leadflow_core::{
    ConversationEntry, Lead, LeadFilter, LeadId, LeadPatch, LeadRepository, LeadflowError,
};
use tracing::warn;

struct CacheEntry {
    lead: Lead,
    fetched_at: Instant,
}

pub struct CachedLeadRepository {
    inner: Arc<dyn LeadRepository>,
    ttl: Duration,
    entries: DashMap<LeadId, CacheEntry>,
}

impl CachedLeadRepository {
    pub fn new(inner: Arc<dyn LeadRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }

    fn fresh(&self, id: LeadId) -> Option<Lead> {
        let entry = self.entries.get(&id)?;
        (entry.fetched_at.elapsed() <= self.ttl).then(|| entry.lead.clone())
    }

    fn stale(&self, id: LeadId) -> Option<Lead> {
        self.entries.get(&id).map(|e| e.lead.clone())
    }

    fn store(&self, lead: Lead) {
        self.entries.insert(
            lead.id,
            CacheEntry {
                lead,
                fetched_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, id: LeadId) {
        self.entries.remove(&id);
    }
}

#[async_trait]
impl LeadRepository for CachedLeadRepository {
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, LeadflowError> {
        self.inner.list(filter).await
    }

    async fn get_by_id(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
        if let Some(lead) = self.fresh(id) {
            return Ok(Some(lead));
        }
        match self.inner.get_by_id(id).await {
            Ok(Some(lead)) => {
                self.store(lead.clone());
                Ok(Some(lead))
            }
            Ok(None) => {
                self.invalidate(id);
                Ok(None)
            }
            Err(err) => {
                // A stale row beats dropping the event on a transient
                // storage hiccup.
                if let Some(lead) = self.stale(id) {
                    warn!(lead_id = %id, error = %err, "serving stale cached lead");
                    return Ok(Some(lead));
                }
                Err(err)
            }
        }
    }

    async fn update_fields(&self, id: LeadId, patch: &LeadPatch) -> Result<(), LeadflowError> {
        let result = self.inner.update_fields(id, patch).await;
        self.invalidate(id);
        result
    }

    async fn append(&self, lead: &Lead) -> Result<(), LeadflowError> {
        self.inner.append(lead).await
    }

    async fn delete(&self, id: LeadId) -> Result<bool, LeadflowError> {
        let result = self.inner.delete(id).await;
        self.invalidate(id);
        result
    }

    async fn log_conversation(&self, entry: &ConversationEntry) -> Result<(), LeadflowError> {
        self.inner.log_conversation(entry).await
    }

    async fn conversations_for(
        &self,
        id: LeadId,
    ) -> Result<Vec<ConversationEntry>, LeadflowError> {
        self.inner.conversations_for(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::repository::SqliteLeadRepository;
    use leadflow_core::CallStatus;

    async fn cached() -> (CachedLeadRepository, Arc<dyn LeadRepository>) {
        let db = Database::open_in_memory().await.unwrap();
        let inner: Arc<dyn LeadRepository> = Arc::new(SqliteLeadRepository::new(db));
        (
            CachedLeadRepository::new(Arc::clone(&inner), Duration::from_secs(30)),
            inner,
        )
    }

    #[tokio::test]
    async fn cached_read_skips_the_backing_store() {
        let (cache, inner) = cached().await;
        let lead = Lead::new_pending("+15550001111", None, "a@b.c", "Cache Me", "p");
        cache.append(&lead).await.unwrap();

        cache.get_by_id(lead.id).await.unwrap().unwrap();
        // Mutate behind the cache's back; the cached copy wins until TTL.
        inner
            .update_fields(lead.id, &LeadPatch::default().status(CallStatus::Missed))
            .await
            .unwrap();
        let seen = cache.get_by_id(lead.id).await.unwrap().unwrap();
        assert_eq!(seen.call_status, CallStatus::Pending);
    }

    #[tokio::test]
    async fn write_through_invalidates() {
        let (cache, _inner) = cached().await;
        let lead = Lead::new_pending("+15550001111", None, "a@b.c", "Invalidate", "p");
        cache.append(&lead).await.unwrap();
        cache.get_by_id(lead.id).await.unwrap();

        cache
            .update_fields(lead.id, &LeadPatch::default().status(CallStatus::Missed))
            .await
            .unwrap();
        let seen = cache.get_by_id(lead.id).await.unwrap().unwrap();
        assert_eq!(seen.call_status, CallStatus::Missed);
    }

    #[tokio::test]
    async fn missing_lead_is_not_cached_as_present() {
        let (cache, _inner) = cached().await;
        assert!(cache.get_by_id(LeadId::new()).await.unwrap().is_none());
    }
}
