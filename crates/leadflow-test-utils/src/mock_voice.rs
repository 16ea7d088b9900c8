// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock voice gateway with scriptable placement outcomes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::{
    CallId, CallPlacement, GatewayCallState, Lead, LeadId, LeadflowError, VoiceGateway,
};
use tokio::sync::Mutex;

/// A voice gateway that records placements and replays scripted results.
///
/// By default every `initiate` succeeds with a generated call id. Push
/// errors with [`MockVoiceGateway::fail_next_call`] to script rejections;
/// scripted results are consumed in order before the default applies.
pub struct MockVoiceGateway {
    placed: Arc<Mutex<Vec<LeadId>>>,
    scripted: Arc<Mutex<VecDeque<Result<(), String>>>>,
    statuses: Arc<Mutex<HashMap<CallId, GatewayCallState>>>,
    transcripts: Arc<Mutex<HashMap<CallId, String>>>,
    /// Delay applied to every `initiate`, for timeout tests.
    placement_delay: Arc<Mutex<Option<std::time::Duration>>>,
}

impl MockVoiceGateway {
    pub fn new() -> Self {
        Self {
            placed: Arc::new(Mutex::new(Vec::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            transcripts: Arc::new(Mutex::new(HashMap::new())),
            placement_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Script the next placement to be rejected with this message.
    pub async fn fail_next_call(&self, message: &str) {
        self.scripted
            .lock()
            .await
            .push_back(Err(message.to_string()));
    }

    /// Make every placement take this long before resolving.
    pub async fn set_placement_delay(&self, delay: std::time::Duration) {
        *self.placement_delay.lock().await = Some(delay);
    }

    /// Lead ids in placement order.
    pub async fn placed_calls(&self) -> Vec<LeadId> {
        self.placed.lock().await.clone()
    }

    pub async fn placed_count(&self) -> usize {
        self.placed.lock().await.len()
    }

    /// Script the authoritative status returned for a call id.
    pub async fn set_status(&self, call_id: CallId, state: GatewayCallState) {
        self.statuses.lock().await.insert(call_id, state);
    }

    /// Script a transcript for a call id.
    pub async fn set_transcript(&self, call_id: CallId, text: &str) {
        self.transcripts
            .lock()
            .await
            .insert(call_id, text.to_string());
    }
}

impl Default for MockVoiceGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGateway for MockVoiceGateway {
    async fn initiate(&self, lead: &Lead) -> Result<CallPlacement, LeadflowError> {
        if let Some(delay) = *self.placement_delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.scripted.lock().await.pop_front();
        if let Some(Err(message)) = scripted {
            return Err(LeadflowError::Gateway {
                message,
                source: None,
            });
        }
        self.placed.lock().await.push(lead.id);
        Ok(CallPlacement {
            call_id: CallId(format!("mock-call-{}", uuid::Uuid::new_v4())),
        })
    }

    async fn get_status(&self, call_id: &CallId) -> Result<GatewayCallState, LeadflowError> {
        self.statuses
            .lock()
            .await
            .get(call_id)
            .cloned()
            .ok_or_else(|| LeadflowError::Gateway {
                message: format!("unknown call {}", call_id.0),
                source: None,
            })
    }

    async fn get_transcript(&self, call_id: &CallId) -> Result<Option<String>, LeadflowError> {
        Ok(self.transcripts.lock().await.get(call_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initiate_records_and_generates_ids() {
        let gateway = MockVoiceGateway::new();
        let lead = crate::sample_lead("Callable Person");
        let placement = gateway.initiate(&lead).await.unwrap();
        assert!(placement.call_id.0.starts_with("mock-call-"));
        assert_eq!(gateway.placed_calls().await, vec![lead.id]);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let gateway = MockVoiceGateway::new();
        let lead = crate::sample_lead("Unlucky Person");
        gateway.fail_next_call("line busy").await;

        assert!(gateway.initiate(&lead).await.is_err());
        assert!(gateway.initiate(&lead).await.is_ok());
        assert_eq!(gateway.placed_count().await, 1);
    }

    #[tokio::test]
    async fn status_and_transcript_replay_scripts() {
        let gateway = MockVoiceGateway::new();
        let call_id = CallId("call-1".to_string());
        gateway
            .set_status(call_id.clone(), GatewayCallState::Completed)
            .await;
        gateway.set_transcript(call_id.clone(), "hello there").await;

        assert_eq!(
            gateway.get_status(&call_id).await.unwrap(),
            GatewayCallState::Completed
        );
        assert_eq!(
            gateway.get_transcript(&call_id).await.unwrap().as_deref(),
            Some("hello there")
        );
        assert!(gateway
            .get_transcript(&CallId("other".to_string()))
            .await
            .unwrap()
            .is_none());
    }
}
