//! Resumable stream state.
//!
//! One record per session under `stream_state/<session_id>` in the
//! key-value store: the aggregate so far, the conversation that produced
//! it, and when it was saved.

use std::sync::Arc;

use chrono::Utc;
use streamwell_platform::KeyValueStore;
use streamwell_types::{ConversationWindow, ResumableState, StreamAggregate};
use tracing::{debug, warn};

use crate::error::{Result, StreamError};

const KEY_PREFIX: &str = "stream_state/";

/// Save, load, and clear in-flight aggregates.
#[derive(Clone)]
pub struct ResumableStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ResumableStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }

    /// Persist `aggregate` and `window` for `session_id`, replacing any
    /// earlier record.
    pub async fn save(
        &self,
        session_id: &str,
        aggregate: &StreamAggregate,
        window: &ConversationWindow,
    ) -> Result<()> {
        let state = ResumableState {
            aggregate: aggregate.clone(),
            window: window.clone(),
            saved_at: Utc::now(),
        };
        let value =
            serde_json::to_value(&state).map_err(|e| StreamError::Storage(e.to_string()))?;
        self.kv.set(&Self::key(session_id), value).await?;
        debug!(
            session_id,
            content_len = aggregate.content.len(),
            reasoning_len = aggregate.reasoning.len(),
            "saved stream state"
        );
        Ok(())
    }

    /// The saved record, or `None`. A record that no longer parses is
    /// treated as absent.
    pub async fn load(&self, session_id: &str) -> Result<Option<ResumableState>> {
        let Some(value) = self.kv.get(&Self::key(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<ResumableState>(value) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(session_id, error = %e, "discarding unreadable stream state");
                Ok(None)
            }
        }
    }

    /// Remove the record. Clearing a missing record succeeds.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        self.kv.delete(&Self::key(session_id)).await?;
        debug!(session_id, "cleared stream state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamwell_platform::MemoryStore;
    use streamwell_types::Turn;

    fn store() -> (ResumableStateStore, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        (ResumableStateStore::new(kv.clone()), kv)
    }

    fn aggregate(content: &str) -> StreamAggregate {
        let mut agg = StreamAggregate::new("s1");
        agg.content = content.into();
        agg
    }

    fn window() -> ConversationWindow {
        ConversationWindow::new("s1", vec![Turn::user("hi")], 10)
    }

    #[tokio::test]
    async fn save_then_load() {
        let (store, kv) = store();
        store.save("s1", &aggregate("Hello"), &window()).await.unwrap();

        let state = store.load("s1").await.unwrap().unwrap();
        assert_eq!(state.aggregate.content, "Hello");
        assert_eq!(state.window, window());
        assert!(kv.get("stream_state/s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let (store, _) = store();
        store.save("s1", &aggregate("one"), &window()).await.unwrap();
        assert!(store.load("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn later_save_replaces_earlier() {
        let (store, _) = store();
        store.save("s1", &aggregate("Hel"), &window()).await.unwrap();
        store.save("s1", &aggregate("Hello"), &window()).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap().unwrap().aggregate.content, "Hello");
    }

    #[tokio::test]
    async fn clear_twice_is_a_noop() {
        let (store, kv) = store();
        store.save("s1", &aggregate("x"), &window()).await.unwrap();
        store.clear("s1").await.unwrap();
        store.clear("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn unreadable_record_is_absent() {
        let (store, kv) = store();
        kv.set("stream_state/s1", json!({"content": 42})).await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
    }
}
