// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! An in-process double for [`super::JournalBackend`], backing unit and
//! integration tests. Not wire-compatible with any real log service.

use super::{JournalBackend, JournalMessage, JournalSubscription};
use crate::error::Result;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

#[derive(Debug, Default)]
struct TopicState {
    entries: RwLock<Vec<(String, Vec<u8>)>>,
    notify: Notify,
}

/// In-memory [`JournalBackend`] implementation.
#[derive(Debug, Clone, Default)]
pub struct LocalJournalBackend {
    topics: Arc<DashMap<String, Arc<TopicState>>>,
}

impl LocalJournalBackend {
    /// Construct a fresh, empty journal double.
    pub fn new() -> Self {
        Self::default()
    }

    fn topic_state(&self, topic: &str) -> Arc<TopicState> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TopicState::default()))
            .clone()
    }
}

impl JournalBackend for LocalJournalBackend {
    fn ensure_topic(&self, topic: &str) -> BoxFuture<'_, Result<()>> {
        let topic = topic.to_string();
        Box::pin(async move {
            self.topic_state(&topic);
            Ok(())
        })
    }

    fn append(&self, topic: &str, key: &str, bytes: Vec<u8>) -> BoxFuture<'_, Result<u64>> {
        let topic = topic.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let state = self.topic_state(&topic);
            let offset = {
                let mut entries = state.entries.write().await;
                entries.push((key, bytes));
                (entries.len() - 1) as u64
            };
            state.notify.notify_waiters();
            Ok(offset)
        })
    }

    fn subscribe(&self, topic: &str) -> BoxFuture<'_, Result<Box<dyn JournalSubscription>>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let state = self.topic_state(&topic);
            Ok(Box::new(LocalSubscription { state, offset: 0 }) as Box<dyn JournalSubscription>)
        })
    }
}

struct LocalSubscription {
    state: Arc<TopicState>,
    offset: u64,
}

impl JournalSubscription for LocalSubscription {
    fn set_offset(&mut self, offset: u64) -> BoxFuture<'_, Result<()>> {
        self.offset = offset;
        Box::pin(async { Ok(()) })
    }

    fn fetch(&mut self) -> BoxFuture<'_, Result<JournalMessage>> {
        Box::pin(async move {
            loop {
                {
                    let entries = self.state.entries.read().await;
                    if (self.offset as usize) < entries.len() {
                        let (key, bytes) = entries[self.offset as usize].clone();
                        let offset = self.offset;
                        self.offset += 1;
                        return Ok(JournalMessage { offset, key, bytes });
                    }
                }
                self.state.notify.notified().await;
            }
        })
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn lag(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let len = self.state.entries.read().await.len() as u64;
            Ok(len.saturating_sub(self.offset))
        })
    }
}

impl std::fmt::Debug for LocalSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSubscription")
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_fetch_in_order() {
        let backend = LocalJournalBackend::new();
        backend.ensure_topic("t").await.unwrap();
        backend.append("t", "a", vec![1]).await.unwrap();
        backend.append("t", "b", vec![2]).await.unwrap();

        let mut sub = backend.subscribe("t").await.unwrap();
        let m1 = sub.fetch().await.unwrap();
        let m2 = sub.fetch().await.unwrap();
        assert_eq!(m1.bytes, vec![1]);
        assert_eq!(m2.bytes, vec![2]);
        assert_eq!(m1.offset, 0);
        assert_eq!(m2.offset, 1);
    }

    #[tokio::test]
    async fn lag_reflects_unread_backlog() {
        let backend = LocalJournalBackend::new();
        backend.append("t", "a", vec![1]).await.unwrap();
        backend.append("t", "b", vec![2]).await.unwrap();
        let sub = backend.subscribe("t").await.unwrap();
        assert_eq!(sub.lag().await.unwrap(), 2);
    }
}
