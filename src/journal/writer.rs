// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! A single primary's write side of a journal topic: ordinary entry commits
//! plus an exclusive checkpoint window that blocks new entries without
//! starving ones already in flight (writer-preferred read/write locking).

use super::JournalBackend;
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

/// Routing key an ordinary entry commit is appended under.
pub const ENTRY_KEY: &str = "entry";
/// Routing key a checkpoint marker is appended under. A replay loop reading
/// a topic a [`Writer`] also checkpoints on must skip messages carrying this
/// key rather than decode them as entries.
pub const CHECKPOINT_KEY: &str = "checkpoint";

/// Writer-preferred commit/checkpoint coordinator for one topic.
#[derive(Debug)]
pub struct Writer {
    backend: Arc<dyn JournalBackend>,
    topic: String,
    lock: Arc<RwLock<()>>,
    last_entry_offset: Mutex<i64>,
}

impl Writer {
    /// Open (and ensure) the journal topic this primary will write to.
    pub async fn new(backend: Arc<dyn JournalBackend>, topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        backend.ensure_topic(&topic).await?;
        Ok(Self {
            backend,
            topic,
            lock: Arc::new(RwLock::new(())),
            last_entry_offset: Mutex::new(-1),
        })
    }

    /// Append one entry, blocking until the backend acknowledges. Blocked
    /// while a checkpoint is in progress.
    pub async fn commit_entry(&self, bytes: Vec<u8>) -> Result<u64> {
        let _permit = self.lock.read().await;
        let offset = self.backend.append(&self.topic, ENTRY_KEY, bytes).await?;
        *self.last_entry_offset.lock().await = offset as i64;
        Ok(offset)
    }

    /// [`Writer::commit_entry`], retried up to `attempts` times before
    /// giving up; callers map exhaustion to `Unavailable`.
    pub async fn commit_entry_retrying(&self, bytes: &[u8], attempts: u32) -> Result<u64> {
        let mut last_err = None;
        for _ in 0..attempts.max(1) {
            match self.commit_entry(bytes.to_vec()).await {
                Ok(offset) => return Ok(offset),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Unavailable("journal commit failed".into())))
    }

    /// Enter the exclusive checkpoint window, blocking new `commit_entry`
    /// calls. Returns a handle whose [`CheckpointWindow::checkpoint`] writes
    /// the marker and whose `Drop` releases the window (`ExitCheckpoint`).
    pub async fn prepare_checkpoint(&self) -> CheckpointWindow<'_> {
        let guard = self.lock.clone().write_owned().await;
        CheckpointWindow {
            writer: self,
            _guard: guard,
        }
    }
}

/// The exclusive window opened by [`Writer::prepare_checkpoint`]. Dropping
/// this value is `ExitCheckpoint`.
pub struct CheckpointWindow<'w> {
    writer: &'w Writer,
    _guard: OwnedRwLockWriteGuard<()>,
}

impl<'w> CheckpointWindow<'w> {
    /// The highest entry offset committed before this window opened, or
    /// `-1` if none has ever been committed.
    pub async fn last_entry_offset(&self) -> i64 {
        *self.writer.last_entry_offset.lock().await
    }

    /// Append the checkpoint marker and return the offset a secondary
    /// should resume replay from.
    pub async fn checkpoint(&self) -> Result<u64> {
        let last = self.last_entry_offset().await;
        let next_entry_offset = (last + 2) as u64;
        let marker = super::entry::CheckpointMarker { next_entry_offset };
        let bytes = bincode::serialize(&marker)?;
        self.writer
            .backend
            .append(&self.writer.topic, CHECKPOINT_KEY, bytes)
            .await?;
        Ok(next_entry_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::LocalJournalBackend;

    #[tokio::test]
    async fn checkpoint_resume_offset_skips_prior_entries_and_the_marker() {
        let backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());
        let writer = Writer::new(backend, "topic").await.unwrap();
        writer.commit_entry(vec![1]).await.unwrap();
        writer.commit_entry(vec![2]).await.unwrap();

        let window = writer.prepare_checkpoint().await;
        assert_eq!(window.last_entry_offset().await, 1);
        let next = window.checkpoint().await.unwrap();
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn checkpoint_on_empty_journal_resumes_at_one() {
        let backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());
        let writer = Writer::new(backend, "topic").await.unwrap();
        let window = writer.prepare_checkpoint().await;
        let next = window.checkpoint().await.unwrap();
        assert_eq!(next, 1);
    }
}
