// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! A secondary's read side of a journal topic: cancellable blocking fetch,
//! and a non-blocking drain primitive used by a newly-elected primary to
//! catch up before acking.

use super::{JournalBackend, JournalMessage, JournalSubscription};
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Failure of a [`Receiver::try_fetch_entry`] call.
#[derive(Debug)]
pub enum TryFetchError {
    /// The subscription has no unread messages right now; this is the
    /// ordinary "catch-up is done" signal, not a failure a caller should
    /// treat as an error.
    Drained,
    /// The backend itself failed to answer `lag`/`fetch`. A caller draining
    /// backlog before acking leadership must treat this as fatal rather than
    /// silently stop as if catch-up had simply finished.
    Backend(Error),
}

impl std::fmt::Display for TryFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryFetchError::Drained => write!(f, "no more journal messages"),
            TryFetchError::Backend(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TryFetchError {}

/// Offset-seekable reader over a journal topic.
pub struct Receiver {
    subscription: Box<dyn JournalSubscription>,
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("offset", &self.subscription.offset())
            .finish()
    }
}

impl Receiver {
    /// Subscribe to `topic`, positioned at offset 0.
    pub async fn new(backend: Arc<dyn JournalBackend>, topic: &str) -> Result<Self> {
        Ok(Self {
            subscription: backend.subscribe(topic).await?,
        })
    }

    /// Reposition this receiver, typically to a checkpoint's
    /// `next_entry_offset` on startup.
    pub async fn set_offset(&mut self, offset: u64) -> Result<()> {
        self.subscription.set_offset(offset).await
    }

    /// Current read offset.
    pub fn offset(&self) -> u64 {
        self.subscription.offset()
    }

    /// Block until the next message arrives, or until `cancel` fires.
    pub async fn fetch_entry(&mut self, cancel: &CancellationToken) -> Result<JournalMessage> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.subscription.fetch() => result,
        }
    }

    /// Non-blocking fetch used while draining the backlog before becoming
    /// primary: returns the next message if one is already available,
    /// otherwise reports [`TryFetchError::Drained`] rather than waiting for
    /// new traffic. A genuine backend failure is reported distinctly as
    /// [`TryFetchError::Backend`] so callers don't mistake it for having
    /// finished catch-up.
    pub async fn try_fetch_entry(&mut self) -> std::result::Result<JournalMessage, TryFetchError> {
        let lag = self.subscription.lag().await.map_err(TryFetchError::Backend)?;
        if lag == 0 {
            return Err(TryFetchError::Drained);
        }
        self.subscription.fetch().await.map_err(TryFetchError::Backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::LocalJournalBackend;

    #[tokio::test]
    async fn try_fetch_entry_drains_then_reports_empty() {
        let backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());
        backend.append("t", "k", vec![1]).await.unwrap();
        backend.append("t", "k", vec![2]).await.unwrap();

        let mut receiver = Receiver::new(backend, "t").await.unwrap();
        assert_eq!(receiver.try_fetch_entry().await.unwrap().bytes, vec![1]);
        assert_eq!(receiver.try_fetch_entry().await.unwrap().bytes, vec![2]);
        assert!(matches!(
            receiver.try_fetch_entry().await,
            Err(TryFetchError::Drained)
        ));
    }

    #[tokio::test]
    async fn fetch_entry_is_cancellable() {
        let backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());
        let mut receiver = Receiver::new(backend, "t").await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            receiver.fetch_entry(&cancel).await,
            Err(Error::Cancelled)
        ));
    }
}
