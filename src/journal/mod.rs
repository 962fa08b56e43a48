// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The journal boundary: a single-partition, totally-ordered, offset-replay
//! append log. The real log service (a Kafka-family system) is an
//! out-of-scope external dependency; this module defines the trait a
//! production client would implement, an in-memory double for tests, and
//! the [`writer::Writer`]/[`receiver::Receiver`] wrappers that add
//! checkpoint semantics on top of the raw append/replay primitive.

pub mod entry;
pub mod local;
pub mod receiver;
pub mod writer;

use crate::error::Result;
use futures::future::BoxFuture;

pub use local::LocalJournalBackend;
pub use receiver::{Receiver, TryFetchError};
pub use writer::{Writer, CHECKPOINT_KEY, ENTRY_KEY};

/// One message read back from a topic, addressed by its offset.
#[derive(Debug, Clone)]
pub struct JournalMessage {
    /// Offset of this message within its topic.
    pub offset: u64,
    /// Routing key (this crate uses it to distinguish entry vs checkpoint
    /// records sharing one topic).
    pub key: String,
    /// Opaque payload.
    pub bytes: Vec<u8>,
}

/// A live, offset-seekable read position on a topic.
pub trait JournalSubscription: Send {
    /// Reposition this subscription to `offset`.
    fn set_offset(&mut self, offset: u64) -> BoxFuture<'_, Result<()>>;

    /// Block until the message at the current offset is available, then
    /// return it and advance. Callers race this against a cancellation
    /// signal with `tokio::select!`.
    fn fetch(&mut self) -> BoxFuture<'_, Result<JournalMessage>>;

    /// Current offset (the next one `fetch` will return).
    fn offset(&self) -> u64;

    /// Number of unread messages at the current offset.
    fn lag(&self) -> BoxFuture<'_, Result<u64>>;
}

/// A single-partition-per-topic append log.
pub trait JournalBackend: Send + Sync {
    /// Create `topic` if it does not already exist.
    fn ensure_topic(&self, topic: &str) -> BoxFuture<'_, Result<()>>;

    /// Append `bytes` under `key`, blocking until the backend acknowledges.
    /// Returns the offset the message was written at.
    fn append(&self, topic: &str, key: &str, bytes: Vec<u8>) -> BoxFuture<'_, Result<u64>>;

    /// Open a new subscription over `topic`, initially positioned at offset
    /// 0.
    fn subscribe(&self, topic: &str) -> BoxFuture<'_, Result<Box<dyn JournalSubscription>>>;
}
