// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Crate-wide error type. Internal errors never cross the wire verbatim;
//! [`Error::to_status`] reduces every variant to the six-member
//! [`crate::model::Status`] enumeration before a reply leaves a server.

use crate::model::Status;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors produced by this crate's master, data-node, client and
/// ambient-infrastructure modules.
#[derive(Debug, Error)]
pub enum Error {
    /// A named resource (sheet, fd, chunk) was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A named resource already exists.
    #[error("already exists: {0}")]
    Exist(String),
    /// The request was malformed or addressed a missing cell.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// An optimistic-concurrency check failed; never surfaced to a client's
    /// caller, only used internally between the spin loop and its server.
    #[error("wrong version: expected {expected}, found {found}")]
    WrongVersion {
        /// The version the caller presented.
        expected: u64,
        /// The version currently on record.
        found: u64,
    },
    /// The backend is transiently unavailable.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// No data-node group is registered with the allocator.
    #[error("no data-node group is registered")]
    NoDataNode,
    /// A journal entry violates a cross-field invariant during replay.
    #[error("invalid journal entry: {0}")]
    InvalidJournalEntry(String),
    /// The client-side operation was cancelled (deadline elapsed or caller
    /// dropped the token) before it could make progress.
    #[error("operation cancelled")]
    Cancelled,
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Bincode (de)serialisation failure, used on the wire and in the
    /// on-disk journal entry encoding.
    #[error("serialisation error: {0}")]
    Bincode(#[from] bincode::Error),
    /// Sled (the per-sheet/per-chunk persistent index) failure.
    #[error("storage engine error: {0}")]
    Sled(#[from] sled::Error),
    /// Coordination-service failure (election root missing, session lost).
    #[error("coordination service error: {0}")]
    Coordination(String),
    /// Journal-backend failure (append rejected, topic missing).
    #[error("journal backend error: {0}")]
    Journal(String),
    /// Transport-layer failure (connect, send, or peer protocol violation).
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Reduce this error to the wire-level status it should be reported as.
    /// `WrongVersion` is included for completeness of the mapping but is
    /// never actually sent by a correctly behaving server — see
    /// [`crate::datanode::server`] and [`crate::master::file_manager`].
    pub fn to_status(&self) -> Status {
        match self {
            Error::NotFound(_) => Status::NotFound,
            Error::Exist(_) => Status::Exist,
            Error::Invalid(_) | Error::InvalidJournalEntry(_) => Status::Invalid,
            Error::WrongVersion { .. } => Status::WrongVersion,
            Error::Unavailable(_)
            | Error::NoDataNode
            | Error::Coordination(_)
            | Error::Journal(_)
            | Error::Transport(_)
            | Error::Io(_)
            | Error::Bincode(_)
            | Error::Sled(_) => Status::Unavailable,
            Error::Cancelled => Status::Unavailable,
        }
    }
}
