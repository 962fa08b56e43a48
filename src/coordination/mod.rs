// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The coordination-service boundary: ephemeral-sequential nodes, watches,
//! and a plain get/set node used for ack publication. The real coordination
//! service (a ZooKeeper-family system) is an out-of-scope external
//! dependency; this module defines the trait a production client would
//! implement, plus an in-memory double used by tests and by the election
//! logic in [`election`].

pub mod election;
pub mod local;

use crate::error::Result;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

pub use local::LocalCoordination;

/// A minimal ZooKeeper-shaped coordination service boundary.
///
/// Paths are `/`-free flat names scoped under a root (e.g.
/// `"master_election"`); this crate never needs a hierarchical namespace
/// beyond one level of children.
pub trait Coordination: Send + Sync {
    /// Create `path` as a persistent node if it does not already exist.
    fn ensure_node(&self, path: &str) -> BoxFuture<'_, Result<()>>;

    /// Create an ephemeral, sequentially-named child of `root` and return its
    /// base name (not including `root`). The node disappears if this
    /// session is lost; see [`Coordination::watch`].
    fn create_sequential_ephemeral(&self, root: &str) -> BoxFuture<'_, Result<String>>;

    /// List the base names of every child currently under `root`.
    fn children(&self, root: &str) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Register for one-shot notification when `path` is deleted (session
    /// loss of an ephemeral node, or an explicit delete).
    fn watch(&self, path: &str) -> BoxFuture<'_, Result<oneshot::Receiver<()>>>;

    /// Unconditionally overwrite the data stored at `path`.
    fn set(&self, path: &str, data: Vec<u8>) -> BoxFuture<'_, Result<()>>;

    /// Read the data stored at `path`.
    fn get(&self, path: &str) -> BoxFuture<'_, Result<Vec<u8>>>;

    /// Remove `path`, firing any watchers registered on it.
    fn delete(&self, path: &str) -> BoxFuture<'_, Result<()>>;
}
