// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! An in-process double for [`super::Coordination`], backing unit and
//! integration tests. Not wire-compatible with any real coordination
//! service and not meant for production deployment.

use super::Coordination;
use crate::error::{Error, Result};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Default)]
struct RootState {
    next_seq: AtomicU64,
    children: Mutex<BTreeMap<String, ()>>,
}

/// In-memory [`Coordination`] implementation.
#[derive(Debug, Clone, Default)]
pub struct LocalCoordination {
    nodes: Arc<DashMap<String, Vec<u8>>>,
    roots: Arc<DashMap<String, Arc<RootState>>>,
    watchers: Arc<DashMap<String, Vec<oneshot::Sender<()>>>>,
}

impl LocalCoordination {
    /// Construct a fresh, empty coordination double.
    pub fn new() -> Self {
        Self::default()
    }

    fn root_state(&self, root: &str) -> Arc<RootState> {
        self.roots
            .entry(root.to_string())
            .or_insert_with(|| Arc::new(RootState::default()))
            .clone()
    }
}

impl Coordination for LocalCoordination {
    fn ensure_node(&self, path: &str) -> BoxFuture<'_, Result<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.nodes.entry(path).or_insert_with(Vec::new);
            Ok(())
        })
    }

    fn create_sequential_ephemeral(&self, root: &str) -> BoxFuture<'_, Result<String>> {
        let root = root.to_string();
        Box::pin(async move {
            let state = self.root_state(&root);
            let seq = state.next_seq.fetch_add(1, Ordering::SeqCst);
            let name = format!("{:010}", seq);
            state.children.lock().await.insert(name.clone(), ());
            self.nodes.insert(format!("{}/{}", root, name), Vec::new());
            Ok(name)
        })
    }

    fn children(&self, root: &str) -> BoxFuture<'_, Result<Vec<String>>> {
        let root = root.to_string();
        Box::pin(async move {
            let state = self.root_state(&root);
            Ok(state.children.lock().await.keys().cloned().collect())
        })
    }

    fn watch(&self, path: &str) -> BoxFuture<'_, Result<oneshot::Receiver<()>>> {
        let path = path.to_string();
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            if !self.nodes.contains_key(&path) {
                // Already gone: fire immediately so the caller re-evaluates.
                let _ = tx.send(());
                return Ok(rx);
            }
            self.watchers.entry(path).or_insert_with(Vec::new).push(tx);
            Ok(rx)
        })
    }

    fn set(&self, path: &str, data: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.nodes.insert(path, data);
            Ok(())
        })
    }

    fn get(&self, path: &str) -> BoxFuture<'_, Result<Vec<u8>>> {
        let path = path.to_string();
        Box::pin(async move {
            self.nodes
                .get(&path)
                .map(|v| v.clone())
                .ok_or_else(|| Error::NotFound(format!("coordination node {path}")))
        })
    }

    fn delete(&self, path: &str) -> BoxFuture<'_, Result<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.nodes.remove(&path);
            if let Some(root) = path.rsplit_once('/').map(|(root, _)| root.to_string()) {
                if let Some(state) = self.roots.get(&root) {
                    let name = path.rsplit_once('/').map(|(_, n)| n).unwrap_or(&path);
                    state.children.lock().await.remove(name);
                }
            }
            if let Some((_, senders)) = self.watchers.remove(&path) {
                for tx in senders {
                    let _ = tx.send(());
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_ephemeral_nodes_sort_and_delete_fires_watch() {
        let coord = LocalCoordination::new();
        coord.ensure_node("root").await.unwrap();
        let a = coord.create_sequential_ephemeral("root").await.unwrap();
        let b = coord.create_sequential_ephemeral("root").await.unwrap();
        assert!(a < b);

        let mut children = coord.children("root").await.unwrap();
        children.sort();
        assert_eq!(children, vec![a.clone(), b.clone()]);

        let death = coord.watch(&format!("root/{a}")).await.unwrap();
        coord.delete(&format!("root/{a}")).await.unwrap();
        death.await.unwrap();

        let children = coord.children("root").await.unwrap();
        assert_eq!(children, vec![b]);
    }
}
