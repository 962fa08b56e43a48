// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The primary-side data-node RPC surface: `WriteChunk`, `ReadChunk`,
//! `DeleteChunk`. Every mutation is journaled before it is applied to the
//! chunk file, and journal-commit failure short-circuits to `Unavailable`
//! without touching the file.

use super::store::ChunkStore;
use crate::constants::ACK_MOST_TIMES;
use crate::error::{Error, Result};
use crate::journal::entry::DataNodeEntry;
use crate::journal::Writer;
use crate::model::{ChunkId, Status};
use crate::transport::messages::{DataNodeRequest, DataNodeResponse};
use crate::transport::RequestHandler;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-chunk serialisation of local file mutations, plus the journal that
/// every mutation is committed to first.
#[derive(Debug)]
pub struct DataNodeServer {
    store: ChunkStore,
    writer: Arc<Writer>,
    locks: DashMap<ChunkId, Arc<Mutex<()>>>,
}

impl DataNodeServer {
    /// Build a server over `store`, committing mutations through `writer`.
    pub fn new(store: ChunkStore, writer: Arc<Writer>) -> Self {
        Self {
            store,
            writer,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: ChunkId) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// `WriteChunk`: see [`super`] module docs for the full state machine.
    pub async fn write_chunk(
        &self,
        id: ChunkId,
        offset: u64,
        target_size: u64,
        padding: u8,
        version: u64,
        mut data: Vec<u8>,
    ) -> Result<()> {
        if (data.len() as u64) < target_size {
            data.resize(target_size as usize, padding);
        }

        let entry = DataNodeEntry::new_write(version, id, offset, data.clone());
        self.writer
            .commit_entry_retrying(&entry.encode(), ACK_MOST_TIMES)
            .await
            .map_err(|e| Error::Unavailable(format!("journal commit failed: {e}")))?;

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        if !self.store.exists(id).await {
            if version != 1 {
                return Err(Error::WrongVersion { expected: 1, found: 0 });
            }
            self.store.create_with_write(id, offset, &data, version).await
        } else {
            let current = self.store.read_version(id).await?;
            if version != current + 1 {
                return Err(Error::WrongVersion {
                    expected: current + 1,
                    found: version,
                });
            }
            self.store.write_range_and_set_version(id, offset, &data, version).await
        }
    }

    /// `ReadChunk`.
    pub async fn read_chunk(&self, id: ChunkId, offset: u64, size: u64, version: u64) -> Result<Vec<u8>> {
        if !self.store.exists(id).await {
            return Err(Error::NotFound(format!("chunk {id}")));
        }
        let current = self.store.read_version(id).await?;
        if current < version {
            return Err(Error::WrongVersion {
                expected: version,
                found: current,
            });
        }
        self.store.read_range(id, offset, size).await
    }

    /// `DeleteChunk`: journal-first, then best-effort file removal.
    pub async fn delete_chunk(&self, id: ChunkId) -> Result<()> {
        let entry = DataNodeEntry::Delete { chunk_id: id };
        self.writer
            .commit_entry_retrying(&entry.encode(), ACK_MOST_TIMES)
            .await
            .map_err(|e| Error::Unavailable(format!("journal commit failed: {e}")))?;

        if let Err(e) = self.store.delete(id).await {
            error!("failed to remove chunk {id} file after journaling its deletion: {e}");
        }
        Ok(())
    }
}

impl RequestHandler<DataNodeRequest, DataNodeResponse> for DataNodeServer {
    fn handle(&self, request: DataNodeRequest) -> BoxFuture<'_, DataNodeResponse> {
        Box::pin(async move {
            let result = match request {
                DataNodeRequest::ReadChunk { id, offset, size, version } => {
                    self.read_chunk(id, offset, size, version).await.map(Some)
                }
                DataNodeRequest::WriteChunk {
                    id,
                    offset,
                    target_size,
                    padding,
                    version,
                    data,
                } => self
                    .write_chunk(id, offset, target_size, padding, version, data)
                    .await
                    .map(|()| None),
                DataNodeRequest::DeleteChunk { id } => self.delete_chunk(id).await.map(|()| None),
            };

            match result {
                Ok(Some(data)) => DataNodeResponse { status: Status::Ok, data },
                Ok(None) => DataNodeResponse { status: Status::Ok, data: Vec::new() },
                Err(e) => DataNodeResponse { status: e.to_status(), data: Vec::new() },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::LocalJournalBackend;

    async fn server() -> DataNodeServer {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        let backend: Arc<dyn crate::journal::JournalBackend> = Arc::new(LocalJournalBackend::new());
        let writer = Arc::new(Writer::new(backend, "topic").await.unwrap());
        DataNodeServer::new(store, writer)
    }

    #[tokio::test]
    async fn first_write_requires_version_one() {
        let server = server().await;
        assert!(matches!(
            server.write_chunk(1, 0, 16, b' ', 2, vec![1, 2, 3]).await,
            Err(Error::WrongVersion { .. })
        ));
        server.write_chunk(1, 0, 16, b' ', 1, vec![1, 2, 3]).await.unwrap();
    }

    #[tokio::test]
    async fn subsequent_write_requires_exact_next_version() {
        let server = server().await;
        server.write_chunk(1, 0, 16, b' ', 1, vec![1]).await.unwrap();
        assert!(matches!(
            server.write_chunk(1, 0, 16, b' ', 3, vec![2]).await,
            Err(Error::WrongVersion { .. })
        ));
        server.write_chunk(1, 0, 16, b' ', 2, vec![2]).await.unwrap();
    }

    #[tokio::test]
    async fn read_before_version_available_is_wrong_version() {
        let server = server().await;
        server.write_chunk(1, 0, 16, b' ', 1, vec![9]).await.unwrap();
        assert!(matches!(
            server.read_chunk(1, 0, 1, 2).await,
            Err(Error::WrongVersion { .. })
        ));
        assert_eq!(server.read_chunk(1, 0, 1, 1).await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn read_missing_chunk_is_not_found() {
        let server = server().await;
        assert!(matches!(server.read_chunk(1, 0, 1, 1).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_then_recreate_with_version_one_succeeds() {
        let server = server().await;
        server.write_chunk(1, 0, 16, b' ', 1, vec![1]).await.unwrap();
        server.delete_chunk(1).await.unwrap();
        server.write_chunk(1, 0, 16, b' ', 1, vec![2]).await.unwrap();
    }
}
