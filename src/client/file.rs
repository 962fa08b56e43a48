// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! A sheet open for cell and whole-sheet I/O: the master resolves a cell to
//! its storage location, then the client spins against the data node until
//! the version the master promised is actually visible there.

use super::client::{status_result, status_to_error, Client};
use crate::constants::{BYTES_PER_CHUNK, DEFAULT_PADDING};
use crate::error::{Error, Result};
use crate::model::{Cell, Chunk, ChunkId, Fd};
use crate::transport::messages::{DataNodeRequest, MasterRequest, MasterResponseBody};
use crate::model::Status;
use tokio_util::sync::CancellationToken;

/// Bytes read back from a whole-sheet read: cell data (one data chunk after
/// another, in no particular order) plus the meta-cell's bytes, kept
/// separate rather than spliced into the legacy single-buffer format.
#[derive(Debug, Clone, Default)]
pub struct SheetBytes {
    /// Concatenated bytes of every non-meta chunk.
    pub cell_data: Vec<u8>,
    /// The meta-cell's raw bytes.
    pub meta: Vec<u8>,
}

impl SheetBytes {
    fn empty() -> Self {
        Self::default()
    }
}

/// Result of [`OpenFile::read`]: on failure, whatever was assembled from the
/// chunks that did complete is returned alongside the error rather than
/// discarded, matching a worker-pool read where every worker runs to
/// completion regardless of a sibling's failure.
pub type ReadResult = std::result::Result<SheetBytes, (SheetBytes, Error)>;

/// A sheet opened via [`Client::create_sheet`] or [`Client::open_sheet`].
pub struct OpenFile {
    client: Client,
    fd: Fd,
}

impl OpenFile {
    pub(super) fn new(client: Client, fd: Fd) -> Self {
        Self { client, fd }
    }

    /// The file handle underlying this open sheet.
    pub fn fd(&self) -> Fd {
        self.fd
    }

    /// `ReadCell`, then spin against the data node until its version catches
    /// up to the one the master returned.
    pub async fn read_cell(&self, row: u32, col: u32, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let (cell, chunk) = self.resolve_cell(row, col, MasterRequest::ReadCell { fd: self.fd, row, col }).await?;
        self.client
            .spin_read(&chunk.data_node_group, cell.chunk_id, cell.offset, cell.size, chunk.version, cancel)
            .await
    }

    /// `WriteCell`, then spin against the data node until the write commits
    /// at the version the master assigned.
    pub async fn write_cell(&self, row: u32, col: u32, data: Vec<u8>, cancel: &CancellationToken) -> Result<()> {
        let (cell, chunk) = self.resolve_cell(row, col, MasterRequest::WriteCell { fd: self.fd, row, col }).await?;
        self.client
            .spin_write(&chunk.data_node_group, cell.chunk_id, cell.offset, cell.size, chunk.version, data, cancel)
            .await
    }

    async fn resolve_cell(&self, _row: u32, _col: u32, request: MasterRequest) -> Result<(Cell, Chunk)> {
        let response = self.client.call_master(request).await?;
        status_result(response.status)?;
        match response.body {
            MasterResponseBody::CellChunk(cell, chunk) => Ok((cell, chunk)),
            _ => Err(Error::Invalid("master response body did not match the request kind".into())),
        }
    }

    /// `ReadSheet`, then fetch every chunk concurrently, spinning on each
    /// worker until its chunk's promised version is visible. Every worker
    /// runs to completion regardless of a sibling's failure; on error, what
    /// was assembled is returned alongside it rather than discarded.
    pub async fn read(&self, cancel: &CancellationToken) -> ReadResult {
        let response = self
            .client
            .call_master(MasterRequest::ReadSheet { fd: self.fd })
            .await
            .map_err(|e| (SheetBytes::empty(), e))?;
        status_result(response.status).map_err(|e| (SheetBytes::empty(), e))?;
        let chunks = match response.body {
            MasterResponseBody::Chunks(chunks) => chunks,
            _ => {
                return Err((
                    SheetBytes::empty(),
                    Error::Invalid("master response body did not match the request kind".into()),
                ))
            }
        };

        let meta_chunk = chunks.iter().find(|chunk| chunk.holds_meta).cloned();
        let data_chunks: Vec<Chunk> = chunks.into_iter().filter(|chunk| !chunk.holds_meta).collect();

        let mut tasks = Vec::with_capacity(data_chunks.len());
        for chunk in data_chunks {
            let client = self.client.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                client
                    .spin_read(&chunk.data_node_group, chunk.id, 0, BYTES_PER_CHUNK, chunk.version, &cancel)
                    .await
            }));
        }

        let mut cell_data = Vec::new();
        let mut first_err = None;
        for task in tasks {
            match task.await {
                Ok(Ok(bytes)) => cell_data.extend(bytes),
                Ok(Err(e)) => {
                    cancel.cancel();
                    first_err.get_or_insert(e);
                }
                Err(e) => {
                    cancel.cancel();
                    first_err.get_or_insert(Error::Unavailable(format!("read worker panicked: {e}")));
                }
            }
        }

        let meta = match meta_chunk {
            Some(chunk) => {
                match self
                    .client
                    .spin_read(&chunk.data_node_group, chunk.id, 0, BYTES_PER_CHUNK, chunk.version, cancel)
                    .await
                {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        first_err.get_or_insert(e);
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        let sheet_bytes = SheetBytes { cell_data, meta };
        match first_err {
            Some(e) => Err((sheet_bytes, e)),
            None => Ok(sheet_bytes),
        }
    }
}

impl Client {
    async fn spin_read(
        &self,
        group: &str,
        chunk_id: ChunkId,
        offset: u64,
        size: u64,
        version: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let request = DataNodeRequest::ReadChunk { id: chunk_id, offset, size, version };
            let response = self.call_data_node(group, request).await?;
            match response.status {
                Status::Ok => return Ok(response.data),
                Status::WrongVersion => {
                    tokio::task::yield_now().await;
                    continue;
                }
                other => return Err(status_to_error(other)),
            }
        }
    }

    async fn spin_write(
        &self,
        group: &str,
        chunk_id: ChunkId,
        offset: u64,
        target_size: u64,
        version: u64,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let request = DataNodeRequest::WriteChunk {
                id: chunk_id,
                offset,
                target_size,
                padding: DEFAULT_PADDING,
                version,
                data: data.clone(),
            };
            let response = self.call_data_node(group, request).await?;
            match response.status {
                Status::Ok => return Ok(()),
                Status::WrongVersion => {
                    tokio::task::yield_now().await;
                    continue;
                }
                other => return Err(status_to_error(other)),
            }
        }
    }
}
