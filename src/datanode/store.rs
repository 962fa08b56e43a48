// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! On-disk chunk storage: one `chunk_{id}` file per chunk, laid out as a
//! fixed-size cell-data region followed by an 8-byte big-endian version
//! trailer at [`crate::constants::VERSION_LOCATION`].

use crate::constants::{DEFAULT_PADDING, FILE_SIZE, VERSION_LOCATION};
use crate::error::{Error, Result};
use crate::model::ChunkId;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Chunk-file storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Open (creating if necessary) a chunk store rooted at `dir`.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self, id: ChunkId) -> PathBuf {
        self.dir.join(format!("chunk_{id}"))
    }

    /// `true` iff a file for `id` exists on disk.
    pub async fn exists(&self, id: ChunkId) -> bool {
        tokio::fs::metadata(self.path(id)).await.is_ok()
    }

    /// Read the current version trailer for `id`.
    pub async fn read_version(&self, id: ChunkId) -> Result<u64> {
        let mut file = open_existing(&self.path(id)).await?;
        file.seek(SeekFrom::Start(VERSION_LOCATION)).await?;
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf).await?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read `size` bytes starting at `offset` from chunk `id`.
    pub async fn read_range(&self, id: ChunkId, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mut file = open_existing(&self.path(id)).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Create a brand-new chunk file, writing `data` at `offset` into a
    /// freshly zero/padding-filled [`FILE_SIZE`] buffer, and set the version
    /// trailer to `version`.
    pub async fn create_with_write(
        &self,
        id: ChunkId,
        offset: u64,
        data: &[u8],
        version: u64,
    ) -> Result<()> {
        let mut buf = vec![DEFAULT_PADDING; FILE_SIZE as usize];
        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| Error::Invalid("chunk write overflows file".into()))?;
        if end > VERSION_LOCATION as usize {
            return Err(Error::Invalid("chunk write overruns the version trailer".into()));
        }
        buf[start..end].copy_from_slice(data);
        buf[VERSION_LOCATION as usize..VERSION_LOCATION as usize + 8]
            .copy_from_slice(&version.to_be_bytes());

        let tmp_path = self.path(id).with_extension("tmp");
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await?;
        file.write_all(&buf).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, self.path(id)).await?;
        Ok(())
    }

    /// Overwrite `data` at `offset` in an existing chunk file and bump its
    /// version trailer to `version`.
    pub async fn write_range_and_set_version(
        &self,
        id: ChunkId,
        offset: u64,
        data: &[u8],
        version: u64,
    ) -> Result<()> {
        if offset
            .checked_add(data.len() as u64)
            .map(|end| end > VERSION_LOCATION)
            .unwrap_or(true)
        {
            return Err(Error::Invalid("chunk write overruns the version trailer".into()));
        }
        let mut file = open_existing_rw(&self.path(id)).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.seek(SeekFrom::Start(VERSION_LOCATION)).await?;
        file.write_all(&version.to_be_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Remove the chunk file if present; missing is not an error.
    pub async fn delete(&self, id: ChunkId) -> Result<()> {
        match tokio::fs::remove_file(self.path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// CRC32 of the currently-stored bytes at `[offset, offset+size)`, used
    /// by secondary replay to detect whether a reconciling write actually
    /// changes anything.
    pub async fn crc32_of_range(&self, id: ChunkId, offset: u64, size: u64) -> Result<u32> {
        let bytes = self.read_range(id, offset, size).await?;
        Ok(crc32fast::hash(&bytes))
    }
}

async fn open_existing(path: &Path) -> Result<tokio::fs::File> {
    match tokio::fs::File::open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(format!("chunk file {}", path.display())))
        }
        Err(e) => Err(e.into()),
    }
}

async fn open_existing_rw(path: &Path) -> Result<tokio::fs::File> {
    match tokio::fs::OpenOptions::new().read(true).write(true).open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(format!("chunk file {}", path.display())))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read_back_written_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        store.create_with_write(1, 0, b"hello", 1).await.unwrap();
        assert!(store.exists(1).await);
        assert_eq!(store.read_version(1).await.unwrap(), 1);
        let data = store.read_range(1, 0, 5).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn overwrite_bumps_version_and_changes_only_targeted_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        store.create_with_write(1, 0, b"aaaa", 1).await.unwrap();
        store
            .write_range_and_set_version(1, 2048, b"bbbb", 2)
            .await
            .unwrap();
        assert_eq!(store.read_version(1).await.unwrap(), 2);
        assert_eq!(store.read_range(1, 0, 4).await.unwrap(), b"aaaa");
        assert_eq!(store.read_range(1, 2048, 4).await.unwrap(), b"bbbb");
    }

    #[tokio::test]
    async fn read_missing_chunk_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        assert!(matches!(
            store.read_version(99).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_missing_chunk_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        store.delete(42).await.unwrap();
    }
}
