// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The master's authoritative metadata store: the flat filename map, the
//! open-fd table, and per-sheet chunk/cell layout. Every mutation is built
//! as a [`MasterJournalEntry`], committed through the primary's journal
//! writer, then applied to memory and the persistent index by
//! [`FileManager::apply_entry`] — the same function a secondary's replay
//! loop calls, so there is exactly one place that knows how to interpret a
//! journal record.

use super::allocator::Allocator;
use super::sheet_file::SheetFile;
use crate::constants::{self, ACK_MOST_TIMES, BYTES_PER_CHUNK, MAX_BYTES_PER_CELL};
use crate::error::{Error, Result};
use crate::journal::entry::{CellEntryRecord, ChunkEntryRecord, MapEntryRecord, MasterJournalEntry, TargetState};
use crate::journal::Writer;
use crate::model::{Cell, Chunk, ChunkId, Fd, Sheet};
use crate::transport::messages::{MasterRequest, MasterResponse, MasterResponseBody};
use crate::transport::RequestHandler;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

const SHEETS_TREE: &str = "sheets";
const FILES_TREE: &str = "files";
const COUNTERS_TREE: &str = "counters";
const NEXT_FD_KEY: &[u8] = b"next_fd";
const NEXT_CHUNK_ID_KEY: &[u8] = b"next_chunk_id";

/// The master's in-memory and persisted metadata, plus the allocator it
/// hands out data-node groups from.
pub struct FileManager {
    allocator: Arc<Allocator>,
    writer: Arc<Writer>,
    db: sled::Db,
    entries: RwLock<HashMap<String, Sheet>>,
    files: RwLock<HashMap<String, Arc<Mutex<SheetFile>>>>,
    fds: RwLock<HashMap<Fd, String>>,
    next_fd: AtomicU64,
    next_chunk_id: AtomicU64,
    /// Set once this instance has been acked as primary; every mutating
    /// handler short-circuits with `Unavailable` while this is `false`, so a
    /// primary that has lost its election session without yet noticing
    /// cannot keep accepting writes.
    is_primary: AtomicBool,
}

impl FileManager {
    /// Open (creating if necessary) the persistent index under `data_dir`
    /// and load its sheet map into memory.
    pub async fn open(data_dir: impl AsRef<Path>, allocator: Arc<Allocator>, writer: Arc<Writer>) -> Result<Self> {
        let db = sled::open(data_dir.as_ref().join("index"))?;
        let sheets_tree = db.open_tree(SHEETS_TREE)?;
        let mut entries = HashMap::new();
        for item in sheets_tree.iter() {
            let (_, value) = item?;
            let sheet: Sheet = bincode::deserialize(&value)?;
            entries.insert(sheet.filename.clone(), sheet);
        }

        let counters = db.open_tree(COUNTERS_TREE)?;
        let next_fd = read_counter(&counters, NEXT_FD_KEY)?;
        let next_chunk_id = read_counter(&counters, NEXT_CHUNK_ID_KEY)?;

        Ok(Self {
            allocator,
            writer,
            db,
            entries: RwLock::new(entries),
            files: RwLock::new(HashMap::new()),
            fds: RwLock::new(HashMap::new()),
            next_fd: AtomicU64::new(next_fd),
            next_chunk_id: AtomicU64::new(next_chunk_id),
            is_primary: AtomicBool::new(false),
        })
    }

    /// Mark this instance as primary, allowing mutating RPCs through. Called
    /// once this process has caught up on the journal and bound its RPC
    /// listener.
    pub fn mark_primary(&self) {
        self.is_primary.store(true, Ordering::SeqCst);
    }

    /// Register a data-node group's address with the allocator.
    pub async fn register_data_node(&self, group: String) {
        self.allocator.register_group(group).await;
    }

    fn require_primary(&self) -> Result<()> {
        if self.is_primary.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable("this instance is not the acked primary".into()))
        }
    }

    async fn file_for(&self, filename: &str) -> Result<Arc<Mutex<SheetFile>>> {
        if let Some(file) = self.files.read().await.get(filename) {
            return Ok(file.clone());
        }
        let mut files = self.files.write().await;
        if let Some(file) = files.get(filename) {
            return Ok(file.clone());
        }
        let loaded = self.load_sheet_file(filename)?.unwrap_or_default();
        let file = Arc::new(Mutex::new(loaded));
        files.insert(filename.to_string(), file.clone());
        Ok(file)
    }

    fn load_sheet_file(&self, filename: &str) -> Result<Option<SheetFile>> {
        let tree = self.db.open_tree(FILES_TREE)?;
        match tree.get(filename.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn persist_sheet(&self, sheet: &Sheet) -> Result<()> {
        let tree = self.db.open_tree(SHEETS_TREE)?;
        tree.insert(sheet.filename.as_bytes(), bincode::serialize(sheet)?)?;
        Ok(())
    }

    fn remove_persisted_sheet(&self, filename: &str) -> Result<()> {
        let tree = self.db.open_tree(SHEETS_TREE)?;
        tree.remove(filename.as_bytes())?;
        let files = self.db.open_tree(FILES_TREE)?;
        files.remove(filename.as_bytes())?;
        Ok(())
    }

    fn persist_file(&self, filename: &str, file: &SheetFile) -> Result<()> {
        let tree = self.db.open_tree(FILES_TREE)?;
        tree.insert(filename.as_bytes(), bincode::serialize(file)?)?;
        Ok(())
    }

    async fn filename_for_fd(&self, fd: Fd) -> Result<String> {
        self.fds
            .read()
            .await
            .get(&fd)
            .cloned()
            .ok_or_else(|| Error::Invalid(format!("unknown file handle {fd}")))
    }

    async fn commit(&self, entry: &MasterJournalEntry) -> Result<()> {
        self.writer
            .commit_entry_retrying(&entry.encode()?, ACK_MOST_TIMES)
            .await
            .map_err(|e| Error::Unavailable(format!("master journal commit failed: {e}")))
    }

    /// Apply a (possibly replayed) journal entry to memory and the
    /// persistent index. Used both by the primary right after committing and
    /// by a secondary's replay loop.
    pub async fn apply_entry(&self, entry: &MasterJournalEntry) -> Result<()> {
        if let Some(map) = &entry.map_entry {
            match map.target_state {
                TargetState::Present => {
                    let sheet = map.clone().into_sheet();
                    self.persist_sheet(&sheet)?;
                    self.entries.write().await.insert(sheet.filename.clone(), sheet.clone());
                    self.files
                        .write()
                        .await
                        .entry(sheet.filename)
                        .or_insert_with(|| Arc::new(Mutex::new(SheetFile::new())));
                }
                TargetState::Absent => {
                    self.remove_persisted_sheet(&map.filename)?;
                    self.entries.write().await.remove(&map.filename);
                    self.files.write().await.remove(&map.filename);
                }
            }
        }

        match (&entry.chunk_entry, &entry.cell_entry) {
            (None, None) => {}
            (Some(chunk_rec), Some(cell_rec)) => {
                let filename = cell_rec.sheet_name.clone();
                if !self.entries.read().await.contains_key(&filename) {
                    return Err(Error::InvalidJournalEntry(format!(
                        "cell entry references unknown sheet {filename}"
                    )));
                }
                let file = self.file_for(&filename).await?;
                let mut guard = file.lock().await;
                match chunk_rec.target_state {
                    TargetState::Present => guard.apply_chunk_record(
                        chunk_rec.id,
                        chunk_rec.version,
                        chunk_rec.data_node_group.clone(),
                        chunk_rec.holds_meta,
                    ),
                    TargetState::Absent => guard.remove_chunk(chunk_rec.id),
                }
                match cell_rec.target_state {
                    TargetState::Present => guard.insert_cell(cell_rec.clone().into_cell()),
                    TargetState::Absent => guard.remove_cell(cell_rec.cell_id),
                }
                self.persist_file(&filename, &guard)?;
            }
            _ => {
                return Err(Error::InvalidJournalEntry(
                    "chunk and cell entries must both be present or both absent".into(),
                ))
            }
        }
        Ok(())
    }

    /// `CreateSheet`.
    pub async fn create_sheet(&self, filename: String) -> Result<Fd> {
        self.require_primary()?;
        if self.entries.read().await.contains_key(&filename) {
            return Err(Error::Exist(filename));
        }

        let group = self.allocator.allocate().await?;
        let chunk_id = self.next_chunk_id.fetch_add(1, Ordering::SeqCst);
        let chunk = Chunk::new(chunk_id, group, true);
        let cell = Cell::new_meta(&filename, chunk_id);

        let sheet = Sheet::new(&filename);
        let entry = MasterJournalEntry {
            map_entry: Some(MapEntryRecord::from(&sheet)),
            chunk_entry: Some(ChunkEntryRecord::from(&chunk)),
            cell_entry: Some(CellEntryRecord::from(&cell)),
        };
        self.commit(&entry).await?;
        self.apply_entry(&entry).await?;

        Ok(self.open_handle(filename).await)
    }

    /// `OpenSheet`.
    pub async fn open_sheet(&self, filename: String) -> Result<Fd> {
        self.require_primary()?;
        let sheet = self
            .entries
            .read()
            .await
            .get(&filename)
            .cloned()
            .ok_or_else(|| Error::NotFound(filename.clone()))?;
        if sheet.recycled {
            return Err(Error::NotFound(filename));
        }
        self.file_for(&filename).await?;
        Ok(self.open_handle(filename).await)
    }

    async fn open_handle(&self, filename: String) -> Fd {
        let fd = self.next_fd.fetch_add(1, Ordering::SeqCst);
        self.fds.write().await.insert(fd, filename);
        fd
    }

    async fn set_recycled(&self, filename: String, recycled: bool) -> Result<()> {
        self.require_primary()?;
        let mut sheet = self
            .entries
            .read()
            .await
            .get(&filename)
            .cloned()
            .ok_or_else(|| Error::NotFound(filename.clone()))?;
        sheet.set_recycled(recycled);
        let entry = MasterJournalEntry {
            map_entry: Some(MapEntryRecord::from(&sheet)),
            chunk_entry: None,
            cell_entry: None,
        };
        self.commit(&entry).await?;
        self.apply_entry(&entry).await
    }

    /// `RecycleSheet`.
    pub async fn recycle_sheet(&self, filename: String) -> Result<()> {
        self.set_recycled(filename, true).await
    }

    /// `ResumeSheet`.
    pub async fn resume_sheet(&self, filename: String) -> Result<()> {
        self.set_recycled(filename, false).await
    }

    /// `DeleteSheet`: permanent, synchronous removal of the map entry. Also
    /// used in-process by the recycle-retention monitor.
    pub async fn delete_sheet(&self, filename: String) -> Result<()> {
        self.require_primary()?;
        if !self.entries.read().await.contains_key(&filename) {
            return Err(Error::NotFound(filename));
        }
        let entry = MasterJournalEntry {
            map_entry: Some(MapEntryRecord::absent(&filename)),
            chunk_entry: None,
            cell_entry: None,
        };
        self.commit(&entry).await?;
        self.apply_entry(&entry).await
    }

    /// `ListSheets`.
    pub async fn list_sheets(&self) -> Vec<Sheet> {
        self.entries.read().await.values().cloned().collect()
    }

    /// `ReadSheet`.
    pub async fn read_sheet(&self, fd: Fd) -> Result<Vec<Chunk>> {
        let filename = self.filename_for_fd(fd).await?;
        let file = self.file_for(&filename).await?;
        Ok(file.lock().await.all_chunks())
    }

    /// `ReadCell`.
    pub async fn read_cell(&self, fd: Fd, row: u32, col: u32) -> Result<(Cell, Chunk)> {
        let filename = self.filename_for_fd(fd).await?;
        let file = self.file_for(&filename).await?;
        let guard = file.lock().await;
        let cell_id = constants::cell_id(row, col);
        let cell = guard.cell(cell_id).ok_or_else(|| Error::Invalid(format!("no cell at ({row}, {col})")))?;
        let chunk = guard
            .chunk(cell.chunk_id)
            .ok_or_else(|| Error::Invalid("cell references a missing chunk".into()))?;
        Ok((cell, chunk))
    }

    /// `WriteCell`: resolve or allocate the target cell, and always bump its
    /// chunk's version by exactly one.
    pub async fn write_cell(&self, fd: Fd, row: u32, col: u32) -> Result<(Cell, Chunk)> {
        self.require_primary()?;
        let filename = self.filename_for_fd(fd).await?;
        let file = self.file_for(&filename).await?;
        let cell_id = constants::cell_id(row, col);

        let mut guard = file.lock().await;

        if let Some(existing) = guard.cell(cell_id) {
            let chunk = guard
                .chunk(existing.chunk_id)
                .ok_or_else(|| Error::Invalid("cell references a missing chunk".into()))?;
            let mut bumped = chunk.clone();
            bumped.version += 1;

            let entry = MasterJournalEntry {
                map_entry: None,
                chunk_entry: Some(ChunkEntryRecord::from(&bumped)),
                cell_entry: Some(CellEntryRecord::from(&existing)),
            };
            self.commit(&entry).await?;

            guard.insert_chunk(bumped.clone());
            self.persist_file(&filename, &guard)?;
            return Ok((existing, bumped));
        }

        let is_meta = constants::is_meta_cell(row, col);
        let new_cell_size = if is_meta { BYTES_PER_CHUNK } else { MAX_BYTES_PER_CELL };

        let chunk_id = match guard.last_available_chunk_with_room(new_cell_size) {
            Some(id) => id,
            None => {
                let group = self.allocator.allocate().await?;
                let id = self.next_chunk_id.fetch_add(1, Ordering::SeqCst);
                guard.insert_chunk(Chunk::new(id, group, is_meta));
                id
            }
        };

        let offset = guard.next_offset_in(chunk_id);
        let cell = Cell {
            id: cell_id,
            sheet_name: filename.clone(),
            chunk_id,
            offset,
            size: new_cell_size,
        };

        let mut chunk = guard
            .chunk(chunk_id)
            .ok_or_else(|| Error::Invalid("newly allocated chunk vanished".into()))?;
        chunk.cells.push(cell_id);
        chunk.version += 1;

        let entry = MasterJournalEntry {
            map_entry: None,
            chunk_entry: Some(ChunkEntryRecord::from(&chunk)),
            cell_entry: Some(CellEntryRecord::from(&cell)),
        };
        self.commit(&entry).await?;

        guard.insert_chunk(chunk.clone());
        guard.insert_cell(cell.clone());
        guard.set_last_available_chunk(if chunk.has_room_for(new_cell_size, MAX_BYTES_PER_CELL) {
            Some(chunk_id)
        } else {
            None
        });
        self.persist_file(&filename, &guard)?;

        Ok((cell, chunk))
    }

    /// Filenames currently recycled for longer than `retention`, used by the
    /// recycle-retention monitor.
    pub async fn sheets_recycled_before(&self, cutoff_unix_ns: i64) -> Vec<String> {
        self.entries
            .read()
            .await
            .values()
            .filter(|sheet| sheet.recycled && sheet.recycled_at_ns.map(|ns| ns < cutoff_unix_ns).unwrap_or(false))
            .map(|sheet| sheet.filename.clone())
            .collect()
    }

    /// Trigger a checkpoint: mark the journal resume offset and flush the
    /// in-memory index (already durable per-mutation via sled, so this just
    /// records the offset a secondary should fast-forward to).
    pub async fn checkpoint(&self) -> Result<u64> {
        let window = self.writer.prepare_checkpoint().await;
        let next_offset = window.checkpoint().await?;
        let counters = self.db.open_tree(COUNTERS_TREE)?;
        counters.insert(b"checkpoint_offset", &next_offset.to_be_bytes())?;
        counters.insert(NEXT_FD_KEY, &self.next_fd.load(Ordering::SeqCst).to_be_bytes())?;
        counters.insert(NEXT_CHUNK_ID_KEY, &self.next_chunk_id.load(Ordering::SeqCst).to_be_bytes())?;
        Ok(next_offset)
    }

    /// The last recorded checkpoint offset, if any.
    pub fn recorded_checkpoint_offset(&self) -> Result<Option<u64>> {
        let counters = self.db.open_tree(COUNTERS_TREE)?;
        Ok(counters
            .get(b"checkpoint_offset")?
            .map(|bytes| u64::from_be_bytes(bytes.as_ref().try_into().unwrap())))
    }
}

fn read_counter(tree: &sled::Tree, key: &[u8]) -> Result<u64> {
    Ok(tree
        .get(key)?
        .map(|bytes| u64::from_be_bytes(bytes.as_ref().try_into().unwrap()))
        .unwrap_or(0))
}

impl RequestHandler<MasterRequest, MasterResponse> for FileManager {
    fn handle(&self, request: MasterRequest) -> BoxFuture<'_, MasterResponse> {
        Box::pin(async move {
            let result: Result<MasterResponseBody> = match request {
                MasterRequest::RegisterDataNode { group, .. } => {
                    self.register_data_node(group).await;
                    Ok(MasterResponseBody::None)
                }
                MasterRequest::CreateSheet { filename } => self.create_sheet(filename).await.map(MasterResponseBody::Fd),
                MasterRequest::OpenSheet { filename } => self.open_sheet(filename).await.map(MasterResponseBody::Fd),
                MasterRequest::DeleteSheet { filename } => {
                    self.delete_sheet(filename).await.map(|()| MasterResponseBody::None)
                }
                MasterRequest::RecycleSheet { filename } => {
                    self.recycle_sheet(filename).await.map(|()| MasterResponseBody::None)
                }
                MasterRequest::ResumeSheet { filename } => {
                    self.resume_sheet(filename).await.map(|()| MasterResponseBody::None)
                }
                MasterRequest::ListSheets => Ok(MasterResponseBody::Sheets(self.list_sheets().await)),
                MasterRequest::ReadSheet { fd } => self.read_sheet(fd).await.map(MasterResponseBody::Chunks),
                MasterRequest::ReadCell { fd, row, col } => self
                    .read_cell(fd, row, col)
                    .await
                    .map(|(cell, chunk)| MasterResponseBody::CellChunk(cell, chunk)),
                MasterRequest::WriteCell { fd, row, col } => self
                    .write_cell(fd, row, col)
                    .await
                    .map(|(cell, chunk)| MasterResponseBody::CellChunk(cell, chunk)),
            };

            match result {
                Ok(body) => MasterResponse { status: crate::model::Status::Ok, body },
                Err(e) => MasterResponse {
                    status: e.to_status(),
                    body: MasterResponseBody::None,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::LocalJournalBackend;

    async fn manager() -> (FileManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let allocator = Arc::new(Allocator::new());
        allocator.register_group("group-a".into()).await;
        let backend: Arc<dyn crate::journal::JournalBackend> = Arc::new(LocalJournalBackend::new());
        let writer = Arc::new(Writer::new(backend, "master").await.unwrap());
        let manager = FileManager::open(dir.path(), allocator, writer).await.unwrap();
        manager.mark_primary();
        (manager, dir)
    }

    #[tokio::test]
    async fn create_then_open_round_trips_a_sheet() {
        let (manager, _dir) = manager().await;
        let fd = manager.create_sheet("s".into()).await.unwrap();
        let chunks = manager.read_sheet(fd).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].holds_meta);

        assert!(matches!(
            manager.create_sheet("s".into()).await,
            Err(Error::Exist(_))
        ));

        let fd2 = manager.open_sheet("s".into()).await.unwrap();
        assert_ne!(fd, fd2);
    }

    #[tokio::test]
    async fn write_cell_allocates_then_reuses_a_chunk_and_bumps_version_once() {
        let (manager, _dir) = manager().await;
        let fd = manager.create_sheet("s".into()).await.unwrap();

        let (cell, chunk) = manager.write_cell(fd, 0, 0).await.unwrap();
        assert_eq!(chunk.version, 1);
        assert_eq!(cell.offset, 0);

        let (cell_again, chunk_again) = manager.write_cell(fd, 0, 0).await.unwrap();
        assert_eq!(cell_again.id, cell.id);
        assert_eq!(chunk_again.version, 2);
    }

    #[tokio::test]
    async fn write_cell_on_meta_coordinates_updates_the_meta_chunk() {
        let (manager, _dir) = manager().await;
        let fd = manager.create_sheet("s".into()).await.unwrap();
        let (cell, chunk) = manager
            .write_cell(fd, crate::constants::META_CELL_COORD, crate::constants::META_CELL_COORD)
            .await
            .unwrap();
        assert!(chunk.holds_meta);
        assert_eq!(cell.id, crate::constants::META_CELL_ID);
        assert_eq!(chunk.version, 1);
    }

    #[tokio::test]
    async fn recycle_then_open_fails_but_delete_removes_the_entry() {
        let (manager, _dir) = manager().await;
        manager.create_sheet("s".into()).await.unwrap();
        manager.recycle_sheet("s".into()).await.unwrap();
        assert!(matches!(
            manager.open_sheet("s".into()).await,
            Err(Error::NotFound(_))
        ));

        manager.resume_sheet("s".into()).await.unwrap();
        manager.open_sheet("s".into()).await.unwrap();

        manager.delete_sheet("s".into()).await.unwrap();
        assert!(matches!(
            manager.open_sheet("s".into()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            manager.delete_sheet("s".into()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_writes_to_the_same_cell_serialize_to_distinct_versions() {
        let (manager, _dir) = manager().await;
        let fd = manager.create_sheet("s".into()).await.unwrap();
        manager.write_cell(fd, 0, 0).await.unwrap();

        let (a, b) = tokio::join!(manager.write_cell(fd, 0, 0), manager.write_cell(fd, 0, 0));
        let (_, chunk_a) = a.unwrap();
        let (_, chunk_b) = b.unwrap();
        assert_ne!(chunk_a.version, chunk_b.version);

        let (_, latest) = manager.write_cell(fd, 0, 0).await.unwrap();
        assert_eq!(latest.version, chunk_a.version.max(chunk_b.version) + 1);
    }

    #[tokio::test]
    async fn mutating_calls_fail_unavailable_before_this_instance_is_primary() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = Arc::new(Allocator::new());
        allocator.register_group("group-a".into()).await;
        let backend: Arc<dyn crate::journal::JournalBackend> = Arc::new(LocalJournalBackend::new());
        let writer = Arc::new(Writer::new(backend, "master").await.unwrap());
        let manager = FileManager::open(dir.path(), allocator, writer).await.unwrap();

        assert!(matches!(
            manager.create_sheet("s".into()).await,
            Err(Error::Unavailable(_))
        ));
    }
}
