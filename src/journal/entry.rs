// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Journal payload formats: the checkpoint marker shared by every topic,
//! the data node's fixed binary write/delete entry layout, and the
//! master's tagged map/chunk/cell entry records.

use crate::error::{Error, Result};
use crate::model::{Cell, CellId, Chunk, ChunkId, Sheet};
use serde::{Deserialize, Serialize};

/// Written by [`super::writer::Writer::prepare_checkpoint`]/`checkpoint`,
/// read by a secondary's replay loop to learn the replay-resume offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMarker {
    /// Offset a secondary should `set_offset` to after applying this
    /// checkpoint.
    pub next_entry_offset: u64,
}

/// Flag byte identifying a data-node write entry.
pub const WRITE_FLAG: u64 = 1;
/// Flag byte identifying a data-node delete entry.
pub const DELETE_FLAG: u64 = 2;

const HEADER_LEN: usize = 8 * 5 + 4;

/// A data-node journal entry, encoded as
/// `[flag:8][version:8][id:8][offset:8][size:8][crc32:4][data:size]` for
/// writes or `[flag:8][id:8]` for deletes (all integers big-endian).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataNodeEntry {
    /// A chunk write, already padded to its target size by the caller.
    Write {
        /// Version the write is claiming to establish.
        version: u64,
        /// Chunk being written.
        chunk_id: ChunkId,
        /// Byte offset within the chunk's cell-data region.
        offset: u64,
        /// Length of `data`.
        size: u64,
        /// CRC32 of `data`, used by secondary replay to detect staleness.
        crc32: u32,
        /// The padded write payload.
        data: Vec<u8>,
    },
    /// A chunk deletion.
    Delete {
        /// Chunk being removed.
        chunk_id: ChunkId,
    },
}

impl DataNodeEntry {
    /// Build a write entry, computing its CRC32 over `data`.
    pub fn new_write(version: u64, chunk_id: ChunkId, offset: u64, data: Vec<u8>) -> Self {
        let crc32 = crc32fast::hash(&data);
        Self::Write {
            version,
            chunk_id,
            offset,
            size: data.len() as u64,
            crc32,
            data,
        }
    }

    /// Encode this entry to its fixed binary wire/journal representation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DataNodeEntry::Write {
                version,
                chunk_id,
                offset,
                size,
                crc32,
                data,
            } => {
                let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
                buf.extend_from_slice(&WRITE_FLAG.to_be_bytes());
                buf.extend_from_slice(&version.to_be_bytes());
                buf.extend_from_slice(&chunk_id.to_be_bytes());
                buf.extend_from_slice(&offset.to_be_bytes());
                buf.extend_from_slice(&size.to_be_bytes());
                buf.extend_from_slice(&crc32.to_be_bytes());
                buf.extend_from_slice(data);
                buf
            }
            DataNodeEntry::Delete { chunk_id } => {
                let mut buf = Vec::with_capacity(16);
                buf.extend_from_slice(&DELETE_FLAG.to_be_bytes());
                buf.extend_from_slice(&chunk_id.to_be_bytes());
                buf
            }
        }
    }

    /// Decode an entry previously produced by [`DataNodeEntry::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Invalid("journal entry shorter than its flag".into()));
        }
        let flag = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
        match flag {
            WRITE_FLAG => {
                if bytes.len() < HEADER_LEN {
                    return Err(Error::Invalid("write journal entry truncated header".into()));
                }
                let version = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
                let chunk_id = u64::from_be_bytes(bytes[16..24].try_into().unwrap());
                let offset = u64::from_be_bytes(bytes[24..32].try_into().unwrap());
                let size = u64::from_be_bytes(bytes[32..40].try_into().unwrap());
                let crc32 = u32::from_be_bytes(bytes[40..44].try_into().unwrap());
                let data_end = HEADER_LEN
                    .checked_add(size as usize)
                    .ok_or_else(|| Error::Invalid("write journal entry size overflow".into()))?;
                if bytes.len() < data_end {
                    return Err(Error::Invalid("write journal entry truncated payload".into()));
                }
                let data = bytes[HEADER_LEN..data_end].to_vec();
                Ok(Self::Write {
                    version,
                    chunk_id,
                    offset,
                    size,
                    crc32,
                    data,
                })
            }
            DELETE_FLAG => {
                if bytes.len() < 16 {
                    return Err(Error::Invalid("delete journal entry truncated".into()));
                }
                let chunk_id = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
                Ok(Self::Delete { chunk_id })
            }
            other => Err(Error::Invalid(format!("unknown journal entry flag {other}"))),
        }
    }
}

/// Whether a master journal sub-record asserts or retracts its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetState {
    /// The subject should exist after this record is applied.
    Present,
    /// The subject should be removed when this record is applied.
    Absent,
}

/// Master journal record for a filename → sheet map entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEntryRecord {
    /// See [`TargetState`].
    pub target_state: TargetState,
    /// Sheet filename.
    pub filename: String,
    /// Opaque per-sheet cell index identifier.
    pub cells_table: String,
    /// Recycled flag at the time of this record.
    pub recycled: bool,
    /// Recycle timestamp at the time of this record, if recycled.
    pub recycled_at_ns: Option<i64>,
}

impl From<&Sheet> for MapEntryRecord {
    fn from(sheet: &Sheet) -> Self {
        Self {
            target_state: TargetState::Present,
            filename: sheet.filename.clone(),
            cells_table: sheet.cells_table.clone(),
            recycled: sheet.recycled,
            recycled_at_ns: sheet.recycled_at_ns,
        }
    }
}

impl MapEntryRecord {
    /// An `Absent` record for a filename being permanently removed.
    pub fn absent(filename: impl Into<String>) -> Self {
        Self {
            target_state: TargetState::Absent,
            filename: filename.into(),
            cells_table: String::new(),
            recycled: false,
            recycled_at_ns: None,
        }
    }

    /// Reconstruct the [`Sheet`] this record describes.
    pub fn into_sheet(self) -> Sheet {
        Sheet {
            filename: self.filename,
            cells_table: self.cells_table,
            recycled: self.recycled,
            recycled_at_ns: self.recycled_at_ns,
        }
    }
}

/// Master journal record for a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEntryRecord {
    /// See [`TargetState`].
    pub target_state: TargetState,
    /// Chunk id.
    pub id: ChunkId,
    /// Chunk version at the time of this record.
    pub version: u64,
    /// Owning data-node group.
    pub data_node_group: String,
    /// Whether this chunk holds the sheet's meta-cell.
    pub holds_meta: bool,
}

impl From<&Chunk> for ChunkEntryRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            target_state: TargetState::Present,
            id: chunk.id,
            version: chunk.version,
            data_node_group: chunk.data_node_group.clone(),
            holds_meta: chunk.holds_meta,
        }
    }
}

/// Master journal record for a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellEntryRecord {
    /// See [`TargetState`].
    pub target_state: TargetState,
    /// Cell id (`(row << 32) | col`, or the meta sentinel).
    pub cell_id: CellId,
    /// Byte offset within the owning chunk.
    pub offset: u64,
    /// Size in bytes of this cell's slot.
    pub size: u64,
    /// Owning chunk id.
    pub chunk_id: ChunkId,
    /// Owning sheet filename.
    pub sheet_name: String,
}

impl From<&Cell> for CellEntryRecord {
    fn from(cell: &Cell) -> Self {
        Self {
            target_state: TargetState::Present,
            cell_id: cell.id,
            offset: cell.offset,
            size: cell.size,
            chunk_id: cell.chunk_id,
            sheet_name: cell.sheet_name.clone(),
        }
    }
}

impl CellEntryRecord {
    /// Reconstruct the [`Cell`] this record describes.
    pub fn into_cell(self) -> Cell {
        Cell {
            id: self.cell_id,
            sheet_name: self.sheet_name,
            chunk_id: self.chunk_id,
            offset: self.offset,
            size: self.size,
        }
    }
}

/// One master journal record: any subset of its three sub-records may be
/// present, but cell and chunk must be both-present or both-absent (see
/// [`crate::master::file_manager::FileManager::apply_entry`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterJournalEntry {
    /// Filename → sheet map mutation, if any.
    pub map_entry: Option<MapEntryRecord>,
    /// Chunk mutation, if any.
    pub chunk_entry: Option<ChunkEntryRecord>,
    /// Cell mutation, if any.
    pub cell_entry: Option<CellEntryRecord>,
}

impl MasterJournalEntry {
    /// Serialise via bincode for journal transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialise a record produced by [`MasterJournalEntry::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datanode_write_entry_round_trips() {
        let entry = DataNodeEntry::new_write(3, 42, 2048, vec![9; 128]);
        let encoded = entry.encode();
        let decoded = DataNodeEntry::decode(&encoded).unwrap();
        assert_eq!(entry, decoded);
    }

    #[test]
    fn datanode_delete_entry_round_trips() {
        let entry = DataNodeEntry::Delete { chunk_id: 7 };
        let encoded = entry.encode();
        let decoded = DataNodeEntry::decode(&encoded).unwrap();
        assert_eq!(entry, decoded);
    }

    #[test]
    fn master_journal_entry_round_trips_through_bincode() {
        let sheet = Sheet::new("s");
        let record = MasterJournalEntry {
            map_entry: Some(MapEntryRecord::from(&sheet)),
            chunk_entry: None,
            cell_entry: None,
        };
        let encoded = record.encode().unwrap();
        let decoded = MasterJournalEntry::decode(&encoded).unwrap();
        assert_eq!(decoded.map_entry.unwrap().filename, "s");
    }
}
