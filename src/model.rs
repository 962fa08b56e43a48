// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The shared data model: sheets, chunks, cells, file handles, and the
//! wire-level status enumeration.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use strum_macros::{Display, EnumString};

/// An opaque handle returned by `CreateSheet`/`OpenSheet`, resolving to a
/// sheet for the lifetime of the session that opened it.
pub type Fd = u64;

/// Globally unique, monotonically assigned chunk identifier.
pub type ChunkId = u64;

/// `(row << 32) | col`, or [`crate::constants::META_CELL_ID`] for the
/// meta-cell. See [`crate::constants::cell_id`].
pub type CellId = i64;

/// Wire-level result status shared by every RPC in the system. `WrongVersion`
/// is an internal data-node/master signal; the client library never lets it
/// escape to its own callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Status {
    /// The call succeeded.
    Ok,
    /// The named resource does not exist (or is not currently visible).
    NotFound,
    /// The named resource already exists.
    Exist,
    /// The request was malformed, or addresses a cell that does not exist.
    Invalid,
    /// An optimistic-concurrency check failed; retry is expected to succeed.
    WrongVersion,
    /// The backend is transiently unavailable; retry against a re-resolved
    /// endpoint.
    Unavailable,
}

/// A spreadsheet's namespace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    /// Unique key in the flat namespace.
    pub filename: String,
    /// Opaque identifier for this sheet's persisted cell index.
    pub cells_table: String,
    /// Whether the sheet is currently recycled (soft-deleted).
    pub recycled: bool,
    /// Unix nanosecond timestamp of the most recent recycle, if any.
    pub recycled_at_ns: Option<i64>,
}

impl Sheet {
    /// Build a freshly created, non-recycled sheet.
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let cells_table = format!("cells::{}", filename);
        Self {
            filename,
            cells_table,
            recycled: false,
            recycled_at_ns: None,
        }
    }

    /// Flip the recycled flag, stamping `recycled_at_ns` with the current
    /// time when transitioning into the recycled state.
    pub fn set_recycled(&mut self, recycled: bool) {
        self.recycled = recycled;
        self.recycled_at_ns = if recycled {
            Some(now_unix_nanos())
        } else {
            None
        };
    }
}

fn now_unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// A chunk of chunk-storage on a data-node group: up to
/// [`crate::constants::MAX_CELLS_PER_CHUNK`] ordinary cells, or exactly one
/// meta-cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique chunk id.
    pub id: ChunkId,
    /// Address (as resolved by the client) of the owning data-node group.
    pub data_node_group: String,
    /// Monotonically increasing version; the optimistic-concurrency token.
    pub version: u64,
    /// Cell ids currently laid out in this chunk, in allocation order.
    pub cells: Vec<CellId>,
    /// `true` iff this chunk holds the sheet's single meta-cell.
    pub holds_meta: bool,
}

impl Chunk {
    /// A freshly allocated, empty chunk with version 0 (version becomes 1 on
    /// its first cell write).
    pub fn new(id: ChunkId, data_node_group: impl Into<String>, holds_meta: bool) -> Self {
        Self {
            id,
            data_node_group: data_node_group.into(),
            version: 0,
            cells: Vec::new(),
            holds_meta,
        }
    }

    /// Bytes currently claimed by cells in this chunk.
    pub fn used_bytes(&self, max_bytes_per_cell: u64) -> u64 {
        if self.holds_meta {
            return crate::constants::BYTES_PER_CHUNK;
        }
        self.cells.len() as u64 * max_bytes_per_cell
    }

    /// `true` iff a cell of `new_cell_size` still fits in this chunk.
    pub fn has_room_for(&self, new_cell_size: u64, max_bytes_per_cell: u64) -> bool {
        if self.holds_meta {
            return false;
        }
        self.cells.len() < crate::constants::MAX_CELLS_PER_CHUNK
            && self.used_bytes(max_bytes_per_cell) + new_cell_size <= crate::constants::BYTES_PER_CHUNK
    }
}

/// A logical (row, column) addressable unit of client I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Derived id; see [`crate::constants::cell_id`].
    pub id: CellId,
    /// Owning sheet's filename.
    pub sheet_name: String,
    /// Chunk this cell's bytes live in.
    pub chunk_id: ChunkId,
    /// Byte offset within the chunk's cell-data region.
    pub offset: u64,
    /// Size in bytes of this cell's slot.
    pub size: u64,
}

impl Cell {
    /// Construct the sheet's single meta-cell, which always lives alone at
    /// offset 0 of its own chunk.
    pub fn new_meta(sheet_name: impl Into<String>, chunk_id: ChunkId) -> Self {
        Self {
            id: crate::constants::META_CELL_ID,
            sheet_name: sheet_name.into(),
            chunk_id,
            offset: 0,
            size: crate::constants::BYTES_PER_CHUNK,
        }
    }
}
