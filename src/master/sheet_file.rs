// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! One sheet's in-memory layout: its chunks, its cells, and a pointer to the
//! chunk new cells are appended to until it fills up.

use crate::constants::MAX_BYTES_PER_CELL;
use crate::model::{Cell, CellId, Chunk, ChunkId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chunk/cell tables for one open sheet, persisted as a unit on checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetFile {
    chunks: HashMap<ChunkId, Chunk>,
    cells: HashMap<CellId, Cell>,
    last_available_chunk: Option<ChunkId>,
}

impl SheetFile {
    /// A sheet with no chunks or cells yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cell by id.
    pub fn cell(&self, id: CellId) -> Option<Cell> {
        self.cells.get(&id).cloned()
    }

    /// Look up a chunk by id.
    pub fn chunk(&self, id: ChunkId) -> Option<Chunk> {
        self.chunks.get(&id).cloned()
    }

    /// Snapshot of every chunk currently in this sheet.
    pub fn all_chunks(&self) -> Vec<Chunk> {
        self.chunks.values().cloned().collect()
    }

    /// Insert or replace a chunk.
    pub fn insert_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.id, chunk);
    }

    /// Apply a journal-replayed chunk record's trailer fields, preserving
    /// whatever cells are already linked into this chunk (the record itself
    /// only re-asserts the one cell it was journaled alongside).
    pub fn apply_chunk_record(&mut self, id: ChunkId, version: u64, data_node_group: String, holds_meta: bool) {
        let chunk = self
            .chunks
            .entry(id)
            .or_insert_with(|| Chunk::new(id, data_node_group.clone(), holds_meta));
        chunk.version = version;
        chunk.data_node_group = data_node_group;
        chunk.holds_meta = holds_meta;
    }

    /// Remove a chunk and every cell id it listed.
    pub fn remove_chunk(&mut self, id: ChunkId) {
        if let Some(chunk) = self.chunks.remove(&id) {
            for cell_id in chunk.cells {
                self.cells.remove(&cell_id);
            }
        }
        if self.last_available_chunk == Some(id) {
            self.last_available_chunk = None;
        }
    }

    /// Insert or replace a cell, re-linking it into its chunk's cell list.
    pub fn insert_cell(&mut self, cell: Cell) {
        if let Some(chunk) = self.chunks.get_mut(&cell.chunk_id) {
            if !chunk.cells.contains(&cell.id) {
                chunk.cells.push(cell.id);
            }
        }
        self.cells.insert(cell.id, cell);
    }

    /// Remove a cell, unlinking it from its chunk's cell list.
    pub fn remove_cell(&mut self, id: CellId) {
        if let Some(cell) = self.cells.remove(&id) {
            if let Some(chunk) = self.chunks.get_mut(&cell.chunk_id) {
                chunk.cells.retain(|c| *c != id);
            }
        }
    }

    /// The chunk new cells should append to, if it still has room for
    /// `new_cell_size`.
    pub fn last_available_chunk_with_room(&self, new_cell_size: u64) -> Option<ChunkId> {
        self.last_available_chunk
            .filter(|id| {
                self.chunks
                    .get(id)
                    .map(|chunk| chunk.has_room_for(new_cell_size, MAX_BYTES_PER_CELL))
                    .unwrap_or(false)
            })
    }

    /// Record `id` as the chunk future cells should try to append to.
    pub fn set_last_available_chunk(&mut self, id: Option<ChunkId>) {
        self.last_available_chunk = id;
    }

    /// Byte offset the next cell appended to `chunk_id` would receive.
    pub fn next_offset_in(&self, chunk_id: ChunkId) -> u64 {
        self.chunks
            .get(&chunk_id)
            .map(|chunk| chunk.cells.len() as u64 * MAX_BYTES_PER_CELL)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_fill_a_chunk_then_roll_over_to_a_new_one() {
        let mut file = SheetFile::new();
        file.insert_chunk(Chunk::new(1, "group-a", false));
        file.set_last_available_chunk(Some(1));

        for i in 0..4 {
            let chunk_id = file.last_available_chunk_with_room(MAX_BYTES_PER_CELL).unwrap();
            let offset = file.next_offset_in(chunk_id);
            file.insert_cell(Cell {
                id: i,
                sheet_name: "s".into(),
                chunk_id,
                offset,
                size: MAX_BYTES_PER_CELL,
            });
        }

        assert!(file.last_available_chunk_with_room(MAX_BYTES_PER_CELL).is_none());
    }

    #[test]
    fn removing_a_chunk_drops_its_cells() {
        let mut file = SheetFile::new();
        file.insert_chunk(Chunk::new(1, "group-a", false));
        file.insert_cell(Cell {
            id: 0,
            sheet_name: "s".into(),
            chunk_id: 1,
            offset: 0,
            size: MAX_BYTES_PER_CELL,
        });
        file.remove_chunk(1);
        assert!(file.cell(0).is_none());
        assert!(file.chunk(1).is_none());
    }
}
