// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Fixed layout constants shared by every component.

use std::time::Duration;

/// Capacity, in bytes, of a single chunk's cell-data region.
pub const BYTES_PER_CHUNK: u64 = 8192;

/// Maximum number of ordinary cells a single chunk may hold.
pub const MAX_CELLS_PER_CHUNK: usize = 4;

/// Size, in bytes, of one ordinary cell's storage slot.
pub const MAX_BYTES_PER_CELL: u64 = 2048;

/// Offset, within a chunk file, of the version trailer.
pub const VERSION_LOCATION: u64 = BYTES_PER_CHUNK << 2;

/// Total on-disk size of a chunk file: cell-data region plus the 8-byte
/// version trailer.
pub const FILE_SIZE: u64 = (BYTES_PER_CHUNK << 2) + 8;

/// Row/column used for the sentinel meta-cell.
pub const META_CELL_COORD: u32 = u32::MAX;

/// `cell-id` of the meta-cell, distinct from every derivable `(row << 32) |
/// col` value since row and col are both `u32`.
pub const META_CELL_ID: i64 = -1;

/// Number of times a primary retries a journal commit before giving up and
/// replying `Unavailable`.
pub const ACK_MOST_TIMES: u32 = 5;

/// Default interval between master/data-node checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Default coordination-service session/election timeout.
pub const DEFAULT_ELECTION_TIMEOUT: Duration = Duration::from_secs(1);

/// Default retention period for a recycled sheet before the monitor
/// permanently deletes it.
pub const DEFAULT_RECYCLE_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of client-side retries across primary re-resolution.
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Padding byte used to fill a chunk write up to its target size when the
/// caller does not specify one.
pub const DEFAULT_PADDING: u8 = b' ';

/// Derive the `cell-id` for a normal (row, col) pair.
///
/// Panics never: the only collision-free packing of two `u32`s into an
/// `i64` keyspace distinct from [`META_CELL_ID`] is the obvious shift-or.
pub fn cell_id(row: u32, col: u32) -> i64 {
    if row == META_CELL_COORD && col == META_CELL_COORD {
        return META_CELL_ID;
    }
    (((row as i64) << 32) | (col as i64)) as i64
}

/// `true` iff `(row, col)` addresses the meta-cell.
pub fn is_meta_cell(row: u32, col: u32) -> bool {
    row == META_CELL_COORD && col == META_CELL_COORD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_cell_id_never_collides_with_a_derivable_id() {
        assert_eq!(cell_id(META_CELL_COORD, META_CELL_COORD), META_CELL_ID);
        assert_ne!(cell_id(0, 0), META_CELL_ID);
        assert_ne!(cell_id(u32::MAX, 0), META_CELL_ID);
        assert_ne!(cell_id(0, u32::MAX), META_CELL_ID);
    }

    #[test]
    fn cell_id_is_injective_for_small_coordinates() {
        let mut seen = std::collections::HashSet::new();
        for row in 0..8u32 {
            for col in 0..8u32 {
                assert!(seen.insert(cell_id(row, col)));
            }
        }
    }
}
