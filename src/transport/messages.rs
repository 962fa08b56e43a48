// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Wire request/response payloads for the master and data-node RPC
//! surfaces, carried over the transport in [`super`].

use crate::model::{Cell, Chunk, Fd, Sheet, Status};
use serde::{Deserialize, Serialize};

/// A request addressed to the master's current primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterRequest {
    /// Register a data-node group address with the allocator.
    RegisterDataNode {
        /// Group name.
        group: String,
        /// Address clients should resolve for this group's primary (via the
        /// group's own election ack node — this is the ack-node path, not a
        /// raw socket address).
        ack_path: String,
    },
    /// Create a new sheet.
    CreateSheet {
        /// Sheet filename.
        filename: String,
    },
    /// Open an existing, non-recycled sheet.
    OpenSheet {
        /// Sheet filename.
        filename: String,
    },
    /// Permanently delete a sheet.
    DeleteSheet {
        /// Sheet filename.
        filename: String,
    },
    /// Mark a sheet recycled.
    RecycleSheet {
        /// Sheet filename.
        filename: String,
    },
    /// Clear a sheet's recycled flag.
    ResumeSheet {
        /// Sheet filename.
        filename: String,
    },
    /// List every sheet, recycled or not.
    ListSheets,
    /// Fetch every chunk of the sheet behind `fd`.
    ReadSheet {
        /// Open file handle.
        fd: Fd,
    },
    /// Resolve a cell to its storage location.
    ReadCell {
        /// Open file handle.
        fd: Fd,
        /// Row.
        row: u32,
        /// Column.
        col: u32,
    },
    /// Resolve (allocating if necessary) a cell to its storage location,
    /// bumping its chunk's version.
    WriteCell {
        /// Open file handle.
        fd: Fd,
        /// Row.
        row: u32,
        /// Column.
        col: u32,
    },
}

/// The master's reply to a [`MasterRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterResponse {
    /// Wire-level status of the call.
    pub status: Status,
    /// Body matching the request kind; `None`/empty on non-`Ok` status.
    pub body: MasterResponseBody,
}

/// Per-request-kind response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterResponseBody {
    /// No payload beyond the status.
    None,
    /// `CreateSheet`/`OpenSheet` success.
    Fd(Fd),
    /// `ListSheets` success.
    Sheets(Vec<Sheet>),
    /// `ReadSheet` success.
    Chunks(Vec<Chunk>),
    /// `ReadCell`/`WriteCell` success.
    CellChunk(Cell, Chunk),
}

/// A request addressed to a data-node group's current primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataNodeRequest {
    /// Read `size` bytes at `offset` from chunk `id`, valid as of `version`.
    ReadChunk {
        /// Chunk id.
        id: u64,
        /// Byte offset.
        offset: u64,
        /// Number of bytes to read.
        size: u64,
        /// Version the caller expects to be visible.
        version: u64,
    },
    /// Write `data` at `offset` in chunk `id`, claiming `version`.
    WriteChunk {
        /// Chunk id.
        id: u64,
        /// Byte offset to write `data` at.
        offset: u64,
        /// Size the write should be padded to before being committed.
        target_size: u64,
        /// Padding byte used to fill `data` up to `target_size`.
        padding: u8,
        /// Version this write claims to establish.
        version: u64,
        /// Payload (not yet padded).
        data: Vec<u8>,
    },
    /// Remove chunk `id`.
    DeleteChunk {
        /// Chunk id.
        id: u64,
    },
}

/// A data node's reply to a [`DataNodeRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNodeResponse {
    /// Wire-level status of the call.
    pub status: Status,
    /// Bytes returned by `ReadChunk`; empty for `WriteChunk`/`DeleteChunk`.
    pub data: Vec<u8>,
}
