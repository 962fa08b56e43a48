// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The client library: sheet lifecycle operations and cell/whole-sheet I/O,
//! resolving the master and data-node group primaries on demand and
//! retrying across primary failover.

pub mod client;
pub mod file;
pub mod resolver;

pub use client::Client;
pub use file::{OpenFile, ReadResult, SheetBytes};
