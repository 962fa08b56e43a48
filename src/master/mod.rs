// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The master: authoritative filename/chunk/cell metadata, leader election
//! between replicas, and the round-robin data-node allocator.

pub mod allocator;
pub mod file_manager;
pub mod node;
pub mod sheet_file;

pub use allocator::Allocator;
pub use file_manager::FileManager;
pub use node::{MasterNode, JOURNAL_TOPIC};
