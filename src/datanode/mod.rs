// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! A data node: on-disk chunk storage, journal-backed write durability,
//! leader election between a group's replicas, and the RPC surface primaries
//! expose to clients and the master.

pub mod node;
pub mod replay;
pub mod server;
pub mod store;

pub use node::DataNode;
pub use server::DataNodeServer;
pub use store::ChunkStore;
