// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The `sheetfs-master` binary. Wires a [`sheetfs::master::MasterNode`]
//! against the coordination and journal backends and runs it forever.
//!
//! The coordination and journal backends are out-of-scope external
//! services (a ZooKeeper-family system and a Kafka-family system
//! respectively); this binary wires the in-memory doubles behind the same
//! trait boundary a real connector would implement. Swapping in a genuine
//! connector is a matter of constructing a different
//! `Arc<dyn Coordination>` / `Arc<dyn JournalBackend>` here.

use sheetfs::config::MasterConfig;
use sheetfs::coordination::LocalCoordination;
use sheetfs::journal::{JournalBackend, LocalJournalBackend, Writer};
use sheetfs::master::{Allocator, FileManager, MasterNode, JOURNAL_TOPIC};
use std::sync::Arc;
use structopt::StructOpt;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = MasterConfig::from_args();
    sheetfs::init_logging(None);

    let coordination: Arc<dyn sheetfs::coordination::Coordination> = Arc::new(LocalCoordination::new());
    let journal_backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());
    let allocator = Arc::new(Allocator::new());
    let writer = Arc::new(Writer::new(journal_backend.clone(), JOURNAL_TOPIC).await?);

    let file_manager = Arc::new(FileManager::open(&config.data_dir, allocator, writer).await?);
    let node = MasterNode::new(config, coordination, journal_backend, file_manager);

    node.run().await?;
    Ok(())
}
