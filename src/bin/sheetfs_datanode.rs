// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! The `sheetfs-datanode` binary. Wires a [`sheetfs::datanode::DataNode`]
//! against the coordination and journal backends and runs it forever.
//!
//! As in `sheetfs-master`, the coordination and journal backends stand in
//! for out-of-scope external services behind the same trait boundary a
//! real connector would implement.

use sheetfs::config::DataNodeConfig;
use sheetfs::coordination::LocalCoordination;
use sheetfs::datanode::DataNode;
use sheetfs::journal::{JournalBackend, LocalJournalBackend};
use std::sync::Arc;
use structopt::StructOpt;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = DataNodeConfig::from_args();
    sheetfs::init_logging(None);

    let coordination: Arc<dyn sheetfs::coordination::Coordination> = Arc::new(LocalCoordination::new());
    let journal_backend: Arc<dyn JournalBackend> = Arc::new(LocalJournalBackend::new());

    let node = DataNode::new(config, coordination, journal_backend).await?;
    node.run().await?;
    Ok(())
}
