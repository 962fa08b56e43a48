// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Wires a data node's election, journal and storage together and drives
//! its primary/secondary lifecycle.

use super::replay::apply_entry;
use super::server::DataNodeServer;
use super::store::ChunkStore;
use crate::client::Client;
use crate::config::{ClientConfig, DataNodeConfig};
use crate::coordination::election::{Elector, LeaderState};
use crate::coordination::Coordination;
use crate::error::Result;
use crate::journal::entry::DataNodeEntry;
use crate::journal::{JournalBackend, Receiver, TryFetchError, Writer};
use crate::transport::RpcServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Live-replay one predecessor's journal entries while following it, until
/// either the predecessor dies (caller cancels `cancel`) or the subscription
/// itself errors. A decode or apply failure is fatal: the secondary has
/// diverged and must not keep serving from a possibly-incomplete replica.
async fn follow_replay(store: &ChunkStore, receiver: &mut Receiver, cancel: &CancellationToken) -> Result<()> {
    loop {
        match receiver.fetch_entry(cancel).await {
            Ok(message) => {
                let entry = DataNodeEntry::decode(&message.bytes)?;
                apply_entry(store, entry).await?;
            }
            Err(_) => return Ok(()),
        }
    }
}

/// One data-node process. Its role (primary or secondary) is decided by
/// `run`, not by configuration.
pub struct DataNode {
    config: DataNodeConfig,
    coordination: Arc<dyn Coordination>,
    journal_backend: Arc<dyn JournalBackend>,
    store: ChunkStore,
}

impl DataNode {
    /// Build a data node over its backing services. Does not start serving;
    /// call [`DataNode::run`] for that.
    pub async fn new(
        config: DataNodeConfig,
        coordination: Arc<dyn Coordination>,
        journal_backend: Arc<dyn JournalBackend>,
    ) -> Result<Self> {
        let store = ChunkStore::new(&config.data_dir).await?;
        Ok(Self {
            config,
            coordination,
            journal_backend,
            store,
        })
    }

    fn election_root(&self) -> String {
        format!("datanode_election_{}", self.config.group_name)
    }

    fn topic(&self) -> String {
        format!("datanode_journal_{}", self.config.group_name)
    }

    /// Tell the master this group's allocator entry is live, so `WriteCell`
    /// can hand out chunks on it. Uses the same ack-node naming convention
    /// [`crate::client::resolver::Resolver`] derives on its own, so the path
    /// this call carries and the path the client later looks up always
    /// agree.
    async fn announce_to_master(&self) -> Result<()> {
        let client = Client::new(self.coordination.clone(), ClientConfig::default())?;
        client
            .register_data_node(self.config.group_name.clone(), format!("{}_ack", self.election_root()))
            .await
    }

    /// Run forever: contest leadership, replay as a secondary while losing,
    /// and once elected, catch up, bind the RPC listener, ack, and serve.
    pub async fn run(&self) -> Result<()> {
        let elector = Arc::new(Elector::new(self.coordination.clone(), self.election_root()));
        elector.ensure().await?;
        elector.create_proposal().await?;

        let mut receiver = self.run_as_secondary(&elector).await?;

        info!(node_id = %self.config.node_id, group = %self.config.group_name, "elected primary");

        loop {
            match receiver.try_fetch_entry().await {
                Ok(message) => {
                    let entry = DataNodeEntry::decode(&message.bytes)?;
                    apply_entry(&self.store, entry).await?;
                }
                Err(TryFetchError::Drained) => break,
                Err(TryFetchError::Backend(e)) => return Err(e),
            }
        }

        let writer = Arc::new(Writer::new(self.journal_backend.clone(), self.topic()).await?);
        let server = Arc::new(DataNodeServer::new(self.store.clone(), writer));

        let local_addr: SocketAddr = format!("0.0.0.0:{}", self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::Invalid(format!("invalid port: {e}")))?;
        let (rpc_server, _public_addr) = RpcServer::bind(local_addr, server).await?;

        elector.ack_leader(self.config.advertise_addr.as_bytes()).await?;
        info!(addr = %self.config.advertise_addr, "data node primary serving");

        if let Err(e) = self.announce_to_master().await {
            error!("failed to register data-node group with the master: {e}");
        }

        std::future::pending::<()>().await;
        rpc_server.close();
        Ok(())
    }

    /// Contest leadership, replaying the journal live while following a
    /// predecessor, until this node's proposal becomes the smallest. Returns
    /// the receiver positioned right after the last entry this loop saw, so
    /// the caller can finish draining any remaining backlog non-blockingly.
    async fn run_as_secondary(&self, elector: &Elector) -> Result<Receiver> {
        let mut receiver = Receiver::new(self.journal_backend.clone(), &self.topic()).await?;

        loop {
            match elector.try_be_leader().await? {
                LeaderState::Leader => return Ok(receiver),
                LeaderState::Follower { predecessor, death } => {
                    debug!(%predecessor, "following predecessor");
                    let cancel = CancellationToken::new();
                    let replay = follow_replay(&self.store, &mut receiver, &cancel);
                    tokio::pin!(replay);
                    tokio::select! {
                        _ = death => {
                            cancel.cancel();
                            (&mut replay).await?;
                        }
                        res = &mut replay => res?,
                    }
                }
            }
        }
    }
}
