// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Wires a master process's election, journal and file manager together and
//! drives its primary/secondary lifecycle, checkpoint timer, and recycle
//! garbage-collection monitor.

use super::file_manager::FileManager;
use crate::config::MasterConfig;
use crate::coordination::election::{Elector, LeaderState};
use crate::coordination::Coordination;
use crate::error::Result;
use crate::journal::entry::MasterJournalEntry;
use crate::journal::{JournalBackend, Receiver, TryFetchError, CHECKPOINT_KEY};
use crate::transport::RpcServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Name of the journal topic the master's metadata log is written to.
pub const JOURNAL_TOPIC: &str = "master_journal";
const TOPIC: &str = JOURNAL_TOPIC;
const ELECTION_ROOT: &str = "master_election";

/// Live-replay one predecessor's journal entries while following it, until
/// either the predecessor dies (caller cancels `cancel`) or the subscription
/// itself errors. A decode or apply failure is fatal: the secondary has
/// diverged and must not keep serving from a possibly-incomplete replica.
async fn follow_replay(file_manager: &FileManager, receiver: &mut Receiver, cancel: &CancellationToken) -> Result<()> {
    loop {
        match receiver.fetch_entry(cancel).await {
            Ok(message) if message.key == CHECKPOINT_KEY => {}
            Ok(message) => {
                let entry = MasterJournalEntry::decode(&message.bytes)?;
                file_manager.apply_entry(&entry).await?;
            }
            Err(_) => return Ok(()),
        }
    }
}

/// One master process. Its role is decided by `run`, not by configuration.
pub struct MasterNode {
    config: MasterConfig,
    coordination: Arc<dyn Coordination>,
    journal_backend: Arc<dyn JournalBackend>,
    file_manager: Arc<FileManager>,
}

impl MasterNode {
    /// Build a master node; `file_manager` should already be open against
    /// `config.data_dir`.
    pub fn new(
        config: MasterConfig,
        coordination: Arc<dyn Coordination>,
        journal_backend: Arc<dyn JournalBackend>,
        file_manager: Arc<FileManager>,
    ) -> Self {
        Self {
            config,
            coordination,
            journal_backend,
            file_manager,
        }
    }

    /// Run forever: contest leadership, replay as a secondary while losing,
    /// and once elected, catch up, bind the RPC listener, ack, and start the
    /// checkpoint and recycle-monitor background tasks.
    pub async fn run(&self) -> Result<()> {
        let elector = Arc::new(Elector::new(self.coordination.clone(), ELECTION_ROOT));
        elector.ensure().await?;
        elector.create_proposal().await?;

        let mut receiver = self.run_as_secondary(&elector).await?;

        if let Some(offset) = self.file_manager.recorded_checkpoint_offset()? {
            receiver.set_offset(offset).await?;
        }
        loop {
            match receiver.try_fetch_entry().await {
                Ok(message) => {
                    if message.key == CHECKPOINT_KEY {
                        continue;
                    }
                    let entry = MasterJournalEntry::decode(&message.bytes)?;
                    self.file_manager.apply_entry(&entry).await?;
                }
                Err(TryFetchError::Drained) => break,
                Err(TryFetchError::Backend(e)) => return Err(e),
            }
        }

        let local_addr: SocketAddr = format!("0.0.0.0:{}", self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::Invalid(format!("invalid port: {e}")))?;
        let (rpc_server, _public_addr) = RpcServer::bind(local_addr, self.file_manager.clone()).await?;

        self.file_manager.mark_primary();
        elector.ack_leader(self.config.advertise_addr.as_bytes()).await?;
        info!(addr = %self.config.advertise_addr, "master primary serving");

        tokio::select! {
            _ = self.run_checkpoint_timer() => {}
            _ = self.run_recycle_monitor() => {}
        }
        rpc_server.close();
        Ok(())
    }

    async fn run_as_secondary(&self, elector: &Elector) -> Result<Receiver> {
        let mut receiver = Receiver::new(self.journal_backend.clone(), TOPIC).await?;

        loop {
            match elector.try_be_leader().await? {
                LeaderState::Leader => return Ok(receiver),
                LeaderState::Follower { predecessor, death } => {
                    debug!(%predecessor, "following predecessor");
                    let cancel = CancellationToken::new();
                    let replay = follow_replay(&self.file_manager, &mut receiver, &cancel);
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

    async fn run_checkpoint_timer(&self) {
        let mut interval = tokio::time::interval(self.config.checkpoint_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.file_manager.checkpoint().await {
                error!("checkpoint failed: {e}");
            }
        }
    }

    async fn run_recycle_monitor(&self) {
        let retention = self.config.recycle_retention;
        loop {
            tokio::time::sleep(Duration::from_secs(60).min(retention)).await;
            let now_ns = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0);
            let cutoff_ns = now_ns.saturating_sub(retention.as_nanos() as i64);
            for filename in self.file_manager.sheets_recycled_before(cutoff_ns).await {
                if let Err(e) = self.file_manager.delete_sheet(filename.clone()).await {
                    error!(%filename, "recycle monitor failed to delete sheet: {e}");
                }
            }
        }
    }
}
