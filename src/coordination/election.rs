// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Single-primary leader election on top of [`super::Coordination`]:
//! ephemeral-sequential proposals, lexicographic ordering, and
//! watch-the-predecessor wakeups.

use super::Coordination;
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Outcome of [`Elector::try_be_leader`].
#[derive(Debug)]
pub enum LeaderState {
    /// This proposal is currently the smallest: we are primary.
    Leader,
    /// Another proposal is smaller; `predecessor` names the immediate
    /// predecessor we must wait on, and `death` fires once it disappears.
    Follower {
        /// Base name of the immediate lexicographic predecessor.
        predecessor: String,
        /// Fires once the predecessor's ephemeral node is gone.
        death: oneshot::Receiver<()>,
    },
}

/// One participant in a single leader election.
#[derive(Debug)]
pub struct Elector {
    coordination: Arc<dyn Coordination>,
    root: String,
    ack_path: String,
    proposal: Mutex<Option<String>>,
}

impl Elector {
    /// Create an elector over `root` (the election's ephemeral-sequential
    /// parent node) with its ack node at `"{root}_ack"`.
    pub fn new(coordination: Arc<dyn Coordination>, root: impl Into<String>) -> Self {
        let root = root.into();
        let ack_path = format!("{root}_ack");
        Self {
            coordination,
            root,
            ack_path,
            proposal: Mutex::new(None),
        }
    }

    /// Ensure the election's root and ack nodes exist. Idempotent; safe to
    /// call from every participant on startup.
    pub async fn ensure(&self) -> Result<()> {
        self.coordination.ensure_node(&self.root).await?;
        self.coordination.ensure_node(&self.ack_path).await?;
        Ok(())
    }

    /// Create this participant's proposal. Must be called exactly once per
    /// process lifetime, before the first [`Elector::try_be_leader`].
    pub async fn create_proposal(&self) -> Result<String> {
        let mut guard = self.proposal.lock().await;
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }
        let proposal = self
            .coordination
            .create_sequential_ephemeral(&self.root)
            .await?;
        *guard = Some(proposal.clone());
        Ok(proposal)
    }

    /// Check leadership: the smallest proposal among current children wins.
    /// A follower must await the returned `death` signal and call this again
    /// — no polling.
    pub async fn try_be_leader(&self) -> Result<LeaderState> {
        let proposal = self
            .proposal
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::Invalid("create_proposal must be called before try_be_leader".into()))?;

        let mut children = self.coordination.children(&self.root).await?;
        children.sort();

        let predecessor = children
            .iter()
            .rev()
            .find(|candidate| candidate.as_str() < proposal.as_str())
            .cloned();

        match predecessor {
            None => Ok(LeaderState::Leader),
            Some(predecessor) => {
                let watch_path = format!("{}/{}", self.root, predecessor);
                let death = self.coordination.watch(&watch_path).await?;
                Ok(LeaderState::Follower { predecessor, death })
            }
        }
    }

    /// Publish this participant's contact info as the current primary. Must
    /// only be called once the node has fully prepared to serve (journal
    /// caught up, RPC listener bound) — never by a secondary.
    pub async fn ack_leader(&self, contact_info: &[u8]) -> Result<()> {
        self.coordination.set(&self.ack_path, contact_info.to_vec()).await
    }

    /// Read the currently acked primary's contact info.
    pub async fn read_ack(&self) -> Result<Vec<u8>> {
        self.coordination.get(&self.ack_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::LocalCoordination;

    #[tokio::test]
    async fn smallest_proposal_is_leader_others_wait_on_predecessor() {
        let coord: Arc<dyn Coordination> = Arc::new(LocalCoordination::new());
        let a = Elector::new(coord.clone(), "root");
        let b = Elector::new(coord.clone(), "root");
        a.ensure().await.unwrap();
        b.ensure().await.unwrap();

        a.create_proposal().await.unwrap();
        b.create_proposal().await.unwrap();

        assert!(matches!(a.try_be_leader().await.unwrap(), LeaderState::Leader));
        match b.try_be_leader().await.unwrap() {
            LeaderState::Follower { death, .. } => {
                a.ack_leader(b"primary-a").await.unwrap();
                coord
                    .delete(&format!("root/{}", a.proposal.lock().await.clone().unwrap()))
                    .await
                    .unwrap();
                death.await.unwrap();
                assert!(matches!(b.try_be_leader().await.unwrap(), LeaderState::Leader));
            }
            LeaderState::Leader => panic!("b should not be leader yet"),
        }
    }
}
