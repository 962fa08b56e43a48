// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Endpoint resolution and re-resolution coalescing: both the master and
//! every data-node group's current primary are looked up by reading their
//! election's ack node, and cached until a caller observes a failure.

use crate::coordination::Coordination;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

const MASTER_ACK_PATH: &str = "master_election_ack";

fn datanode_ack_path(group: &str) -> String {
    format!("datanode_election_{group}_ack")
}

/// A cached endpoint plus the generation it was resolved at, so concurrent
/// callers who all observed the same failure coalesce on one re-resolution
/// instead of each independently re-resolving.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    /// Monotonic generation counter for this endpoint.
    pub version: u64,
    /// The resolved address.
    pub addr: SocketAddr,
}

/// Caches the master's and every data-node group's current primary address.
#[derive(Debug, Default)]
pub struct Resolver {
    coordination: Option<Arc<dyn Coordination>>,
    master: RwLock<Option<Resolved>>,
    groups: DashMap<String, Resolved>,
}

impl Resolver {
    /// Build a resolver reading ack nodes from `coordination`.
    pub fn new(coordination: Arc<dyn Coordination>) -> Self {
        Self {
            coordination: Some(coordination),
            master: RwLock::new(None),
            groups: DashMap::new(),
        }
    }

    fn coordination(&self) -> Result<&Arc<dyn Coordination>> {
        self.coordination
            .as_ref()
            .ok_or_else(|| Error::Invalid("resolver has no coordination service configured".into()))
    }

    /// The master's current address, re-resolving if not cached.
    pub async fn master_addr(&self) -> Result<Resolved> {
        if let Some(resolved) = *self.master.read().await {
            return Ok(resolved);
        }
        self.resolve_master().await
    }

    /// Force re-resolution of the master's address.
    pub async fn resolve_master(&self) -> Result<Resolved> {
        let mut guard = self.master.write().await;
        if let Some(resolved) = *guard {
            return Ok(resolved);
        }
        let bytes = self
            .coordination()?
            .get(MASTER_ACK_PATH)
            .await
            .map_err(|e| Error::Coordination(e.to_string()))?;
        let addr = parse_addr(&bytes)?;
        let resolved = Resolved { version: 0, addr };
        *guard = Some(resolved);
        Ok(resolved)
    }

    /// Invalidate the cached master address if it is still at `seen_version`
    /// (a caller that observed a stale endpoint and already triggered a
    /// re-resolution should not invalidate the fresher one).
    pub async fn invalidate_master(&self, seen_version: u64) -> Result<()> {
        let mut guard = self.master.write().await;
        if matches!(*guard, Some(resolved) if resolved.version == seen_version) {
            let bytes = self
                .coordination()?
                .get(MASTER_ACK_PATH)
                .await
                .map_err(|e| Error::Coordination(e.to_string()))?;
            let addr = parse_addr(&bytes)?;
            *guard = Some(Resolved {
                version: seen_version + 1,
                addr,
            });
        }
        Ok(())
    }

    /// A data-node group's current primary address, re-resolving if not
    /// cached.
    pub async fn group_addr(&self, group: &str) -> Result<Resolved> {
        if let Some(resolved) = self.groups.get(group) {
            return Ok(*resolved);
        }
        self.resolve_group(group).await
    }

    /// Force re-resolution of `group`'s address.
    pub async fn resolve_group(&self, group: &str) -> Result<Resolved> {
        let bytes = self
            .coordination()?
            .get(&datanode_ack_path(group))
            .await
            .map_err(|e| Error::Coordination(e.to_string()))?;
        let addr = parse_addr(&bytes)?;
        let resolved = *self
            .groups
            .entry(group.to_string())
            .and_modify(|existing| {
                *existing = Resolved {
                    version: existing.version + 1,
                    addr,
                };
            })
            .or_insert(Resolved { version: 0, addr });
        Ok(resolved)
    }

    /// Invalidate a cached group address if it is still at `seen_version`.
    pub async fn invalidate_group(&self, group: &str, seen_version: u64) -> Result<()> {
        let should_refresh = matches!(self.groups.get(group), Some(resolved) if resolved.version == seen_version);
        if should_refresh {
            self.resolve_group(group).await?;
        }
        Ok(())
    }
}

fn parse_addr(bytes: &[u8]) -> Result<SocketAddr> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Invalid("ack node does not contain a valid socket address".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::LocalCoordination;

    #[tokio::test]
    async fn resolves_and_caches_master_then_refreshes_on_invalidate() {
        let coordination: Arc<dyn Coordination> = Arc::new(LocalCoordination::new());
        coordination.ensure_node(MASTER_ACK_PATH).await.unwrap();
        coordination
            .set(MASTER_ACK_PATH, b"127.0.0.1:7000".to_vec())
            .await
            .unwrap();

        let resolver = Resolver::new(coordination.clone());
        let first = resolver.master_addr().await.unwrap();
        assert_eq!(first.addr.to_string(), "127.0.0.1:7000");

        coordination
            .set(MASTER_ACK_PATH, b"127.0.0.1:7001".to_vec())
            .await
            .unwrap();
        // cached value is stale until invalidated
        assert_eq!(resolver.master_addr().await.unwrap().addr.to_string(), "127.0.0.1:7000");

        resolver.invalidate_master(first.version).await.unwrap();
        assert_eq!(resolver.master_addr().await.unwrap().addr.to_string(), "127.0.0.1:7001");
    }
}
