// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Round-robin data-node-group allocator: a freshly registered group is
//! selected next (warm-up bias), then rotates through the pool like every
//! other group.

use crate::error::{Error, Result};
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<String>,
    known: HashSet<String>,
}

/// Thread-safe pool of data-node group addresses.
#[derive(Debug, Default)]
pub struct Allocator {
    state: Mutex<State>,
}

impl Allocator {
    /// An empty allocator; every `allocate` fails until a group registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `group`, idempotent for an address already known. A newly
    /// registered group is placed at the front of the rotation.
    pub async fn register_group(&self, group: String) {
        let mut state = self.state.lock().await;
        if state.known.insert(group.clone()) {
            state.queue.push_front(group);
        }
    }

    /// Pick the next group in rotation.
    pub async fn allocate(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        let group = state.queue.pop_front().ok_or(Error::NoDataNode)?;
        state.queue.push_back(group.clone());
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rotates_through_registered_groups() {
        let allocator = Allocator::new();
        allocator.register_group("a".into()).await;
        allocator.register_group("b".into()).await;
        assert_eq!(allocator.allocate().await.unwrap(), "a");
        assert_eq!(allocator.allocate().await.unwrap(), "b");
        assert_eq!(allocator.allocate().await.unwrap(), "a");
    }

    #[tokio::test]
    async fn newly_registered_group_is_selected_next() {
        let allocator = Allocator::new();
        allocator.register_group("a".into()).await;
        allocator.allocate().await.unwrap();
        allocator.register_group("b".into()).await;
        assert_eq!(allocator.allocate().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn registering_the_same_group_twice_is_idempotent() {
        let allocator = Allocator::new();
        allocator.register_group("a".into()).await;
        allocator.register_group("a".into()).await;
        assert_eq!(allocator.allocate().await.unwrap(), "a");
        assert_eq!(allocator.allocate().await.unwrap(), "a");
    }

    #[tokio::test]
    async fn empty_allocator_fails_with_no_data_node() {
        let allocator = Allocator::new();
        assert!(matches!(allocator.allocate().await, Err(Error::NoDataNode)));
    }
}
