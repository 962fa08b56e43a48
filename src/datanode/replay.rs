// Copyright 2026 SheetFS Contributors.
//
// This SheetFS Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SheetFS Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SheetFS Software.

//! Secondary-side journal reconciliation: applying a decoded
//! [`DataNodeEntry`] to the local [`ChunkStore`] idempotently, so a replayed
//! entry that was already applied (e.g. after a reconnect) is a no-op.

use super::store::ChunkStore;
use crate::error::Result;
use crate::journal::entry::DataNodeEntry;

/// Apply one journal entry to `store`. Safe to call more than once with the
/// same entry.
pub async fn apply_entry(store: &ChunkStore, entry: DataNodeEntry) -> Result<()> {
    match entry {
        DataNodeEntry::Write {
            version,
            chunk_id,
            offset,
            size,
            crc32,
            data,
        } => {
            if !store.exists(chunk_id).await {
                store.create_with_write(chunk_id, offset, &data, version).await
            } else {
                let current_version = store.read_version(chunk_id).await?;
                let current_crc = store.crc32_of_range(chunk_id, offset, size).await.unwrap_or(0);
                if current_version == version && current_crc == crc32 {
                    return Ok(());
                }
                store.write_range_and_set_version(chunk_id, offset, &data, version).await
            }
        }
        DataNodeEntry::Delete { chunk_id } => store.delete(chunk_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaying_a_write_twice_is_a_no_op_the_second_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        let entry = DataNodeEntry::new_write(1, 7, 0, vec![1, 2, 3]);
        apply_entry(&store, entry.clone()).await.unwrap();
        apply_entry(&store, entry).await.unwrap();
        assert_eq!(store.read_version(7).await.unwrap(), 1);
        assert_eq!(store.read_range(7, 0, 3).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn replaying_a_delete_on_an_already_missing_chunk_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        apply_entry(&store, DataNodeEntry::Delete { chunk_id: 1 }).await.unwrap();
    }

    #[tokio::test]
    async fn later_version_overwrites_the_stale_replica() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        apply_entry(&store, DataNodeEntry::new_write(1, 1, 0, vec![1])).await.unwrap();
        apply_entry(&store, DataNodeEntry::new_write(2, 1, 0, vec![2])).await.unwrap();
        assert_eq!(store.read_version(1).await.unwrap(), 2);
        assert_eq!(store.read_range(1, 0, 1).await.unwrap(), vec![2]);
    }
}
