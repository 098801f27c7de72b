//! Shareable snapshots of single content blocks.

use chrono::Utc;
use rhesus_common::{new_id, ContentBlock, Snapshot};
use tracing::info;

use crate::error::Result;
use crate::keys::snapshot_key;
use crate::store::Store;

#[derive(Clone)]
pub struct SnapshotRepository {
    store: Store,
}

impl SnapshotRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Freeze a copy of `block`; the copy's id is derived from the snapshot id.
    pub async fn create(&self, block: &ContentBlock) -> Result<Snapshot> {
        let id = new_id("snap");
        let snapshot = Snapshot {
            content_block: ContentBlock { id: format!("cb-{}", id), ..block.clone() },
            id,
            created_at: Utc::now(),
        };
        self.store.put_json(&snapshot_key(&snapshot.id), &snapshot).await?;
        info!(snapshot_id = %snapshot.id, block_type = %snapshot.content_block.content_type, "Snapshot created");
        Ok(snapshot)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Snapshot>> {
        self.store.get_json(&snapshot_key(id)).await
    }
}
