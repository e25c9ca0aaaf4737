//! A [`HeaderIndex`] behind one async mutex, for a node where a query task and the
//! block-processing task use the index at the same time.
use std::sync::Arc;

use bitcoin::{block::Header, BlockHash, Work};
use tokio::sync::{Mutex, MutexGuard};

use crate::{error::Result, index::HeaderIndex, record::HeaderRecord, store::HeaderStore};

/// Cloneable handle to a lock-protected [`HeaderIndex`].
///
/// Every entry point takes the same lock, including the read path of `lookup`:
/// checking residency and hydrating happen in one critical section, so two tasks can
/// never hydrate the same hash into two records. Records are returned as owned clones.
#[derive(Debug)]
pub struct SharedHeaderIndex<S> {
    inner: Arc<Mutex<HeaderIndex<S>>>,
}

impl<S> Clone for SharedHeaderIndex<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: HeaderStore> SharedHeaderIndex<S> {
    /// Wrap an index.
    pub fn new(index: HeaderIndex<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(index)),
        }
    }

    /// Hold the lock for a batch of operations.
    pub async fn lock(&self) -> MutexGuard<'_, HeaderIndex<S>> {
        self.inner.lock().await
    }

    /// See [`HeaderIndex::lookup`].
    pub async fn lookup(&self, hash: &BlockHash) -> Result<Option<HeaderRecord>> {
        Ok(self.inner.lock().await.lookup(hash).await?.cloned())
    }

    /// See [`HeaderIndex::contains`].
    pub async fn contains(&self, hash: &BlockHash) -> bool {
        self.inner.lock().await.contains(hash)
    }

    /// See [`HeaderIndex::insert`].
    pub async fn insert(
        &self,
        header: &Header,
        height: Option<u32>,
        parent_cumulative_work: Work,
        first_seen: u64,
    ) -> bool {
        self.inner
            .lock()
            .await
            .insert(header, height, parent_cumulative_work, first_seen)
    }

    /// See [`HeaderIndex::extend`].
    pub async fn extend(&self, header: &Header, first_seen: u64) -> Result<bool> {
        self.inner.lock().await.extend(header, first_seen).await
    }

    /// See [`HeaderIndex::remove`].
    pub async fn remove(&self, hash: &BlockHash) -> Option<HeaderRecord> {
        self.inner.lock().await.remove(hash)
    }

    /// See [`HeaderIndex::best_tip`].
    pub async fn best_tip(&self) -> Option<BlockHash> {
        self.inner.lock().await.best_tip()
    }

    /// See [`HeaderIndex::parent`].
    pub async fn parent(&self, hash: &BlockHash) -> Result<Option<HeaderRecord>> {
        Ok(self.inner.lock().await.parent(hash).await?.cloned())
    }

    /// See [`HeaderIndex::ancestor`].
    pub async fn ancestor(&self, hash: &BlockHash, depth: u32) -> Result<Option<BlockHash>> {
        self.inner.lock().await.ancestor(hash, depth).await
    }

    /// See [`HeaderIndex::find_fork`].
    pub async fn find_fork(&self, a: &BlockHash, b: &BlockHash) -> Result<Option<BlockHash>> {
        self.inner.lock().await.find_fork(a, b).await
    }

    /// Number of resident records.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no record is resident.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
