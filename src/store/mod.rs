//! Storage adapter the index hydrates headers through, plus concrete stores.
//!
//! The index only ever reads from a store. Writing validated headers is the job of the
//! block-processing pipeline that owns the store.
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::{block::Header, BlockHash, Work};

/// Read access to persisted, already-validated headers.
///
/// `Ok(None)` means "unknown header". Any `Err` is a store failure and is propagated by
/// the index as [`Error::Storage`](crate::Error::Storage).
#[async_trait]
pub trait HeaderStore: Send + Sync {
    /// The validated header for `hash` and the time it was first accepted.
    async fn fetch_validated_header(&self, hash: BlockHash)
        -> anyhow::Result<Option<(Header, u64)>>;

    /// Height of `hash` in its chain.
    async fn height_for(&self, hash: BlockHash) -> anyhow::Result<Option<u32>>;

    /// Total work from genesis through `hash`, inclusive.
    async fn cumulative_work_through(&self, hash: BlockHash) -> anyhow::Result<Option<Work>>;

    /// Work contributed by a single header. A pure function of its `bits`.
    fn work_of(&self, header: &Header) -> Work {
        header.work()
    }
}

#[async_trait]
impl<T: HeaderStore + ?Sized> HeaderStore for Arc<T> {
    async fn fetch_validated_header(
        &self,
        hash: BlockHash,
    ) -> anyhow::Result<Option<(Header, u64)>> {
        (**self).fetch_validated_header(hash).await
    }

    async fn height_for(&self, hash: BlockHash) -> anyhow::Result<Option<u32>> {
        (**self).height_for(hash).await
    }

    async fn cumulative_work_through(&self, hash: BlockHash) -> anyhow::Result<Option<Work>> {
        (**self).cumulative_work_through(hash).await
    }

    fn work_of(&self, header: &Header) -> Work {
        (**self).work_of(header)
    }
}

/// Placeholder store for an index without a backing store. Knows no headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

#[async_trait]
impl HeaderStore for NoStore {
    async fn fetch_validated_header(
        &self,
        _hash: BlockHash,
    ) -> anyhow::Result<Option<(Header, u64)>> {
        Ok(None)
    }

    async fn height_for(&self, _hash: BlockHash) -> anyhow::Result<Option<u32>> {
        Ok(None)
    }

    async fn cumulative_work_through(&self, _hash: BlockHash) -> anyhow::Result<Option<Work>> {
        Ok(None)
    }
}

// submodules / concrete stores live here
pub mod memory;
pub use memory::MemoryHeaderStore;

#[cfg(feature = "store-sqlite")]
pub mod sqlite_store;
#[cfg(feature = "store-sqlite")]
pub use sqlite_store::SqliteHeaderStore;
