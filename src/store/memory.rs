//! In-memory header store. Handy for tests and for nodes that keep the whole chain
//! in memory anyway.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use bitcoin::{block::Header, hashes::Hash, BlockHash, Work};

use crate::store::HeaderStore;

#[derive(Debug, Clone, Copy)]
struct StoredHeader {
    header: Header,
    height: Option<u32>,
    chain_work: Work,
    first_seen: u64,
}

/// Cloneable handle to a shared in-memory map of validated headers.
#[derive(Debug, Clone, Default)]
pub struct MemoryHeaderStore {
    headers: Arc<Mutex<HashMap<BlockHash, StoredHeader>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryHeaderStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn headers(&self) -> anyhow::Result<MutexGuard<'_, HashMap<BlockHash, StoredHeader>>> {
        self.headers
            .lock()
            .map_err(|_| anyhow!("memory header store lock poisoned"))
    }

    /// Store a header with explicit metadata, replacing any previous entry.
    pub fn put(
        &self,
        header: Header,
        height: Option<u32>,
        chain_work: Work,
        first_seen: u64,
    ) -> anyhow::Result<BlockHash> {
        let hash = header.block_hash();
        self.headers()?.insert(
            hash,
            StoredHeader {
                header,
                height,
                chain_work,
                first_seen,
            },
        );
        Ok(hash)
    }

    /// Store a header on top of an already stored parent, deriving height and chain work
    /// from it. Genesis (all-zero parent) starts at height 0.
    pub fn append(&self, header: Header, first_seen: u64) -> anyhow::Result<BlockHash> {
        let (height, chain_work) = if header.prev_blockhash == BlockHash::all_zeros() {
            (Some(0), header.work())
        } else {
            let headers = self.headers()?;
            let Some(parent) = headers.get(&header.prev_blockhash) else {
                bail!("parent {} is not stored", header.prev_blockhash);
            };
            (
                parent.height.and_then(|h| h.checked_add(1)),
                parent.chain_work + header.work(),
            )
        };
        self.put(header, height, chain_work, first_seen)
    }

    /// Drop a header from the store.
    pub fn forget(&self, hash: &BlockHash) -> anyhow::Result<bool> {
        Ok(self.headers()?.remove(hash).is_some())
    }

    /// Number of stored headers.
    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.headers()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.headers()?.is_empty())
    }

    /// How many times `fetch_validated_header` has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl HeaderStore for MemoryHeaderStore {
    async fn fetch_validated_header(
        &self,
        hash: BlockHash,
    ) -> anyhow::Result<Option<(Header, u64)>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .headers()?
            .get(&hash)
            .map(|stored| (stored.header, stored.first_seen)))
    }

    async fn height_for(&self, hash: BlockHash) -> anyhow::Result<Option<u32>> {
        Ok(self.headers()?.get(&hash).and_then(|stored| stored.height))
    }

    async fn cumulative_work_through(&self, hash: BlockHash) -> anyhow::Result<Option<Work>> {
        Ok(self.headers()?.get(&hash).map(|stored| stored.chain_work))
    }
}
