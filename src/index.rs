//! In-memory header map, the analog of bitcoind's `mapBlockIndex`.
//!
//! Valid headers (main and side chain) are kept in memory and can be walked back
//! towards genesis. The index fills itself lazily: a header missing from memory is
//! hydrated from the [`HeaderStore`] on first access, so startup never has to read the
//! whole chain. An optional ceiling bounds how many headers stay resident.
use bitcoin::{block::Header, hashes::Hash, BlockHash, Work};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    config::HeaderIndexConfig,
    error::{Error, Result},
    record::{zero_work, HeaderRecord},
    store::{HeaderStore, NoStore},
    tips::TipSet,
};

/// Work-ordered, memory-bounded index of block headers.
///
/// Not thread-safe on its own: every mutating method takes `&mut self`, and hydration
/// through [`lookup`](Self::lookup) mutates too. Wrap it in a
/// [`SharedHeaderIndex`](crate::SharedHeaderIndex) to serve several tasks.
#[derive(Debug)]
pub struct HeaderIndex<S = NoStore> {
    store: Option<S>,
    // Insertion order is the eviction order.
    records: IndexMap<BlockHash, HeaderRecord>,
    tips: TipSet,
    config: HeaderIndexConfig,
}

impl HeaderIndex<NoStore> {
    /// An index without a backing store. It only knows headers that are
    /// explicitly inserted.
    pub fn new(config: HeaderIndexConfig) -> Self {
        Self {
            store: None,
            records: IndexMap::new(),
            tips: TipSet::default(),
            config,
        }
    }
}

impl<S: HeaderStore> HeaderIndex<S> {
    /// An index that hydrates missing headers from `store`.
    pub fn with_store(store: S, config: HeaderIndexConfig) -> Self {
        Self {
            store: Some(store),
            records: IndexMap::new(),
            tips: TipSet::default(),
            config,
        }
    }

    /// The backing store, if any.
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Effective resident ceiling, `None` when eviction is disabled.
    pub fn limit(&self) -> Option<usize> {
        self.config.limit()
    }

    /// Number of resident records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is resident.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Quick check whether `hash` is resident. Never touches the store.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.records.contains_key(hash)
    }

    /// The resident record for `hash`, without hydrating.
    pub fn get(&self, hash: &BlockHash) -> Option<&HeaderRecord> {
        self.records.get(hash)
    }

    fn work_of(&self, header: &Header) -> Work {
        match &self.store {
            Some(store) => store.work_of(header),
            None => header.work(),
        }
    }

    /// The record for `hash`, hydrating it from the store if it is not resident.
    ///
    /// Height and cumulative work come from the resident parent when there is one,
    /// otherwise straight from the store. A hydrated record is not a tip candidate:
    /// only [`insert`](Self::insert) feeds the tip set.
    ///
    /// Returns `Ok(None)` for headers the store does not know, or when there is no store.
    pub async fn lookup(&mut self, hash: &BlockHash) -> Result<Option<&HeaderRecord>> {
        if self.records.contains_key(hash) {
            return Ok(self.records.get(hash));
        }
        let Some(store) = self.store.as_ref() else {
            return Ok(None);
        };
        let Some((header, first_seen)) = store.fetch_validated_header(*hash).await? else {
            return Ok(None);
        };

        let work = store.work_of(&header);
        let parent = self
            .records
            .get(&header.prev_blockhash)
            .map(|p| (p.height, p.cumulative_work));

        let (height, cumulative_work) = match parent {
            Some((parent_height, parent_work)) => {
                let height = match parent_height.and_then(|h| h.checked_add(1)) {
                    Some(h) => Some(h),
                    None => store.height_for(*hash).await?,
                };
                (height, parent_work + work)
            }
            None => {
                let height = store.height_for(*hash).await?;
                let cumulative_work = store
                    .cumulative_work_through(*hash)
                    .await?
                    .ok_or(Error::MissingChainWork(*hash))?;
                (height, cumulative_work)
            }
        };

        debug!(%hash, ?height, from_parent = parent.is_some(), "hydrated header");
        let record = HeaderRecord::new(header, height, cumulative_work, first_seen);
        self.records.insert(*hash, record);
        self.evict_to_limit();
        Ok(self.records.get(hash))
    }

    /// Insert an accepted header as a tip candidate. No-op if it is already resident.
    ///
    /// The caller vouches for `parent_cumulative_work`: the index does not check that the
    /// parent is resident or that the baseline matches it. Use [`extend`](Self::extend) to
    /// have the parent resolved and checked instead.
    ///
    /// Returns whether a new record was created.
    pub fn insert(
        &mut self,
        header: &Header,
        height: Option<u32>,
        parent_cumulative_work: Work,
        first_seen: u64,
    ) -> bool {
        let hash = header.block_hash();
        if self.records.contains_key(&hash) {
            trace!(%hash, "header already indexed");
            return false;
        }
        let cumulative_work = parent_cumulative_work + self.work_of(header);
        let record = HeaderRecord::new(*header, height, cumulative_work, first_seen);
        self.tips.insert(&record);
        self.records.insert(hash, record);
        debug!(%hash, ?height, "indexed header");
        self.evict_to_limit();
        true
    }

    /// Insert `header` on top of its parent, which must be resident or hydratable.
    ///
    /// Height and baseline work are taken from the parent; genesis starts at height 0
    /// with zero baseline work. Fails with [`Error::UnknownParent`] otherwise.
    pub async fn extend(&mut self, header: &Header, first_seen: u64) -> Result<bool> {
        let hash = header.block_hash();
        if self.records.contains_key(&hash) {
            return Ok(false);
        }
        let parent = header.prev_blockhash;
        if parent == BlockHash::all_zeros() {
            return Ok(self.insert(header, Some(0), zero_work(), first_seen));
        }
        let Some(record) = self.lookup(&parent).await? else {
            return Err(Error::UnknownParent { hash, parent });
        };
        // Past u32::MAX the height is simply unknown.
        let height = record.height.and_then(|h| h.checked_add(1));
        let baseline = record.cumulative_work;
        Ok(self.insert(header, height, baseline, first_seen))
    }

    /// Drop `hash` from the tip set and the resident table.
    ///
    /// Children keep whatever parent link they resolved; the caller may re-point them.
    /// A stale link is treated as unresolved on the next [`parent`](Self::parent) call.
    pub fn remove(&mut self, hash: &BlockHash) -> Option<HeaderRecord> {
        // O(n) shift keeps the remaining insertion order intact.
        let record = self.records.shift_remove(hash)?;
        self.tips.remove(&record);
        self.detach_from_parent(&record);
        debug!(%hash, "removed header");
        Some(record)
    }

    /// Hash of the most-work tip candidate. Ties go to the header seen first.
    pub fn best_tip(&self) -> Option<BlockHash> {
        self.tips.best()
    }

    /// Record of the most-work tip candidate.
    pub fn best_tip_record(&self) -> Option<&HeaderRecord> {
        self.best_tip().and_then(|hash| self.records.get(&hash))
    }

    /// Tip candidates, best first.
    pub fn tips(&self) -> impl Iterator<Item = BlockHash> + '_ {
        self.tips.iter()
    }

    /// Number of tip candidates.
    pub fn tip_count(&self) -> usize {
        self.tips.len()
    }

    /// Evict records until the resident count is within the ceiling.
    ///
    /// This is a size bound, not an LRU cache: the victim is always the oldest
    /// *inserted* record, however recently it was read. Children of a victim lose their
    /// parent link and re-hydrate it on demand.
    pub fn evict_to_limit(&mut self) {
        let Some(limit) = self.config.limit() else {
            return;
        };
        // Each pop shifts the whole table. Fine at a ceiling of a few thousand; a head
        // offset would be needed for much larger ones.
        while self.records.len() > limit {
            let Some((hash, mut record)) = self.records.shift_remove_index(0) else {
                break;
            };
            self.tips.remove(&record);
            for child in record.children.drain(..) {
                if let Some(child) = self.records.get_mut(&child) {
                    if child.parent == Some(hash) {
                        child.parent = None;
                    }
                }
            }
            self.detach_from_parent(&record);
            trace!(%hash, resident = self.records.len(), "evicted header");
        }
    }

    fn detach_from_parent(&mut self, record: &HeaderRecord) {
        let Some(parent) = record.parent else {
            return;
        };
        if let Some(parent) = self.records.get_mut(&parent) {
            parent.children.retain(|child| *child != record.hash);
        }
    }

    /// The parent of `hash`, resolving and remembering the link on first use.
    ///
    /// Both ends are hydrated if needed. Returns `None` for genesis and when either
    /// header cannot be found, so a walk towards genesis always ends cleanly.
    pub async fn parent(&mut self, hash: &BlockHash) -> Result<Option<&HeaderRecord>> {
        let prev = match self.lookup(hash).await? {
            Some(record) if !record.is_genesis() => record.prev_blockhash(),
            _ => return Ok(None),
        };
        // A link to a record that was removed since is stale: resolve it again.
        if self.lookup(&prev).await?.is_none() {
            return Ok(None);
        }

        // Hydrating the parent may have evicted the child.
        let Some(child) = self.records.get_mut(hash) else {
            return Ok(self.records.get(&prev));
        };
        child.parent = Some(prev);
        if let Some(parent) = self.records.get_mut(&prev) {
            if !parent.children.contains(hash) {
                parent.children.push(*hash);
            }
        }
        Ok(self.records.get(&prev))
    }

    /// The header `depth` links above `hash` (`depth == 0` is `hash` itself).
    ///
    /// `None` if the walk reaches genesis or an unresolvable header first.
    pub async fn ancestor(&mut self, hash: &BlockHash, depth: u32) -> Result<Option<BlockHash>> {
        let Some(mut current) = self.lookup(hash).await?.map(HeaderRecord::hash) else {
            return Ok(None);
        };
        for _ in 0..depth {
            match self.parent(&current).await? {
                Some(parent) => current = parent.hash,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Last common ancestor of `a` and `b`, the point where two branches diverge.
    ///
    /// Needs heights on both walks. `None` if a height is unknown or an ancestor
    /// cannot be resolved before the branches meet.
    pub async fn find_fork(&mut self, a: &BlockHash, b: &BlockHash) -> Result<Option<BlockHash>> {
        let Some(mut left) = self.lookup(a).await?.map(|r| (r.hash, r.height)) else {
            return Ok(None);
        };
        let Some(mut right) = self.lookup(b).await?.map(|r| (r.hash, r.height)) else {
            return Ok(None);
        };
        while left.0 != right.0 {
            let (Some(left_height), Some(right_height)) = (left.1, right.1) else {
                return Ok(None);
            };
            let side = if left_height >= right_height {
                &mut left
            } else {
                &mut right
            };
            let hash = side.0;
            match self.parent(&hash).await? {
                Some(parent) => *side = (parent.hash, parent.height),
                None => return Ok(None),
            }
        }
        Ok(Some(left.0))
    }

    /// Would extending `base` with a header `new_hash` of `new_work` beat `other`?
    ///
    /// Compares `base.cumulative_work + new_work` with `other`. On an exact tie the
    /// candidate wins only if it is already known (resident or hydratable) and was seen
    /// strictly before `other`: an unseen chain never pre-empts an established one.
    pub async fn is_more_work(
        &mut self,
        base: &HeaderRecord,
        other: &HeaderRecord,
        new_hash: &BlockHash,
        new_work: Work,
    ) -> Result<bool> {
        let candidate = base.cumulative_work + new_work;
        if candidate != other.cumulative_work {
            return Ok(candidate > other.cumulative_work);
        }
        Ok(match self.lookup(new_hash).await? {
            Some(known) => known.first_seen < other.first_seen,
            None => false,
        })
    }
}
