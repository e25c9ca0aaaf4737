//! Work-ordered set of chain-valid headers.
//!
//! Analog of bitcoind's `setBlockIndexCandidates`, except it never holds failed
//! headers: only main and side chain headers the pipeline accepted. Lesser-work
//! entries stay until they are removed or evicted.
use std::{cmp::Ordering, collections::BTreeSet};

use bitcoin::{BlockHash, Work};

use crate::record::{work_order, HeaderRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TipKey {
    cumulative_work: Work,
    first_seen: u64,
    hash: BlockHash,
}

impl From<&HeaderRecord> for TipKey {
    fn from(record: &HeaderRecord) -> Self {
        Self {
            cumulative_work: record.cumulative_work,
            first_seen: record.first_seen,
            hash: record.hash,
        }
    }
}

impl Ord for TipKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Hash last: equal-work, equal-time headers are adjacent, never merged.
        work_order(
            (self.cumulative_work, self.first_seen),
            (other.cumulative_work, other.first_seen),
        )
        .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for TipKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered tip candidates, best first.
#[derive(Debug, Default)]
pub(crate) struct TipSet {
    set: BTreeSet<TipKey>,
}

impl TipSet {
    /// Returns `false` if the record was already a member.
    pub(crate) fn insert(&mut self, record: &HeaderRecord) -> bool {
        self.set.insert(TipKey::from(record))
    }

    /// Returns `false` if the record was not a member.
    pub(crate) fn remove(&mut self, record: &HeaderRecord) -> bool {
        self.set.remove(&TipKey::from(record))
    }

    pub(crate) fn best(&self) -> Option<BlockHash> {
        self.set.first().map(|key| key.hash)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = BlockHash> + '_ {
        self.set.iter().map(|key| key.hash)
    }

    pub(crate) fn len(&self) -> usize {
        self.set.len()
    }
}
