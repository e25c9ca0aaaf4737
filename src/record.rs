//! A single header's position in the chain graph.
use std::cmp::Ordering;

use bitcoin::{block::Header, hashes::Hash, BlockHash, Work};

/// Zero proof-of-work, the baseline below genesis.
pub fn zero_work() -> Work {
    Work::from_be_bytes([0u8; 32])
}

/// Most-work-first ordering of `(cumulative_work, first_seen)` pairs.
///
/// More work sorts first. On a tie the header seen earlier sorts first, mirroring
/// bitcoind's `CBlockIndexWorkComparator` with the direction flipped so the best
/// candidate is the smallest element.
pub(crate) fn work_order(a: (Work, u64), b: (Work, u64)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

/// A header resident in the [`HeaderIndex`](crate::HeaderIndex).
///
/// The verbatim header fields never change. `parent` and `children` are lookup
/// relations resolved through the owning index, never ownership edges: a link to a
/// hash that is no longer resident simply means "unresolved".
#[derive(Debug, Clone)]
pub struct HeaderRecord {
    pub(crate) hash: BlockHash,
    pub(crate) header: Header,
    pub(crate) height: Option<u32>,
    pub(crate) cumulative_work: Work,
    pub(crate) first_seen: u64,
    pub(crate) parent: Option<BlockHash>,
    pub(crate) children: Vec<BlockHash>,
}

impl HeaderRecord {
    pub(crate) fn new(
        header: Header,
        height: Option<u32>,
        cumulative_work: Work,
        first_seen: u64,
    ) -> Self {
        Self {
            hash: header.block_hash(),
            header,
            height,
            cumulative_work,
            first_seen,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Block hash, the record's identity.
    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    /// The verbatim 80-byte header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Hash of the previous header (all zeros for genesis).
    pub fn prev_blockhash(&self) -> BlockHash {
        self.header.prev_blockhash
    }

    /// Height, when known.
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Total work from genesis through this header, inclusive.
    pub fn cumulative_work(&self) -> Work {
        self.cumulative_work
    }

    /// When the header was first accepted. Only used to break work ties.
    pub fn first_seen(&self) -> u64 {
        self.first_seen
    }

    /// The resolved parent link, if any. `None` is either genesis or "not yet resolved".
    pub fn parent(&self) -> Option<BlockHash> {
        self.parent
    }

    /// Children that resolved their parent link to this record.
    pub fn children(&self) -> &[BlockHash] {
        &self.children
    }

    /// Whether this header has no predecessor.
    pub fn is_genesis(&self) -> bool {
        self.header.prev_blockhash == BlockHash::all_zeros()
    }

    /// Compare two records in tip-set order: more cumulative work first, then the
    /// earlier `first_seen`. `Equal` means the same chain position, not the same header.
    pub fn cmp_work(&self, other: &Self) -> Ordering {
        work_order(
            (self.cumulative_work, self.first_seen),
            (other.cumulative_work, other.first_seen),
        )
    }
}

impl PartialEq for HeaderRecord {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for HeaderRecord {}
