//! Errors surfaced by the header index.
use bitcoin::BlockHash;

/// Header index error.
///
/// An unknown header is never an error: lookups report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store failed (I/O, corruption, decoding).
    #[error("header store failure: {0:#}")]
    Storage(#[from] anyhow::Error),
    /// The store returned a header but has no cumulative work for it.
    #[error("header store knows {0} but has no chain work for it")]
    MissingChainWork(BlockHash),
    /// [`extend`](crate::HeaderIndex::extend) was given a header whose parent is neither
    /// resident nor hydratable.
    #[error("header {hash} extends unknown parent {parent}")]
    UnknownParent {
        /// Hash of the rejected header.
        hash: BlockHash,
        /// The `prev_blockhash` that could not be resolved.
        parent: BlockHash,
    },
}

/// Result alias used throughout the index.
pub type Result<T> = std::result::Result<T, Error>;
