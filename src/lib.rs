#![forbid(unsafe_code)]
#![deny(missing_docs)]
//! block-header-index: an in-memory, work-ordered map of Bitcoin block headers.
//!
//! Plays the role of bitcoind's `mapBlockIndex` in front of a store that already holds
//! validated blocks: walk back to ancestors, find the most-work tip, locate the fork
//! point between two branches, without loading the whole chain into memory.
//!
//! ## What you implement
//! - [`HeaderStore`]: read validated headers, their height and cumulative work.
//!   [`MemoryHeaderStore`] and [`SqliteHeaderStore`] are provided.
//!
//! ## What the index does
//! - **Hydrates** headers lazily from the store the first time they are asked for.
//! - Tracks **cumulative work** per header and keeps tip candidates ordered by it, with
//!   ties going to the header seen first.
//! - **Evicts** the oldest-inserted headers once a resident ceiling is exceeded (FIFO,
//!   not LRU), severing child links so they re-hydrate on demand.
//!
//! It does not validate blocks and persists nothing.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use block_header_index::prelude::*;
//!
//! async fn run(genesis: bitcoin::block::Header, next: bitcoin::block::Header) -> anyhow::Result<()> {
//!     let store = MemoryHeaderStore::new();
//!     let mut index = HeaderIndex::with_store(store, HeaderIndexConfig::default());
//!
//!     index.extend(&genesis, 0).await?;
//!     index.extend(&next, 1).await?;
//!     assert_eq!(index.best_tip(), Some(next.block_hash()));
//!
//!     // Walk back one header.
//!     let parent = index.parent(&next.block_hash()).await?.map(|r| r.hash());
//!     assert_eq!(parent, Some(genesis.block_hash()));
//!     Ok(())
//! }
//! ```

/// Construction-time options.
pub mod config;

/// Error type.
pub mod error;

/// The header index itself.
pub mod index;

/// One resident header and its navigation links.
pub mod record;

/// Lock-protected handle for concurrent use.
pub mod shared;

/// Storage adapter trait and concrete stores.
pub mod store;

// Internal helpers:
mod tips;

// Public re-exports
pub use config::HeaderIndexConfig;
pub use error::{Error, Result};
pub use index::HeaderIndex;
pub use record::HeaderRecord;
pub use shared::SharedHeaderIndex;
pub use store::{HeaderStore, MemoryHeaderStore, NoStore};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteHeaderStore;

/// Convenience prelude for end users.
pub mod prelude {
    pub use crate::{
        HeaderIndex, HeaderIndexConfig, HeaderRecord, HeaderStore, MemoryHeaderStore,
        SharedHeaderIndex,
    };

    #[cfg(feature = "store-sqlite")]
    pub use crate::SqliteHeaderStore;
}
