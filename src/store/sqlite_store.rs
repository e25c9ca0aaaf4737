//! Embedded SQLite header store.
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bitcoin::{block::Header, consensus, BlockHash, Work};
use rusqlite::{params, Connection};
use tokio::task;

use crate::store::HeaderStore;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS headers (
        hash        TEXT PRIMARY KEY,
        height      INTEGER,
        chain_work  TEXT NOT NULL,
        first_seen  INTEGER NOT NULL,
        header      BLOB NOT NULL
    );
"#;

/// Validated headers table:
///   headers(hash TEXT PRIMARY KEY, height INTEGER, chain_work TEXT, first_seen INTEGER, header BLOB)
///
/// Columns:
///  - hash        : hex BlockHash
///  - height      : u32, NULL when unknown
///  - chain_work  : hex of the big-endian cumulative work
///  - first_seen  : unix seconds (or any monotonic sequence) of first acceptance
///  - header      : consensus-encoded 80-byte header
#[derive(Clone)]
pub struct SqliteHeaderStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteHeaderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHeaderStore").finish_non_exhaustive()
    }
}

impl SqliteHeaderStore {
    /// Creates/initializes the SQLite file at `path`.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite at {}", path.display()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, lives as long as the store handle (useful for tests).
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("sqlite connection lock poisoned"))?;
            f(&conn)
        })
        .await?
    }

    fn column<T: rusqlite::types::FromSql>(
        conn: &Connection,
        column: &str,
        hash: &BlockHash,
    ) -> anyhow::Result<Option<T>> {
        let mut stmt = conn.prepare(&format!("SELECT {column} FROM headers WHERE hash = ?1"))?;
        let mut rows = stmt.query(params![hash.to_string()])?;
        if let Some(row) = rows.next()? {
            let v: T = row.get(0)?;
            Ok(Some(v))
        } else {
            Ok(None)
        }
    }

    /// Persist a validated header. Called by the block-processing pipeline, never by the index.
    pub async fn save_header(
        &self,
        header: Header,
        height: Option<u32>,
        chain_work: Work,
        first_seen: u64,
    ) -> anyhow::Result<BlockHash> {
        let hash = header.block_hash();
        let first_seen = i64::try_from(first_seen).context("first_seen out of range")?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO headers(hash,height,chain_work,first_seen,header) VALUES(?1,?2,?3,?4,?5)
                 ON CONFLICT(hash) DO UPDATE SET
                    height=excluded.height,
                    chain_work=excluded.chain_work,
                    first_seen=excluded.first_seen,
                    header=excluded.header",
                params![
                    hash.to_string(),
                    height,
                    hex::encode(chain_work.to_be_bytes()),
                    first_seen,
                    consensus::encode::serialize(&header),
                ],
            )?;
            Ok(hash)
        })
        .await
    }

    /// Number of stored headers.
    pub async fn count(&self) -> anyhow::Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM headers", [], |row| row.get(0))?;
            Ok(u64::try_from(n)?)
        })
        .await
    }
}

#[async_trait]
impl HeaderStore for SqliteHeaderStore {
    async fn fetch_validated_header(
        &self,
        hash: BlockHash,
    ) -> anyhow::Result<Option<(Header, u64)>> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT header, first_seen FROM headers WHERE hash = ?1")?;
            let mut rows = stmt.query(params![hash.to_string()])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let raw: Vec<u8> = row.get(0)?;
            let first_seen: i64 = row.get(1)?;
            let header: Header = consensus::encode::deserialize(&raw)
                .with_context(|| format!("decode stored header {hash}"))?;
            let first_seen = u64::try_from(first_seen).context("negative first_seen")?;
            Ok(Some((header, first_seen)))
        })
        .await
    }

    async fn height_for(&self, hash: BlockHash) -> anyhow::Result<Option<u32>> {
        self.with_conn(move |conn| {
            Ok(Self::column::<Option<u32>>(conn, "height", &hash)?.flatten())
        })
        .await
    }

    async fn cumulative_work_through(&self, hash: BlockHash) -> anyhow::Result<Option<Work>> {
        self.with_conn(move |conn| {
            let Some(hexed) = Self::column::<String>(conn, "chain_work", &hash)? else {
                return Ok(None);
            };
            let bytes: [u8; 32] = hex::decode(&hexed)
                .context("parse chain_work")?
                .try_into()
                .map_err(|_| anyhow!("chain_work for {hash} is not 32 bytes"))?;
            Ok(Some(Work::from_be_bytes(bytes)))
        })
        .await
    }
}
