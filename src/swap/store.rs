use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context as _, Result};
use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::{Hash as _, sha256};
use bitcoin::{Address, PublicKey, ScriptBuf};
use rusqlite::{Connection, OptionalExtension as _, params};

use super::{StoreError, SwapPrivateInfo, SwapPublicInfo};

/// Durable swap storage. `insert_if_absent` must be atomic with respect to
/// concurrent callers keyed on the payment hash; the uniqueness constraint
/// on that column is the mechanism backing it.
pub trait SwapStore: Send + Sync {
    /// Looks up the public swap information for a payment hash. Never
    /// returns private key material.
    fn find_by_payment_hash(
        &self,
        payment_hash: &sha256::Hash,
    ) -> Result<Option<SwapPublicInfo>, StoreError>;

    /// Persists a swap unless one already exists for the same payment hash.
    /// An existing row is left untouched and reported as
    /// `StoreError::AlreadyExists`.
    fn insert_if_absent(
        &self,
        public: &SwapPublicInfo,
        private: &SwapPrivateInfo,
    ) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct SqliteSwapStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSwapStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create swap store dir {}", dir.display()))?;
        }

        let conn =
            Connection::open(&path).with_context(|| format!("open sqlite {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("set sqlite busy_timeout")?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .context("configure sqlite pragmas")?;

        migrate(&conn).context("migrate sqlite schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SwapStore for SqliteSwapStore {
    fn find_by_payment_hash(
        &self,
        payment_hash: &sha256::Hash,
    ) -> Result<Option<SwapPublicInfo>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        let swap = conn
            .query_row(
                r#"
SELECT
  payer_pubkey,
  service_pubkey,
  lock_time,
  script,
  address
FROM swaps
WHERE payment_hash = ?1
"#,
                params![payment_hash.as_byte_array().as_slice()],
                |row| {
                    let payer_pubkey: Vec<u8> = row.get(0)?;
                    let service_pubkey: Vec<u8> = row.get(1)?;
                    let lock_time: i64 = row.get(2)?;
                    let script: Vec<u8> = row.get(3)?;
                    let address: String = row.get(4)?;

                    let payer_pubkey = PublicKey::from_slice(&payer_pubkey).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Blob,
                            format!("invalid payer_pubkey: {e}").into(),
                        )
                    })?;
                    let service_pubkey = PublicKey::from_slice(&service_pubkey).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Blob,
                            format!("invalid service_pubkey: {e}").into(),
                        )
                    })?;
                    let lock_time = u32::try_from(lock_time).map_err(|_| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Integer,
                            format!("invalid lock_time {lock_time}").into(),
                        )
                    })?;
                    let address = address.parse::<Address<NetworkUnchecked>>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            format!("invalid address: {e}").into(),
                        )
                    })?;

                    Ok(SwapPublicInfo {
                        payment_hash: *payment_hash,
                        payer_pubkey,
                        service_pubkey,
                        lock_time,
                        script: ScriptBuf::from_bytes(script),
                        // Stored by this process, the network is our own.
                        address: address.assume_checked(),
                    })
                },
            )
            .optional()
            .with_context(|| format!("get swap {payment_hash}"))?;

        Ok(swap)
    }

    fn insert_if_absent(
        &self,
        public: &SwapPublicInfo,
        private: &SwapPrivateInfo,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        let rows = conn
            .execute(
                r#"
INSERT INTO swaps (
  payment_hash,
  payer_pubkey,
  service_pubkey,
  service_privkey,
  lock_time,
  script,
  address
) VALUES (
  ?1, ?2, ?3, ?4, ?5, ?6, ?7
)
ON CONFLICT (payment_hash) DO NOTHING
"#,
                params![
                    public.payment_hash.as_byte_array().as_slice(),
                    public.payer_pubkey.to_bytes(),
                    public.service_pubkey.to_bytes(),
                    private.service_privkey.secret_bytes().to_vec(),
                    public.lock_time,
                    public.script.as_bytes(),
                    public.address.to_string(),
                ],
            )
            .with_context(|| format!("insert swap {}", public.payment_hash))?;

        if rows == 0 {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS swaps (
  payment_hash BLOB PRIMARY KEY,
  payer_pubkey BLOB NOT NULL,
  service_pubkey BLOB NOT NULL,
  service_privkey BLOB NOT NULL,
  lock_time INTEGER NOT NULL,
  script BLOB NOT NULL,
  address TEXT NOT NULL
);
"#,
    )
    .context("create tables")?;
    Ok(())
}
