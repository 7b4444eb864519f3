// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded users table backed by redb (pure Rust, ACID).
//!
//! One table: `users`, keyed by the external identity-service id, holding
//! the serialized [`UserRecord`]. redb serializes write transactions, which
//! gives the insert-if-absent discipline concurrent first logins rely on:
//! the first writer creates the row, every later writer observes it.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

/// users: external user id → serialized UserRecord (JSON bytes).
const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("user not found: {0}")]
    NotFound(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Locally mirrored user row. `id` is authoritative and comes from the
/// identity service; rows are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    /// May be empty until the identity service reports a verified address.
    pub email: String,
    /// Owning SDK server. Once set, never changes (sticky wallet).
    pub sdk_server_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Last time this user's wallet was loaded on its SDK server.
    pub last_load_at: Option<DateTime<Utc>>,
}

pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so read transactions never fail on a fresh file.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert-if-absent. A concurrent creator wins the race cleanly: the
    /// loser gets the row the winner wrote, not an error.
    pub fn get_or_create_user(&self, id: i64, email: &str) -> StoreResult<UserRecord> {
        let write_txn = self.db.begin_write()?;
        let record;
        {
            let mut table = write_txn.open_table(USERS)?;
            let existing = table
                .get(id)?
                .map(|value| serde_json::from_slice::<UserRecord>(value.value()))
                .transpose()?;
            match existing {
                Some(found) => record = found,
                None => {
                    record = UserRecord {
                        id,
                        email: email.to_string(),
                        sdk_server_id: None,
                        created_at: Utc::now(),
                        last_load_at: None,
                    };
                    table.insert(id, serde_json::to_vec(&record)?.as_slice())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(record)
    }

    /// Bind a user to an SDK server. First writer wins; the stored binding
    /// is returned either way, so callers always act on the same server.
    pub fn assign_sdk_server(&self, id: i64, server_id: &str) -> StoreResult<UserRecord> {
        let write_txn = self.db.begin_write()?;
        let record;
        {
            let mut table = write_txn.open_table(USERS)?;
            let mut current: UserRecord = table
                .get(id)?
                .map(|value| serde_json::from_slice(value.value()))
                .transpose()?
                .ok_or(StoreError::NotFound(id))?;
            if current.sdk_server_id.is_none() {
                current.sdk_server_id = Some(server_id.to_string());
                table.insert(id, serde_json::to_vec(&current)?.as_slice())?;
            }
            record = current;
        }
        write_txn.commit()?;
        Ok(record)
    }

    /// Stamp the last wallet load time.
    pub fn touch_last_load(&self, id: i64) -> StoreResult<UserRecord> {
        let write_txn = self.db.begin_write()?;
        let record;
        {
            let mut table = write_txn.open_table(USERS)?;
            let mut current: UserRecord = table
                .get(id)?
                .map(|value| serde_json::from_slice(value.value()))
                .transpose()?
                .ok_or(StoreError::NotFound(id))?;
            current.last_load_at = Some(Utc::now());
            table.insert(id, serde_json::to_vec(&current)?.as_slice())?;
            record = current;
        }
        write_txn.commit()?;
        Ok(record)
    }
}
