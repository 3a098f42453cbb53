// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

/// Opens the grant database.
///
/// Foreign keys are switched on for every connection: SQLite leaves them off by
/// default, and the schema relies on `ON DELETE CASCADE` to drop a resource's
/// permissions, their criteria and object filters, and role or feature
/// assignments along with their owner. WAL lets readers resolve policies while
/// grants are written.
///
/// # Errors
/// `DbError::Internal` for a malformed URL, `DbError::Sqlx` when connecting fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
