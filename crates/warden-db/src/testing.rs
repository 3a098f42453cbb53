// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::schema::run_migrations;
use crate::store::SqliteGrantStore;

/// In-memory pool. One connection, so every query sees the same database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap()
}

/// Migrated in-memory grant store.
pub async fn create_test_store() -> SqliteGrantStore {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	SqliteGrantStore::new(pool)
}

/// Business table for the `invoice` resource with ids 7, 9, 42 and 50.
pub async fn create_invoice_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS invoice (
			id INTEGER PRIMARY KEY,
			owner INTEGER NOT NULL,
			total REAL NOT NULL,
			status TEXT NOT NULL,
			note TEXT
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query(
		r#"
		INSERT INTO invoice (id, owner, total, status, note) VALUES
			(7, 1, 10.0, 'paid', 'first'),
			(9, 1, 99.5, 'open', NULL),
			(42, 42, 42.5, 'open', NULL),
			(50, 2, 500.0, 'void', 'cancelled')
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}
