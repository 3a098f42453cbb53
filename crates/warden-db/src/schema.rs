// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant store schema.
//!
//! Business record tables are not managed here; `query` reads the table named
//! after a registered resource identity.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"resources",
		r#"
		CREATE TABLE IF NOT EXISTS resources (
			id INTEGER PRIMARY KEY,
			name TEXT NOT NULL,
			identity TEXT NOT NULL UNIQUE
		)
		"#,
	),
	(
		"roles",
		r#"
		CREATE TABLE IF NOT EXISTS roles (
			id INTEGER PRIMARY KEY,
			name TEXT NOT NULL UNIQUE,
			active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL
		)
		"#,
	),
	(
		"subjects",
		r#"
		CREATE TABLE IF NOT EXISTS subjects (
			id INTEGER PRIMARY KEY,
			username TEXT UNIQUE,
			created_at TEXT NOT NULL
		)
		"#,
	),
	(
		"subject_roles",
		r#"
		CREATE TABLE IF NOT EXISTS subject_roles (
			subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
			role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
			PRIMARY KEY (subject_id, role_id)
		)
		"#,
	),
	(
		"permissions",
		r#"
		CREATE TABLE IF NOT EXISTS permissions (
			id INTEGER PRIMARY KEY,
			resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
			action TEXT NOT NULL CHECK (action IN ('create', 'read', 'update', 'delete')),
			relation TEXT NOT NULL CHECK (relation IN ('user', 'role')),
			subject_id INTEGER REFERENCES subjects(id) ON DELETE CASCADE,
			role_id INTEGER REFERENCES roles(id) ON DELETE CASCADE,
			created_at TEXT NOT NULL,
			CHECK (
				(relation = 'user' AND subject_id IS NOT NULL AND role_id IS NULL)
				OR (relation = 'role' AND role_id IS NOT NULL AND subject_id IS NULL)
			)
		)
		"#,
	),
	(
		"idx_permissions_subject",
		"CREATE INDEX IF NOT EXISTS idx_permissions_subject ON permissions(subject_id)",
	),
	(
		"idx_permissions_role",
		"CREATE INDEX IF NOT EXISTS idx_permissions_role ON permissions(role_id)",
	),
	(
		"permission_criteria",
		r#"
		CREATE TABLE IF NOT EXISTS permission_criteria (
			id INTEGER PRIMARY KEY,
			permission_id INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
			where_clause TEXT NOT NULL
		)
		"#,
	),
	(
		"permission_object_filters",
		r#"
		CREATE TABLE IF NOT EXISTS permission_object_filters (
			id INTEGER PRIMARY KEY,
			permission_id INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
			object_id INTEGER NOT NULL
		)
		"#,
	),
	(
		"features",
		r#"
		CREATE TABLE IF NOT EXISTS features (
			id INTEGER PRIMARY KEY,
			name TEXT NOT NULL,
			description TEXT,
			identity TEXT NOT NULL UNIQUE,
			context TEXT NOT NULL DEFAULT 'default',
			active INTEGER NOT NULL DEFAULT 1
		)
		"#,
	),
	(
		"subject_features",
		r#"
		CREATE TABLE IF NOT EXISTS subject_features (
			subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
			feature_id INTEGER NOT NULL REFERENCES features(id) ON DELETE CASCADE,
			PRIMARY KEY (subject_id, feature_id)
		)
		"#,
	),
	(
		"role_features",
		r#"
		CREATE TABLE IF NOT EXISTS role_features (
			role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
			feature_id INTEGER NOT NULL REFERENCES features(id) ON DELETE CASCADE,
			PRIMARY KEY (role_id, feature_id)
		)
		"#,
	),
];

/// Creates every grant store table that does not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, statement) in MIGRATIONS {
		sqlx::query(statement).execute(pool).await?;
		tracing::trace!(migration = %name, "applied");
	}
	tracing::info!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}
