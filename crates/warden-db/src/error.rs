// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use warden_policy_core::{FilterError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Invalid stored criteria: {0}")]
	Criteria(#[from] FilterError),

	#[error("Invalid identifier: {0}")]
	InvalidIdentifier(String),

	#[error("Unsupported filter value for '{field}': {message}")]
	UnsupportedValue { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for StoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::NotFound(resource) => StoreError::UnknownResource(resource),
			DbError::Criteria(e) => StoreError::InvalidRecord(e.to_string()),
			other => StoreError::backend(other),
		}
	}
}
