// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::Action;

/// Errors raised by a grant store or resource registry implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("store backend error: {0}")]
	Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

	#[error("invalid record: {0}")]
	InvalidRecord(String),

	#[error("unknown resource: {0}")]
	UnknownResource(String),
}

impl StoreError {
	pub fn backend<E>(err: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		StoreError::Backend(Box::new(err))
	}
}

/// Errors raised while resolving or evaluating a policy.
///
/// Denial is never an error; it is reported through the grant result.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
	#[error("unknown resource: {0}")]
	UnknownResource(String),

	#[error("unknown action '{action}' for resource '{resource}'")]
	UnknownAction { resource: String, action: Action },

	#[error("configuration error: {0}")]
	Configuration(String),

	#[error(transparent)]
	Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
