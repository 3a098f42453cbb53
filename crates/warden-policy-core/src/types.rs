// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for access policies.
//!
//! - **ID newtypes**: Type-safe wrappers around the numeric keys of the grant store
//!   ([`SubjectId`], [`RoleId`], [`ResourceId`], etc.) preventing accidental mixing
//! - **Actions**: The closed set of operations a grant can cover ([`Action`])
//!
//! All ID types serialize transparently as integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
		)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from its numeric key.
			pub const fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner numeric key.
			pub const fn get(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(SubjectId, "Unique identifier for a subject (user).");
define_id_type!(RoleId, "Unique identifier for a role.");
define_id_type!(ResourceId, "Unique identifier for a resource (model).");
define_id_type!(PermissionId, "Unique identifier for a stored permission.");
define_id_type!(FeatureId, "Unique identifier for a feature.");
define_id_type!(ObjectId, "Identifier of a single business record.");

impl From<SubjectId> for ObjectId {
	fn from(id: SubjectId) -> Self {
		Self(id.0)
	}
}

// =============================================================================
// Actions
// =============================================================================

/// Operations a permission can grant on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Create,
	Read,
	Update,
	Delete,
}

impl Action {
	/// Returns all actions in canonical order.
	pub fn all() -> &'static [Action] {
		&[Action::Create, Action::Read, Action::Update, Action::Delete]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Create => "create",
			Action::Read => "read",
			Action::Update => "update",
			Action::Delete => "delete",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when a string does not name one of the four actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
	type Err = ParseActionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"create" => Ok(Action::Create),
			"read" => Ok(Action::Read),
			"update" => Ok(Action::Update),
			"delete" => Ok(Action::Delete),
			other => Err(ParseActionError(other.to_string())),
		}
	}
}
