// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Boundaries to the data the engine reads.
//!
//! The engine never writes. Implementations are expected to be synchronized
//! externally and to return every store failure as a [`StoreError`].

use async_trait::async_trait;
use warden_policy_core::{
	Feature, FilterExpr, Permission, PermissionFilter, Record, Resource, Role, RoleId,
	StoreError, SubjectId,
};

/// Selects resources from the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
	pub identity: Option<String>,
}

impl ResourceQuery {
	pub fn all() -> Self {
		Self::default()
	}

	pub fn identity(identity: impl Into<String>) -> Self {
		Self {
			identity: Some(identity.into()),
		}
	}

	pub fn admits(&self, resource: &Resource) -> bool {
		self.identity
			.as_deref()
			.map_or(true, |identity| identity == resource.identity)
	}
}

/// Associations loaded alongside permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Populate {
	pub criteria: bool,
	pub object_filters: bool,
}

impl Populate {
	pub fn all() -> Self {
		Self {
			criteria: true,
			object_filters: true,
		}
	}

	pub fn none() -> Self {
		Self {
			criteria: false,
			object_filters: false,
		}
	}
}

impl Default for Populate {
	fn default() -> Self {
		Self::all()
	}
}

/// The set of known resources.
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
	async fn list(&self, query: &ResourceQuery) -> Result<Vec<Resource>, StoreError>;
}

/// Queryable permissions, roles, features and business records.
#[async_trait]
pub trait GrantStore: Send + Sync {
	/// Permissions held directly by `subject` or by any role in `roles`.
	///
	/// The filter's resource is a resource identity.
	async fn find_permissions_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		filter: &PermissionFilter,
		populate: Populate,
	) -> Result<Vec<Permission>, StoreError>;

	async fn find_subject_roles(
		&self,
		subject: SubjectId,
		active_only: bool,
	) -> Result<Vec<Role>, StoreError>;

	async fn find_features_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		active_only: bool,
	) -> Result<Vec<Feature>, StoreError>;

	/// Records of `resource` matching `filter`; all records when `filter` is `None`.
	async fn query(
		&self,
		resource: &str,
		filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>, StoreError>;
}
