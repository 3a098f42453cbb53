// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy configuration: default roles and base permissions.
//!
//! Base permissions are grants every subject holds without a stored record:
//!
//! - `global` entries apply to the whole resource
//! - `self` entries apply to the subject's own record only; they are narrowed to
//!   exactly one object filter equal to the subject id

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::model::{BaseScope, Criteria, GrantOrigin, Grantee, ObjectFilter, Permission, Resource};
use crate::types::{Action, ObjectId, ResourceId, SubjectId};

/// One configured base permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseGrant {
	/// Resource identity.
	pub resource: String,
	pub action: Action,
	#[serde(default)]
	pub criteria: Vec<Criteria>,
	#[serde(default)]
	pub object_filters: Vec<ObjectId>,
}

impl BaseGrant {
	pub fn new(resource: impl Into<String>, action: Action) -> Self {
		Self {
			resource: resource.into(),
			action,
			criteria: Vec::new(),
			object_filters: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasePermissions {
	#[serde(rename = "self", default)]
	pub own: Vec<BaseGrant>,
	#[serde(default)]
	pub global: Vec<BaseGrant>,
}

impl BasePermissions {
	pub fn is_empty(&self) -> bool {
		self.own.is_empty() && self.global.is_empty()
	}

	/// Materializes synthetic permissions for `subject`.
	///
	/// Entries rejected by `filter` are skipped before their resource is looked
	/// up. An admitted entry naming a resource missing from `resources` fails the
	/// whole materialization.
	pub fn materialize(
		&self,
		subject: SubjectId,
		resources: &[Resource],
		filter: &PermissionFilter,
	) -> Result<Vec<Permission>> {
		let known: HashMap<&str, ResourceId> = resources
			.iter()
			.map(|r| (r.identity.as_str(), r.id))
			.collect();

		let scoped = self
			.global
			.iter()
			.map(|grant| (BaseScope::Global, grant))
			.chain(self.own.iter().map(|grant| (BaseScope::Own, grant)));

		let mut permissions = Vec::new();
		for (scope, grant) in scoped {
			if !filter.admits(&grant.resource, grant.action) {
				continue;
			}

			let resource_id = known.get(grant.resource.as_str()).copied().ok_or_else(|| {
				PolicyError::Configuration(format!(
					"base permission references unknown resource '{}'",
					grant.resource
				))
			})?;

			let object_filters = match scope {
				BaseScope::Own => vec![ObjectFilter::new(subject)],
				BaseScope::Global => grant
					.object_filters
					.iter()
					.copied()
					.map(ObjectFilter::new)
					.collect(),
			};

			permissions.push(Permission {
				id: None,
				resource_id,
				action: grant.action,
				holder: Grantee::Subject(subject),
				criteria: grant.criteria.clone(),
				object_filters,
				origin: GrantOrigin::Base(scope),
			});
		}

		debug!(
			subject_id = %subject,
			count = permissions.len(),
			"materialized base permissions"
		);
		Ok(permissions)
	}
}

/// Policy settings handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
	/// Role name to enabled flag.
	pub default_roles: BTreeMap<String, bool>,
	/// Role assigned to new subjects.
	pub default_role: Option<String>,
	#[serde(default)]
	pub base_permissions: BasePermissions,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		let default_roles = ["admin", "registered", "public"]
			.into_iter()
			.map(|name| (name.to_string(), true))
			.collect();
		Self {
			default_roles,
			default_role: Some("registered".to_string()),
			base_permissions: BasePermissions::default(),
		}
	}
}

impl PolicyConfig {
	pub fn enabled_default_roles(&self) -> impl Iterator<Item = &str> {
		self.default_roles
			.iter()
			.filter(|(_, enabled)| **enabled)
			.map(|(name, _)| name.as_str())
	}
}

/// Restricts aggregation to one resource and/or one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFilter {
	pub resource: Option<String>,
	pub action: Option<Action>,
}

impl PermissionFilter {
	pub fn all() -> Self {
		Self::default()
	}

	pub fn admits(&self, resource: &str, action: Action) -> bool {
		self.resource.as_deref().map_or(true, |r| r == resource)
			&& self.action.map_or(true, |a| a == action)
	}
}
