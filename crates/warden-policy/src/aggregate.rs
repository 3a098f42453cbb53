// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission aggregation.
//!
//! Collects every permission that applies to a subject: grants held directly,
//! grants held by the subject's active roles, and base grants from
//! configuration. The resource lookup and the role/permission lookup run
//! concurrently; either failing aborts the aggregation.

use tracing::{debug, instrument};
use warden_policy_core::{
	Permission, PermissionFilter, PolicyConfig, Resource, Result, RoleId, StoreError, SubjectId,
};

use crate::store::{GrantStore, Populate, ResourceQuery, ResourceRegistry};

/// Resources in scope and the permissions that apply to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
	pub resources: Vec<Resource>,
	/// Stored permissions first, then synthetic base permissions.
	pub permissions: Vec<Permission>,
}

pub struct PermissionAggregator<'a, R: ?Sized, S: ?Sized> {
	registry: &'a R,
	store: &'a S,
	config: &'a PolicyConfig,
}

impl<'a, R, S> PermissionAggregator<'a, R, S>
where
	R: ResourceRegistry + ?Sized,
	S: GrantStore + ?Sized,
{
	pub fn new(registry: &'a R, store: &'a S, config: &'a PolicyConfig) -> Self {
		Self {
			registry,
			store,
			config,
		}
	}

	#[instrument(
		skip(self, filter),
		fields(subject_id = %subject, resource = ?filter.resource, action = ?filter.action)
	)]
	pub async fn aggregate(&self, subject: SubjectId, filter: &PermissionFilter) -> Result<Aggregated> {
		let query = ResourceQuery {
			identity: filter.resource.clone(),
		};

		let (resources, mut permissions) = futures::try_join!(
			self.registry.list(&query),
			self.stored_permissions(subject, filter),
		)?;

		let base = self
			.config
			.base_permissions
			.materialize(subject, &resources, filter)?;

		debug!(
			resources = resources.len(),
			stored = permissions.len(),
			base = base.len(),
			"aggregated permissions"
		);

		permissions.extend(base);
		Ok(Aggregated {
			resources,
			permissions,
		})
	}

	async fn stored_permissions(
		&self,
		subject: SubjectId,
		filter: &PermissionFilter,
	) -> std::result::Result<Vec<Permission>, StoreError> {
		let roles = self.store.find_subject_roles(subject, true).await?;
		let role_ids: Vec<RoleId> = roles
			.iter()
			.filter(|role| role.active)
			.map(|role| role.id)
			.collect();

		self.store
			.find_permissions_for(subject, &role_ids, filter, Populate::all())
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryStore;
	use warden_policy_core::{
		Action, BaseGrant, GrantOrigin, Grantee, ObjectFilter, ObjectId, PolicyError, ResourceId,
	};

	fn seeded() -> MemoryStore {
		let store = MemoryStore::new();
		store.add_resource(ResourceId::new(1), "Invoice", "invoice");
		store.add_resource(ResourceId::new(2), "User", "user");
		store.add_role(RoleId::new(1), "admin", true);
		store.add_role(RoleId::new(2), "retired", false);
		store
	}

	#[tokio::test]
	async fn collects_direct_and_active_role_permissions() {
		let store = seeded();
		let subject = SubjectId::new(42);
		store.assign_role(subject, RoleId::new(1));
		store.assign_role(subject, RoleId::new(2));
		store.grant(Grantee::Subject(subject), ResourceId::new(1), Action::Create, vec![], vec![]);
		store.grant(Grantee::Role(RoleId::new(1)), ResourceId::new(1), Action::Read, vec![], vec![]);
		store.grant(Grantee::Role(RoleId::new(2)), ResourceId::new(1), Action::Delete, vec![], vec![]);
		store.grant(Grantee::Subject(SubjectId::new(7)), ResourceId::new(1), Action::Update, vec![], vec![]);

		let config = PolicyConfig::default();
		let aggregated = PermissionAggregator::new(&store, &store, &config)
			.aggregate(subject, &PermissionFilter::all())
			.await
			.unwrap();

		let mut actions: Vec<Action> = aggregated.permissions.iter().map(|p| p.action).collect();
		actions.sort();
		assert_eq!(actions, vec![Action::Create, Action::Read]);
		assert_eq!(aggregated.resources.len(), 2);
	}

	#[tokio::test]
	async fn appends_base_permissions_after_stored() {
		let store = seeded();
		let subject = SubjectId::new(42);
		store.grant(Grantee::Subject(subject), ResourceId::new(1), Action::Read, vec![], vec![]);

		let mut config = PolicyConfig::default();
		config.base_permissions.own.push(BaseGrant::new("user", Action::Update));

		let aggregated = PermissionAggregator::new(&store, &store, &config)
			.aggregate(subject, &PermissionFilter::all())
			.await
			.unwrap();

		assert_eq!(aggregated.permissions.len(), 2);
		assert_eq!(aggregated.permissions[0].origin, GrantOrigin::Stored);
		let base = &aggregated.permissions[1];
		assert!(base.is_synthetic());
		assert_eq!(base.object_filters, vec![ObjectFilter::new(ObjectId::new(42))]);
	}

	#[tokio::test]
	async fn filter_restricts_stored_and_base_grants() {
		let store = seeded();
		let subject = SubjectId::new(42);
		store.grant(Grantee::Subject(subject), ResourceId::new(1), Action::Read, vec![], vec![]);
		store.grant(Grantee::Subject(subject), ResourceId::new(2), Action::Read, vec![], vec![]);

		let mut config = PolicyConfig::default();
		config.base_permissions.global.push(BaseGrant::new("user", Action::Read));
		config.base_permissions.global.push(BaseGrant::new("invoice", Action::Update));

		let filter = PermissionFilter {
			resource: Some("user".to_string()),
			action: None,
		};
		let aggregated = PermissionAggregator::new(&store, &store, &config)
			.aggregate(subject, &filter)
			.await
			.unwrap();

		assert_eq!(aggregated.resources.len(), 1);
		assert!(aggregated
			.permissions
			.iter()
			.all(|p| p.resource_id == ResourceId::new(2)));
		assert_eq!(aggregated.permissions.len(), 2);
	}

	#[tokio::test]
	async fn unknown_base_resource_fails_resolution() {
		let store = seeded();
		let mut config = PolicyConfig::default();
		config.base_permissions.global.push(BaseGrant::new("ledger", Action::Read));

		let err = PermissionAggregator::new(&store, &store, &config)
			.aggregate(SubjectId::new(1), &PermissionFilter::all())
			.await
			.unwrap_err();
		assert!(matches!(err, PolicyError::Configuration(_)));
	}

	#[tokio::test]
	async fn store_failure_aborts_aggregation() {
		let store = seeded();
		store.fail_with("connection reset");
		let config = PolicyConfig::default();

		let err = PermissionAggregator::new(&store, &store, &config)
			.aggregate(SubjectId::new(1), &PermissionFilter::all())
			.await
			.unwrap_err();
		assert!(matches!(err, PolicyError::Store(_)));
	}
}
