// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory grant store.
//!
//! Implements [`ResourceRegistry`] and [`GrantStore`] over plain collections,
//! evaluating filters with [`FilterExpr::matches`]. Useful for tests and for
//! embedding the engine where grants are defined in code.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::instrument;
use warden_policy_core::{
	Action, Criteria, Feature, FeatureId, FilterExpr, GrantOrigin, Grantee, ObjectFilter, ObjectId,
	Permission, PermissionFilter, PermissionId, Record, Resource, ResourceId, Role, RoleId,
	StoreError, SubjectId,
};

use crate::store::{GrantStore, Populate, ResourceQuery, ResourceRegistry};

#[derive(Debug, Default)]
struct State {
	resources: Vec<Resource>,
	roles: Vec<Role>,
	subject_roles: Vec<(SubjectId, RoleId)>,
	permissions: Vec<Permission>,
	features: Vec<Feature>,
	feature_grants: Vec<(Grantee, FeatureId)>,
	records: HashMap<String, Vec<Record>>,
	failure: Option<String>,
}

impl State {
	fn check_failure(&self) -> Result<(), StoreError> {
		match &self.failure {
			Some(message) => Err(StoreError::backend(io::Error::new(
				io::ErrorKind::Other,
				message.clone(),
			))),
			None => Ok(()),
		}
	}

	fn identity_of(&self, id: ResourceId) -> Option<&str> {
		self.resources
			.iter()
			.find(|r| r.id == id)
			.map(|r| r.identity.as_str())
	}
}

fn holds(holder: &Grantee, subject: SubjectId, roles: &[RoleId]) -> bool {
	match holder {
		Grantee::Subject(id) => *id == subject,
		Grantee::Role(id) => roles.contains(id),
	}
}

#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<State>,
	queries: AtomicUsize,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn add_resource(&self, id: ResourceId, name: &str, identity: &str) {
		self.state().resources.push(Resource {
			id,
			name: name.to_string(),
			identity: identity.to_string(),
		});
	}

	pub fn add_role(&self, id: RoleId, name: &str, active: bool) {
		self.state().roles.push(Role {
			id,
			name: name.to_string(),
			active,
		});
	}

	pub fn assign_role(&self, subject: SubjectId, role: RoleId) {
		self.state().subject_roles.push((subject, role));
	}

	/// Stores a permission and returns its id.
	pub fn grant(
		&self,
		holder: Grantee,
		resource_id: ResourceId,
		action: Action,
		criteria: Vec<Criteria>,
		object_ids: Vec<ObjectId>,
	) -> PermissionId {
		let mut state = self.state();
		let id = PermissionId::new(state.permissions.len() as i64 + 1);
		state.permissions.push(Permission {
			id: Some(id),
			resource_id,
			action,
			holder,
			criteria,
			object_filters: object_ids.into_iter().map(ObjectFilter::new).collect(),
			origin: GrantOrigin::Stored,
		});
		id
	}

	pub fn add_feature(&self, feature: Feature) {
		self.state().features.push(feature);
	}

	pub fn grant_feature(&self, holder: Grantee, feature: FeatureId) {
		self.state().feature_grants.push((holder, feature));
	}

	pub fn insert_record(&self, resource: &str, record: Record) {
		self.state()
			.records
			.entry(resource.to_string())
			.or_default()
			.push(record);
	}

	/// Makes every subsequent store call fail with `message`.
	pub fn fail_with(&self, message: &str) {
		self.state().failure = Some(message.to_string());
	}

	/// Number of record queries served so far.
	pub fn query_count(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ResourceRegistry for MemoryStore {
	async fn list(&self, query: &ResourceQuery) -> Result<Vec<Resource>, StoreError> {
		let state = self.state();
		state.check_failure()?;
		Ok(state
			.resources
			.iter()
			.filter(|r| query.admits(r))
			.cloned()
			.collect())
	}
}

#[async_trait]
impl GrantStore for MemoryStore {
	#[instrument(skip(self, roles, filter), fields(subject_id = %subject, roles = roles.len()))]
	async fn find_permissions_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		filter: &PermissionFilter,
		populate: Populate,
	) -> Result<Vec<Permission>, StoreError> {
		let state = self.state();
		state.check_failure()?;

		let mut found = Vec::new();
		for permission in &state.permissions {
			if !holds(&permission.holder, subject, roles) {
				continue;
			}
			let Some(identity) = state.identity_of(permission.resource_id) else {
				continue;
			};
			if !filter.admits(identity, permission.action) {
				continue;
			}
			let mut permission = permission.clone();
			if !populate.criteria {
				permission.criteria.clear();
			}
			if !populate.object_filters {
				permission.object_filters.clear();
			}
			found.push(permission);
		}
		Ok(found)
	}

	async fn find_subject_roles(
		&self,
		subject: SubjectId,
		active_only: bool,
	) -> Result<Vec<Role>, StoreError> {
		let state = self.state();
		state.check_failure()?;
		Ok(state
			.subject_roles
			.iter()
			.filter(|(s, _)| *s == subject)
			.filter_map(|(_, role_id)| state.roles.iter().find(|r| r.id == *role_id))
			.filter(|role| !active_only || role.active)
			.cloned()
			.collect())
	}

	async fn find_features_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		active_only: bool,
	) -> Result<Vec<Feature>, StoreError> {
		let state = self.state();
		state.check_failure()?;
		Ok(state
			.feature_grants
			.iter()
			.filter(|(holder, _)| holds(holder, subject, roles))
			.filter_map(|(_, feature_id)| state.features.iter().find(|f| f.id == *feature_id))
			.filter(|feature| !active_only || feature.active)
			.cloned()
			.collect())
	}

	#[instrument(skip(self, filter), fields(resource = %resource))]
	async fn query(
		&self,
		resource: &str,
		filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>, StoreError> {
		self.queries.fetch_add(1, Ordering::SeqCst);
		let state = self.state();
		state.check_failure()?;

		if !state.resources.iter().any(|r| r.identity == resource) {
			return Err(StoreError::UnknownResource(resource.to_string()));
		}

		Ok(state
			.records
			.get(resource)
			.map(|records| {
				records
					.iter()
					.filter(|record| filter.map_or(true, |f| f.matches(record)))
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}
}
