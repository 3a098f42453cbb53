// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The engine's public entry point.

use std::sync::Arc;
use tracing::{debug, instrument};
use warden_policy_core::{
	authorize, build_policy, Action, Authorization, FilterExpr, PermissionFilter, PolicyConfig,
	PolicyDocument, Record, Result, SubjectId,
};

use crate::aggregate::PermissionAggregator;
use crate::evaluator;
use crate::features::{resolve_features, FeaturePolicy};
use crate::store::{GrantStore, ResourceRegistry};

/// Narrows a resolution to one resource and/or one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
	/// Resource identity.
	pub resource: Option<String>,
	pub action: Option<Action>,
}

impl ResolveOptions {
	pub fn resource(identity: impl Into<String>) -> Self {
		Self {
			resource: Some(identity.into()),
			action: None,
		}
	}

	pub fn with_action(mut self, action: Action) -> Self {
		self.action = Some(action);
		self
	}

	fn permission_filter(&self) -> PermissionFilter {
		PermissionFilter {
			resource: self.resource.clone(),
			action: self.action,
		}
	}
}

/// Resolves policies and evaluates grants for subjects.
///
/// Each call builds a fresh [`PolicyDocument`]; nothing is cached between calls.
pub struct PolicyResolver<R: ?Sized, S: ?Sized> {
	registry: Arc<R>,
	store: Arc<S>,
	config: Arc<PolicyConfig>,
}

impl<R: ?Sized, S: ?Sized> Clone for PolicyResolver<R, S> {
	fn clone(&self) -> Self {
		Self {
			registry: Arc::clone(&self.registry),
			store: Arc::clone(&self.store),
			config: Arc::clone(&self.config),
		}
	}
}

impl<R, S> PolicyResolver<R, S>
where
	R: ResourceRegistry + ?Sized,
	S: GrantStore + ?Sized,
{
	pub fn new(registry: Arc<R>, store: Arc<S>, config: PolicyConfig) -> Self {
		Self {
			registry,
			store,
			config: Arc::new(config),
		}
	}

	pub fn config(&self) -> &PolicyConfig {
		&self.config
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	/// Aggregates the subject's grants into a policy document.
	#[instrument(skip(self, options), fields(subject_id = %subject, resource = ?options.resource, action = ?options.action))]
	pub async fn resolve_policy(
		&self,
		subject: SubjectId,
		options: &ResolveOptions,
	) -> Result<PolicyDocument> {
		let aggregated = PermissionAggregator::new(&*self.registry, &*self.store, &self.config)
			.aggregate(subject, &options.permission_filter())
			.await?;

		let policy = build_policy(&aggregated.resources, &aggregated.permissions);
		debug!(resources = policy.len(), "resolved policy");
		Ok(policy)
	}

	pub fn authorize(
		&self,
		policy: &PolicyDocument,
		resource: &str,
		action: Action,
	) -> Result<Authorization> {
		authorize(policy, resource, action)
	}

	pub async fn query_with_grant(
		&self,
		policy: &PolicyDocument,
		resource: &str,
		action: Action,
		caller_filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>> {
		evaluator::query_with_grant(&*self.store, policy, resource, action, caller_filter).await
	}

	pub async fn grant_find(
		&self,
		policy: &PolicyDocument,
		resource: &str,
		caller_filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>> {
		evaluator::grant_find(&*self.store, policy, resource, caller_filter).await
	}

	pub async fn grant_find_white_list(
		&self,
		policy: &PolicyDocument,
		resource: &str,
	) -> Result<Vec<Record>> {
		evaluator::grant_find_white_list(&*self.store, policy, resource).await
	}

	pub async fn resolve_features(&self, subject: SubjectId) -> Result<FeaturePolicy> {
		resolve_features(&*self.store, subject).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryStore;
	use warden_policy_core::{Grantee, ResourceId, RoleId};

	fn resolver() -> (Arc<MemoryStore>, PolicyResolver<MemoryStore, MemoryStore>) {
		let store = Arc::new(MemoryStore::new());
		store.add_resource(ResourceId::new(1), "Invoice", "invoice");
		store.add_resource(ResourceId::new(2), "Customer", "customer");
		let resolver = PolicyResolver::new(store.clone(), store.clone(), PolicyConfig::default());
		(store, resolver)
	}

	#[tokio::test]
	async fn every_known_resource_is_present() {
		let (_, resolver) = resolver();
		let policy = resolver
			.resolve_policy(SubjectId::new(1), &ResolveOptions::default())
			.await
			.unwrap();
		assert!(policy.contains("invoice"));
		assert!(policy.contains("customer"));
		for (_, entry) in policy.iter() {
			assert_eq!(entry.actions.len(), 4);
		}
	}

	#[tokio::test]
	async fn resource_option_limits_document() {
		let (store, resolver) = resolver();
		let subject = SubjectId::new(1);
		store.add_role(RoleId::new(1), "admin", true);
		store.assign_role(subject, RoleId::new(1));
		store.grant(Grantee::Role(RoleId::new(1)), ResourceId::new(1), Action::Read, vec![], vec![]);
		store.grant(Grantee::Role(RoleId::new(1)), ResourceId::new(2), Action::Read, vec![], vec![]);

		let policy = resolver
			.resolve_policy(subject, &ResolveOptions::resource("customer"))
			.await
			.unwrap();
		assert_eq!(policy.len(), 1);
		assert_eq!(policy.get("customer").unwrap().is_allowed(Action::Read), Some(true));
	}

	#[tokio::test]
	async fn action_option_limits_grants() {
		let (store, resolver) = resolver();
		let subject = SubjectId::new(1);
		store.grant(Grantee::Subject(subject), ResourceId::new(1), Action::Read, vec![], vec![]);
		store.grant(Grantee::Subject(subject), ResourceId::new(1), Action::Update, vec![], vec![]);

		let policy = resolver
			.resolve_policy(subject, &ResolveOptions::resource("invoice").with_action(Action::Update))
			.await
			.unwrap();
		let entry = policy.get("invoice").unwrap();
		assert_eq!(entry.is_allowed(Action::Update), Some(true));
		assert_eq!(entry.is_allowed(Action::Read), Some(false));
	}

	#[test]
	fn resolver_is_cheap_to_clone() {
		let (store, resolver) = resolver();
		let cloned = resolver.clone();
		assert_eq!(Arc::strong_count(&store), 5);
		drop(cloned);
		assert_eq!(Arc::strong_count(&store), 3);
	}
}
