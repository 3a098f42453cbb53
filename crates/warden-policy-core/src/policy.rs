// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy documents and the builder that assembles them from aggregated grants.
//!
//! A [`PolicyDocument`] maps resource identity to a [`ResourcePolicy`] holding
//! per-action flags, criteria, and object filters. Every resource handed to the
//! builder appears in the document with all four actions present, even when no
//! permission mentions it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{instrument, warn};

use crate::model::{Criteria, ObjectFilter, Permission, Resource};
use crate::types::{Action, ObjectId, ResourceId};

/// Policy entry for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePolicy {
	pub id: ResourceId,
	pub name: String,
	pub identity: String,
	pub actions: BTreeMap<Action, bool>,
	pub criteria: BTreeMap<Action, Vec<Criteria>>,
	pub object_filters: BTreeMap<Action, Vec<ObjectFilter>>,
}

impl ResourcePolicy {
	/// An entry with every action denied.
	pub fn empty(resource: &Resource) -> Self {
		let mut actions = BTreeMap::new();
		let mut criteria = BTreeMap::new();
		let mut object_filters = BTreeMap::new();
		for action in Action::all() {
			actions.insert(*action, false);
			criteria.insert(*action, Vec::new());
			object_filters.insert(*action, Vec::new());
		}
		Self {
			id: resource.id,
			name: resource.name.clone(),
			identity: resource.identity.clone(),
			actions,
			criteria,
			object_filters,
		}
	}

	/// Whether `action` is granted. `None` when the entry lacks the action key.
	pub fn is_allowed(&self, action: Action) -> Option<bool> {
		self.actions.get(&action).copied()
	}

	pub fn criteria_for(&self, action: Action) -> &[Criteria] {
		self.criteria.get(&action).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn object_filters_for(&self, action: Action) -> &[ObjectFilter] {
		self.object_filters
			.get(&action)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}
}

/// Aggregated access policy of one subject, keyed by resource identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(BTreeMap<String, ResourcePolicy>);

impl PolicyDocument {
	pub fn get(&self, identity: &str) -> Option<&ResourcePolicy> {
		self.0.get(identity)
	}

	pub fn contains(&self, identity: &str) -> bool {
		self.0.contains_key(identity)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourcePolicy)> {
		self.0.iter()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromIterator<ResourcePolicy> for PolicyDocument {
	fn from_iter<I: IntoIterator<Item = ResourcePolicy>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|entry| (entry.identity.clone(), entry))
				.collect(),
		)
	}
}

/// Shapes aggregated permissions into a [`PolicyDocument`].
///
/// Permissions are folded in the order given; criteria keep first-seen order and
/// object filters are kept once per (resource, action, object id).
#[derive(Debug)]
pub struct PolicyBuilder {
	entries: BTreeMap<String, ResourcePolicy>,
	identities: HashMap<ResourceId, String>,
	seen_objects: HashSet<(ResourceId, Action, ObjectId)>,
}

impl PolicyBuilder {
	pub fn new(resources: &[Resource]) -> Self {
		let mut entries = BTreeMap::new();
		let mut identities = HashMap::with_capacity(resources.len());
		for resource in resources {
			identities.insert(resource.id, resource.identity.clone());
			entries.insert(resource.identity.clone(), ResourcePolicy::empty(resource));
		}
		Self {
			entries,
			identities,
			seen_objects: HashSet::new(),
		}
	}

	/// Folds one permission into the document.
	///
	/// Permissions on resources the builder was not given are skipped.
	pub fn add(&mut self, permission: &Permission) -> &mut Self {
		let Some(entry) = self
			.identities
			.get(&permission.resource_id)
			.and_then(|identity| self.entries.get_mut(identity))
		else {
			warn!(
				resource_id = %permission.resource_id,
				action = %permission.action,
				permission_id = ?permission.id,
				"skipping permission on unregistered resource"
			);
			return self;
		};

		let action = permission.action;
		entry.actions.insert(action, true);
		entry
			.criteria
			.entry(action)
			.or_default()
			.extend(permission.criteria.iter().cloned());

		let filters = entry.object_filters.entry(action).or_default();
		for filter in &permission.object_filters {
			if self
				.seen_objects
				.insert((permission.resource_id, action, filter.object_id))
			{
				filters.push(*filter);
			}
		}
		self
	}

	pub fn extend<'a, I>(&mut self, permissions: I) -> &mut Self
	where
		I: IntoIterator<Item = &'a Permission>,
	{
		for permission in permissions {
			self.add(permission);
		}
		self
	}

	pub fn build(self) -> PolicyDocument {
		PolicyDocument(self.entries)
	}
}

/// Builds the policy document for `resources` from aggregated `permissions`.
#[instrument(level = "debug", skip_all, fields(resources = resources.len(), permissions = permissions.len()))]
pub fn build_policy(resources: &[Resource], permissions: &[Permission]) -> PolicyDocument {
	let mut builder = PolicyBuilder::new(resources);
	builder.extend(permissions);
	builder.build()
}
