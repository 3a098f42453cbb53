// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature resolution: tag-style capabilities granted to a subject directly or
//! through its active roles.

use std::collections::BTreeMap;
use tracing::{debug, instrument};
use warden_policy_core::{FeatureGrant, Result, RoleId, SubjectId};

use crate::store::GrantStore;

/// Features held by a subject, keyed by feature identity.
pub type FeaturePolicy = BTreeMap<String, FeatureGrant>;

/// Resolves the features of `subject`.
///
/// Inactive features and features reachable only through inactive roles are
/// excluded. Features granted more than once appear once.
#[instrument(skip(store), fields(subject_id = %subject))]
pub async fn resolve_features<S>(store: &S, subject: SubjectId) -> Result<FeaturePolicy>
where
	S: GrantStore + ?Sized,
{
	let roles = store.find_subject_roles(subject, true).await?;
	let role_ids: Vec<RoleId> = roles
		.iter()
		.filter(|role| role.active)
		.map(|role| role.id)
		.collect();

	let features = store.find_features_for(subject, &role_ids, true).await?;

	let mut policy = FeaturePolicy::new();
	for feature in features.iter().filter(|f| f.active) {
		policy
			.entry(feature.identity.clone())
			.or_insert_with(|| FeatureGrant::from(feature));
	}

	debug!(features = policy.len(), "resolved features");
	Ok(policy)
}
