// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant checks and the criteria compiler.
//!
//! A grant check looks up one (resource, action) pair in a [`PolicyDocument`] and
//! classifies it:
//!
//! - **Denied**: the action is not granted
//! - **Unrestricted**: granted with no criteria and no object filters
//! - **Restricted**: granted, narrowed by criteria and/or object filters
//!
//! Restricted grants compile to a [`FilterExpr`]. Criteria OR together, object
//! filters OR together as `id = n` predicates, and the two groups AND together
//! when both are present. Groups of one are emitted without a wrapper node.
//! An empty where clause among the criteria matches everything, so it lifts the
//! criteria group entirely.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{PolicyError, Result};
use crate::filter::FilterExpr;
use crate::model::{Criteria, ObjectFilter};
use crate::policy::PolicyDocument;
use crate::types::Action;

/// Raw restrictions of a granted action, borrowed from the policy document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions<'p> {
	pub criteria: &'p [Criteria],
	pub object_filters: &'p [ObjectFilter],
}

impl Conditions<'_> {
	pub fn is_empty(&self) -> bool {
		self.criteria.is_empty() && self.object_filters.is_empty()
	}

	/// True when one criterion is an empty where clause. Criteria OR together,
	/// so the whole criteria group then matches every record.
	fn criteria_match_all(&self) -> bool {
		self.criteria.iter().any(|c| c.expr().is_match_all())
	}

	/// True when the conditions exclude no record.
	pub fn is_unrestricted(&self) -> bool {
		self.object_filters.is_empty() && (self.criteria.is_empty() || self.criteria_match_all())
	}

	/// Compiles the restrictions into one filter expression.
	pub fn compile(&self) -> FilterExpr {
		let criteria = if self.criteria_match_all() {
			None
		} else {
			FilterExpr::any(self.criteria.iter().map(|c| c.expr().clone()).collect())
		};
		let objects = FilterExpr::any(self.object_filters.iter().map(ObjectFilter::to_expr).collect());

		match (criteria, objects) {
			(Some(criteria), Some(objects)) => FilterExpr::AllOf(vec![criteria, objects]),
			(Some(only), None) | (None, Some(only)) => only,
			(None, None) => FilterExpr::match_all(),
		}
	}
}

/// Outcome of [`grant_check`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrantCheck<'p> {
	Denied,
	Unrestricted,
	Restricted(Conditions<'p>),
}

impl GrantCheck<'_> {
	pub fn is_allowed(&self) -> bool {
		!matches!(self, GrantCheck::Denied)
	}

	pub fn compile(&self) -> Compiled {
		match self {
			GrantCheck::Denied => Compiled::Denied,
			GrantCheck::Unrestricted => Compiled::Unrestricted,
			GrantCheck::Restricted(conditions) => Compiled::Restricted(conditions.compile()),
		}
	}
}

/// A grant check with restrictions compiled to a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
	Denied,
	Unrestricted,
	Restricted(FilterExpr),
}

/// Filter for a read lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FindCriteria {
	/// The subject may not read the resource; the lookup yields no rows.
	Nothing,
	/// The subject may read every record.
	Everything,
	Matching(FilterExpr),
}

impl FindCriteria {
	/// The filter to hand to a store, `None` when nothing may be returned.
	pub fn into_filter(self) -> Option<FilterExpr> {
		match self {
			FindCriteria::Nothing => None,
			FindCriteria::Everything => Some(FilterExpr::match_all()),
			FindCriteria::Matching(expr) => Some(expr),
		}
	}
}

/// Answer to "may this subject do this, and under which restriction".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authorization {
	pub allowed: bool,
	pub restriction: Option<FilterExpr>,
}

/// Checks one (resource, action) pair.
///
/// Unknown resources and missing action keys are errors, never denials.
#[instrument(level = "debug", skip(policy), fields(resource = %resource, action = %action))]
pub fn grant_check<'p>(
	policy: &'p PolicyDocument,
	resource: &str,
	action: Action,
) -> Result<GrantCheck<'p>> {
	let entry = policy
		.get(resource)
		.ok_or_else(|| PolicyError::UnknownResource(resource.to_string()))?;

	let allowed = entry
		.is_allowed(action)
		.ok_or_else(|| PolicyError::UnknownAction {
			resource: resource.to_string(),
			action,
		})?;

	if !allowed {
		debug!("grant denied");
		return Ok(GrantCheck::Denied);
	}

	let conditions = Conditions {
		criteria: entry.criteria_for(action),
		object_filters: entry.object_filters_for(action),
	};

	if conditions.is_unrestricted() {
		debug!("grant unrestricted");
		Ok(GrantCheck::Unrestricted)
	} else {
		debug!(
			criteria = conditions.criteria.len(),
			object_filters = conditions.object_filters.len(),
			"grant restricted"
		);
		Ok(GrantCheck::Restricted(conditions))
	}
}

/// Checks one (resource, action) pair and compiles its restrictions.
pub fn compile_grant(policy: &PolicyDocument, resource: &str, action: Action) -> Result<Compiled> {
	grant_check(policy, resource, action).map(|check| check.compile())
}

/// Filter for reading `resource`.
pub fn grant_find_criteria(policy: &PolicyDocument, resource: &str) -> Result<FindCriteria> {
	Ok(match compile_grant(policy, resource, Action::Read)? {
		Compiled::Denied => FindCriteria::Nothing,
		Compiled::Unrestricted => FindCriteria::Everything,
		Compiled::Restricted(expr) => FindCriteria::Matching(expr),
	})
}

pub fn authorize(policy: &PolicyDocument, resource: &str, action: Action) -> Result<Authorization> {
	Ok(match compile_grant(policy, resource, action)? {
		Compiled::Denied => Authorization {
			allowed: false,
			restriction: None,
		},
		Compiled::Unrestricted => Authorization {
			allowed: true,
			restriction: None,
		},
		Compiled::Restricted(expr) => Authorization {
			allowed: true,
			restriction: Some(expr),
		},
	})
}
