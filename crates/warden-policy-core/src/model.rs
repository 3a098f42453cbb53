// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Records read from the grant store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{FilterError, FilterExpr};
use crate::types::{Action, FeatureId, ObjectId, PermissionId, ResourceId, RoleId, SubjectId};

/// Field that object filters compare against.
pub const OBJECT_ID_FIELD: &str = "id";

/// Feature context assigned when none is recorded.
pub const DEFAULT_FEATURE_CONTEXT: &str = "default";

// =============================================================================
// Registry Records
// =============================================================================

/// A typed resource (model) that permissions are granted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
	pub id: ResourceId,
	pub name: String,
	pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
	pub id: RoleId,
	pub name: String,
	pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
	pub id: SubjectId,
	pub username: Option<String>,
}

/// Tag-style capability, independent of resources and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
	pub id: FeatureId,
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub identity: String,
	#[serde(default = "default_context")]
	pub context: String,
	pub active: bool,
}

fn default_context() -> String {
	DEFAULT_FEATURE_CONTEXT.to_string()
}

/// Entry of a feature policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGrant {
	pub id: FeatureId,
	pub name: String,
	pub identity: String,
}

impl From<&Feature> for FeatureGrant {
	fn from(feature: &Feature) -> Self {
		Self {
			id: feature.id,
			name: feature.name.clone(),
			identity: feature.identity.clone(),
		}
	}
}

// =============================================================================
// Permissions
// =============================================================================

/// The single holder of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "relation", content = "id")]
pub enum Grantee {
	#[serde(rename = "user")]
	Subject(SubjectId),
	#[serde(rename = "role")]
	Role(RoleId),
}

impl Grantee {
	/// The stored relation name, `user` or `role`.
	pub fn relation(&self) -> &'static str {
		match self {
			Grantee::Subject(_) => "user",
			Grantee::Role(_) => "role",
		}
	}
}

/// Which base permission list a synthetic grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseScope {
	/// Applies to the subject's own record only.
	#[serde(rename = "self")]
	Own,
	Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOrigin {
	Stored,
	Base(BaseScope),
}

/// Grants one action on one resource to one holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
	/// `None` for synthetic permissions materialized from configuration.
	pub id: Option<PermissionId>,
	pub resource_id: ResourceId,
	pub action: Action,
	pub holder: Grantee,
	#[serde(default)]
	pub criteria: Vec<Criteria>,
	#[serde(default)]
	pub object_filters: Vec<ObjectFilter>,
	pub origin: GrantOrigin,
}

impl Permission {
	pub fn is_synthetic(&self) -> bool {
		matches!(self.origin, GrantOrigin::Base(_))
	}
}

/// Row-predicate restriction attached to a permission.
///
/// Serializes as a where clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Criteria(FilterExpr);

impl Criteria {
	pub fn new(expr: FilterExpr) -> Self {
		Self(expr)
	}

	pub fn from_where(clause: &Value) -> Result<Self, FilterError> {
		FilterExpr::from_where(clause).map(Self)
	}

	pub fn expr(&self) -> &FilterExpr {
		&self.0
	}

	pub fn into_expr(self) -> FilterExpr {
		self.0
	}
}

impl TryFrom<Value> for Criteria {
	type Error = FilterError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		Self::from_where(&value)
	}
}

impl From<Criteria> for Value {
	fn from(criteria: Criteria) -> Self {
		criteria.0.to_where()
	}
}

/// A single allowed object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFilter {
	pub object_id: ObjectId,
}

impl ObjectFilter {
	pub fn new(object_id: impl Into<ObjectId>) -> Self {
		Self {
			object_id: object_id.into(),
		}
	}

	/// The `id = object_id` predicate this filter stands for.
	pub fn to_expr(&self) -> FilterExpr {
		FilterExpr::eq(OBJECT_ID_FIELD, self.object_id.get())
	}
}
