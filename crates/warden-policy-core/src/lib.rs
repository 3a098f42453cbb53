// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types and pure computation for Warden access policies.
//!
//! This crate has no I/O. It defines the records a grant store hands back, the
//! [`FilterExpr`] language restrictions are expressed in, the [`PolicyDocument`]
//! aggregated per subject, and the grant checks evaluated against it.
//!
//! ```
//! use warden_policy_core::{build_policy, grant_check, Action, GrantCheck, Resource, ResourceId};
//!
//! let invoice = Resource {
//! 	id: ResourceId::new(1),
//! 	name: "Invoice".to_string(),
//! 	identity: "invoice".to_string(),
//! };
//! let policy = build_policy(&[invoice], &[]);
//! assert_eq!(grant_check(&policy, "invoice", Action::Read).unwrap(), GrantCheck::Denied);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod grant;
pub mod model;
pub mod policy;
pub mod types;

pub use config::{BaseGrant, BasePermissions, PermissionFilter, PolicyConfig};
pub use error::{PolicyError, Result, StoreError};
pub use filter::{FilterError, FilterExpr, Operator, Predicate, Record};
pub use grant::{
	authorize, compile_grant, grant_check, grant_find_criteria, Authorization, Compiled, Conditions,
	FindCriteria, GrantCheck,
};
pub use model::{
	BaseScope, Criteria, Feature, FeatureGrant, GrantOrigin, Grantee, ObjectFilter, Permission,
	Resource, Role, Subject, DEFAULT_FEATURE_CONTEXT, OBJECT_ID_FIELD,
};
pub use policy::{build_policy, PolicyBuilder, PolicyDocument, ResourcePolicy};
pub use types::{
	Action, FeatureId, ObjectId, ParseActionError, PermissionId, ResourceId, RoleId, SubjectId,
};
