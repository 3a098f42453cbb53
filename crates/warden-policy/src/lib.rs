// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy resolution engine for Warden.
//!
//! Given a subject, the engine aggregates its direct, role-derived and base
//! grants into a [`PolicyDocument`], then turns that document into filter
//! expressions that narrow record lookups to what the subject may see.
//!
//! # Architecture
//!
//! - [`store`]: the [`ResourceRegistry`] and [`GrantStore`] boundaries
//! - [`aggregate`]: collects applicable permissions
//! - [`resolver`]: [`PolicyResolver`], the public entry point
//! - [`evaluator`]: grant-filtered lookups
//! - [`features`]: feature resolution
//! - [`memory`]: an in-memory store
//! - [`boundary`]: generic forbidden responses for the HTTP layer

pub mod aggregate;
pub mod boundary;
pub mod evaluator;
pub mod features;
pub mod memory;
pub mod resolver;
pub mod store;

pub use aggregate::{Aggregated, PermissionAggregator};
pub use evaluator::{grant_find, grant_find_white_list, query_with_grant};
pub use features::{resolve_features, FeaturePolicy};
pub use memory::MemoryStore;
pub use resolver::{PolicyResolver, ResolveOptions};
pub use store::{GrantStore, Populate, ResourceQuery, ResourceRegistry};

pub use warden_policy_core::{
	Action, Authorization, FilterExpr, PolicyConfig, PolicyDocument, PolicyError, Record, Result,
	StoreError, SubjectId,
};
