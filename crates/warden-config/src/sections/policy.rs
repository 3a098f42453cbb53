// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy configuration: default roles and base permissions.

use std::collections::BTreeMap;

use serde::Deserialize;
use warden_policy_core::{BasePermissions, PolicyConfig};

/// Policy configuration layer (partial, for merging).
///
/// `default_roles` merge per role name. `base_permissions` is replaced as a
/// whole by the higher-precedence source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfigLayer {
	#[serde(default)]
	pub default_roles: Option<BTreeMap<String, bool>>,
	#[serde(default)]
	pub default_role: Option<String>,
	#[serde(default)]
	pub base_permissions: Option<BasePermissions>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: PolicyConfigLayer) {
		if let Some(roles) = other.default_roles {
			self.default_roles
				.get_or_insert_with(BTreeMap::new)
				.extend(roles);
		}
		if other.default_role.is_some() {
			self.default_role = other.default_role;
		}
		if other.base_permissions.is_some() {
			self.base_permissions = other.base_permissions;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		let mut config = PolicyConfig::default();
		if let Some(roles) = self.default_roles {
			config.default_roles.extend(roles);
		}
		if self.default_role.is_some() {
			config.default_role = self.default_role;
		}
		if let Some(base) = self.base_permissions {
			config.base_permissions = base;
		}
		config
	}
}
