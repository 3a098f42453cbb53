// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as read from a single source.

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, LoggingConfigLayer, PolicyConfigLayer};

/// One source's view of the configuration. Absent sections are `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub policy: Option<PolicyConfigLayer>,
}

impl ServerConfigLayer {
	/// Overlays `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.policy, other.policy, PolicyConfigLayer::merge);
	}
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *target = Some(incoming),
		(_, None) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn database_layer(url: Option<String>) -> ServerConfigLayer {
		ServerConfigLayer {
			database: Some(DatabaseConfigLayer { url }),
			..Default::default()
		}
	}

	proptest! {
		#[test]
		fn last_set_value_wins(urls in prop::collection::vec(prop::option::of("[a-z]{1,8}"), 0..6)) {
			let mut merged = ServerConfigLayer::default();
			for url in urls.clone() {
				merged.merge(database_layer(url));
			}
			let expected = urls.into_iter().flatten().last();
			prop_assert_eq!(merged.database.and_then(|d| d.url), expected);
		}
	}

	#[test]
	fn later_layer_overrides_set_fields_only() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite:/var/lib/warden/a.db"

			[logging]
			level = "debug"
			"#,
		)
		.unwrap();
		let top: ServerConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite:/var/lib/warden/b.db"
			"#,
		)
		.unwrap();

		base.merge(top);
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite:/var/lib/warden/b.db")
		);
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn missing_section_is_filled_from_other() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			policy: Some(PolicyConfigLayer {
				default_role: Some("public".to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(
			base.policy.unwrap().default_role.as_deref(),
			Some("public")
		);
	}
}
