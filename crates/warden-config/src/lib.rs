// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Warden.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (`/etc/warden/warden.toml`, or an explicit path)
//! 3. Environment variables (`WARDEN_*`)
//!
//! ```ignore
//! let config = warden_config::load_config()?;
//! println!("database: {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub policy: PolicyConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path in place of the system file.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge `sources` in precedence order and finalize.
pub fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let policy = layer.policy.unwrap_or_default().finalize();

	database.validate()?;
	validate_config(&policy)?;

	info!(
		database = %database.url,
		log_level = %logging.level,
		default_role = policy.default_role.as_deref().unwrap_or("-"),
		self_grants = policy.base_permissions.own.len(),
		global_grants = policy.base_permissions.global.len(),
		"Warden configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		policy,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(policy: &PolicyConfig) -> Result<(), ConfigError> {
	if let Some(role) = policy.default_role.as_deref() {
		if !policy.enabled_default_roles().any(|enabled| enabled == role) {
			return Err(ConfigError::Validation(format!(
				"default role '{role}' is not an enabled default role"
			)));
		}
	}

	for grant in policy
		.base_permissions
		.own
		.iter()
		.chain(&policy.base_permissions.global)
	{
		if grant.resource.trim().is_empty() {
			return Err(ConfigError::Validation(
				"base permission with an empty resource".to_string(),
			));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	struct FixedSource(Precedence, &'static str);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok(ServerConfigLayer {
				database: Some(DatabaseConfigLayer {
					url: Some(self.1.to_string()),
				}),
				..Default::default()
			})
		}
	}

	#[test]
	fn test_defaults() {
		let config = load_from(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.database.url, "sqlite:./warden.db");
		assert_eq!(config.logging.level, "info");
		assert_eq!(config.policy, PolicyConfig::default());
	}

	#[test]
	fn test_precedence_wins_regardless_of_order() {
		let config = load_from(vec![
			Box::new(FixedSource(Precedence::Environment, "sqlite:env.db")),
			Box::new(FixedSource(Precedence::ConfigFile, "sqlite:file.db")),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:env.db");
	}

	#[test]
	fn test_file_overrides_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[logging]
level = "warden=debug"

[[policy.base_permissions.self]]
resource = "profile"
action = "read"
"#
		)
		.unwrap();

		let config = load_from(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		])
		.unwrap();
		assert_eq!(config.logging.level, "warden=debug");
		assert_eq!(config.policy.base_permissions.own.len(), 1);
	}

	#[test]
	fn test_non_sqlite_database_is_rejected() {
		let err = load_from(vec![
			Box::new(DefaultsSource),
			Box::new(FixedSource(Precedence::ConfigFile, "mysql://db/warden")),
		])
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn test_disabled_default_role_fails_validation() {
		let mut policy = PolicyConfig::default();
		policy.default_roles.insert("registered".to_string(), false);
		assert!(matches!(
			validate_config(&policy),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_unknown_default_role_fails_validation() {
		let policy = PolicyConfig {
			default_role: Some("superuser".to_string()),
			..Default::default()
		};
		assert!(validate_config(&policy).is_err());
	}

	#[test]
	fn test_no_default_role_is_valid() {
		let policy = PolicyConfig {
			default_role: None,
			..Default::default()
		};
		assert!(validate_config(&policy).is_ok());
	}

	#[test]
	fn test_empty_base_resource_fails_validation() {
		let mut policy = PolicyConfig::default();
		policy
			.base_permissions
			.global
			.push(BaseGrant::new(" ", warden_policy_core::Action::Read));
		assert!(validate_config(&policy).is_err());
	}
}
