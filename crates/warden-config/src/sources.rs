// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};
use warden_policy_core::BasePermissions;

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{DatabaseConfigLayer, LoggingConfigLayer, PolicyConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/warden.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WARDEN_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()),
			logging: Some(load_logging_from_env()),
			policy: Some(load_policy_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_json<T: serde::de::DeserializeOwned>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => serde_json::from_str(&v)
			.map(Some)
			.map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid JSON: {e}"),
			}),
		None => Ok(None),
	}
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("WARDEN_DATABASE_URL"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("WARDEN_LOG_LEVEL"),
	}
}

fn load_policy_from_env() -> Result<PolicyConfigLayer, ConfigError> {
	Ok(PolicyConfigLayer {
		default_roles: None,
		default_role: env_var("WARDEN_POLICY_DEFAULT_ROLE"),
		base_permissions: env_json::<BasePermissions>("WARDEN_POLICY_BASE_PERMISSIONS")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.database.is_none());
		assert!(layer.policy.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/warden.toml").load().unwrap();
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/tmp/warden-test.db"

[policy]
default_role = "public"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/tmp/warden-test.db")
		);
		assert_eq!(layer.policy.unwrap().default_role.as_deref(), Some("public"));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[database\nurl = 1").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_json_rejects_garbage() {
		std::env::set_var("WARDEN_TEST_BASE_PERMISSIONS_GARBAGE", "{not json");
		let result = env_json::<BasePermissions>("WARDEN_TEST_BASE_PERMISSIONS_GARBAGE");
		std::env::remove_var("WARDEN_TEST_BASE_PERMISSIONS_GARBAGE");
		assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
	}

	#[test]
	fn test_env_json_parses_base_permissions() {
		std::env::set_var(
			"WARDEN_TEST_BASE_PERMISSIONS_OK",
			r#"{"self":[{"resource":"profile","action":"read"}]}"#,
		);
		let result = env_json::<BasePermissions>("WARDEN_TEST_BASE_PERMISSIONS_OK");
		std::env::remove_var("WARDEN_TEST_BASE_PERMISSIONS_OK");
		let base = result.unwrap().unwrap();
		assert_eq!(base.own.len(), 1);
		assert!(base.global.is_empty());
	}
}
