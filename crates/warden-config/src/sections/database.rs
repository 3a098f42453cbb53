// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_URL: &str = "sqlite:./warden.db";

/// Grant database location. Only SQLite URLs are accepted; any other scheme
/// would be opened as a file name.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl DatabaseConfig {
	pub fn is_in_memory(&self) -> bool {
		self.url.contains(":memory:") || self.url.contains("mode=memory")
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.url.starts_with("sqlite:") {
			return Err(ConfigError::InvalidValue {
				key: "database.url".to_string(),
				message: format!("expected a sqlite: URL, got '{}'", self.url),
			});
		}
		Ok(())
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
		}
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
		}
	}
}
