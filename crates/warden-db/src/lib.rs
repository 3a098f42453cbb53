// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Warden grants.
//!
//! - [`pool`]: connection pool creation
//! - [`schema`]: table migrations
//! - [`store`]: [`SqliteGrantStore`], the registry and grant store
//! - [`sql`]: rendering of filter expressions to `WHERE` clauses

pub mod error;
pub mod pool;
pub mod schema;
pub mod sql;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DbError, Result};
pub use pool::create_pool;
pub use schema::run_migrations;
pub use sql::{quote_identifier, render, SqlFilter, SqlValue};
pub use store::SqliteGrantStore;
