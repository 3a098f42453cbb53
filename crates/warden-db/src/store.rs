// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite grant store.
//!
//! [`SqliteGrantStore`] implements [`ResourceRegistry`] and [`GrantStore`] over
//! the schema in [`crate::schema`]. Inherent methods return [`DbError`]; the
//! trait implementations convert to [`StoreError`] at the boundary.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::collections::HashMap;
use warden_policy::{GrantStore, Populate, ResourceQuery, ResourceRegistry};
use warden_policy_core::{
	Action, Criteria, Feature, FeatureId, FilterExpr, GrantOrigin, Grantee, ObjectFilter, ObjectId,
	Permission, PermissionFilter, PermissionId, Record, Resource, ResourceId, Role, RoleId,
	StoreError, SubjectId,
};

use crate::error::DbError;
use crate::sql::{bind_params, placeholders, quote_identifier, render};

/// Repository for grant store database operations.
#[derive(Clone)]
pub struct SqliteGrantStore {
	pool: SqlitePool,
}

impl SqliteGrantStore {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	// =========================================================================
	// Registry
	// =========================================================================

	#[tracing::instrument(skip(self), fields(identity = ?query.identity))]
	pub async fn list_resources(&self, query: &ResourceQuery) -> Result<Vec<Resource>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, identity
			FROM resources
			WHERE (? IS NULL OR identity = ?)
			ORDER BY id
			"#,
		)
		.bind(query.identity.as_deref())
		.bind(query.identity.as_deref())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.iter().map(row_to_resource).collect())
	}

	#[tracing::instrument(skip(self), fields(identity = %identity))]
	pub async fn get_resource(&self, identity: &str) -> Result<Option<Resource>, DbError> {
		let row = sqlx::query("SELECT id, name, identity FROM resources WHERE identity = ?")
			.bind(identity)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.as_ref().map(row_to_resource))
	}

	// =========================================================================
	// Permissions
	// =========================================================================

	#[tracing::instrument(
		skip(self, roles, filter),
		fields(subject_id = %subject, roles = roles.len(), resource = ?filter.resource, action = ?filter.action)
	)]
	pub async fn list_permissions_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		filter: &PermissionFilter,
		populate: Populate,
	) -> Result<Vec<Permission>, DbError> {
		let role_clause = if roles.is_empty() {
			"0".to_string()
		} else {
			format!("(p.relation = 'role' AND p.role_id IN ({}))", placeholders(roles.len()))
		};
		let sql = format!(
			r#"
			SELECT p.id, p.resource_id, p.action, p.relation, p.subject_id, p.role_id
			FROM permissions p
			JOIN resources r ON r.id = p.resource_id
			WHERE ((p.relation = 'user' AND p.subject_id = ?) OR {role_clause})
				AND (? IS NULL OR r.identity = ?)
				AND (? IS NULL OR p.action = ?)
			ORDER BY p.id
			"#
		);

		let mut query = sqlx::query(&sql).bind(subject.get());
		for role in roles {
			query = query.bind(role.get());
		}
		let resource = filter.resource.as_deref();
		let action = filter.action.map(|a| a.as_str());
		let rows = query
			.bind(resource)
			.bind(resource)
			.bind(action)
			.bind(action)
			.fetch_all(&self.pool)
			.await?;

		let mut permissions = rows
			.iter()
			.map(row_to_permission)
			.collect::<Result<Vec<_>, _>>()?;

		if permissions.is_empty() {
			return Ok(permissions);
		}

		let ids: Vec<i64> = permissions
			.iter()
			.filter_map(|p| p.id.map(PermissionId::get))
			.collect();

		if populate.criteria {
			let mut criteria = self.load_criteria(&ids).await?;
			for permission in &mut permissions {
				if let Some(id) = permission.id {
					permission.criteria = criteria.remove(&id).unwrap_or_default();
				}
			}
		}

		if populate.object_filters {
			let mut object_filters = self.load_object_filters(&ids).await?;
			for permission in &mut permissions {
				if let Some(id) = permission.id {
					permission.object_filters = object_filters.remove(&id).unwrap_or_default();
				}
			}
		}

		tracing::debug!(count = permissions.len(), "permissions loaded");
		Ok(permissions)
	}

	async fn load_criteria(
		&self,
		permission_ids: &[i64],
	) -> Result<HashMap<PermissionId, Vec<Criteria>>, DbError> {
		let sql = format!(
			"SELECT permission_id, where_clause FROM permission_criteria WHERE permission_id IN ({}) ORDER BY id",
			placeholders(permission_ids.len())
		);
		let mut query = sqlx::query(&sql);
		for id in permission_ids {
			query = query.bind(*id);
		}

		let mut criteria: HashMap<PermissionId, Vec<Criteria>> = HashMap::new();
		for row in query.fetch_all(&self.pool).await? {
			let permission_id = PermissionId::new(row.get("permission_id"));
			let clause: String = row.get("where_clause");
			let value: Value = serde_json::from_str(&clause)?;
			criteria
				.entry(permission_id)
				.or_default()
				.push(Criteria::from_where(&value)?);
		}
		Ok(criteria)
	}

	async fn load_object_filters(
		&self,
		permission_ids: &[i64],
	) -> Result<HashMap<PermissionId, Vec<ObjectFilter>>, DbError> {
		let sql = format!(
			"SELECT permission_id, object_id FROM permission_object_filters WHERE permission_id IN ({}) ORDER BY id",
			placeholders(permission_ids.len())
		);
		let mut query = sqlx::query(&sql);
		for id in permission_ids {
			query = query.bind(*id);
		}

		let mut filters: HashMap<PermissionId, Vec<ObjectFilter>> = HashMap::new();
		for row in query.fetch_all(&self.pool).await? {
			let permission_id = PermissionId::new(row.get("permission_id"));
			let object_id = ObjectId::new(row.get("object_id"));
			filters
				.entry(permission_id)
				.or_default()
				.push(ObjectFilter::new(object_id));
		}
		Ok(filters)
	}

	// =========================================================================
	// Roles and Features
	// =========================================================================

	#[tracing::instrument(skip(self), fields(subject_id = %subject))]
	pub async fn list_subject_roles(
		&self,
		subject: SubjectId,
		active_only: bool,
	) -> Result<Vec<Role>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT r.id, r.name, r.active
			FROM roles r
			JOIN subject_roles sr ON sr.role_id = r.id
			WHERE sr.subject_id = ? AND (? = 0 OR r.active = 1)
			ORDER BY r.id
			"#,
		)
		.bind(subject.get())
		.bind(active_only)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.map(|row| Role {
				id: RoleId::new(row.get("id")),
				name: row.get("name"),
				active: row.get("active"),
			})
			.collect())
	}

	#[tracing::instrument(skip(self, roles), fields(subject_id = %subject, roles = roles.len()))]
	pub async fn list_features_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		active_only: bool,
	) -> Result<Vec<Feature>, DbError> {
		let role_clause = if roles.is_empty() {
			String::new()
		} else {
			format!(
				"UNION SELECT feature_id FROM role_features WHERE role_id IN ({})",
				placeholders(roles.len())
			)
		};
		let sql = format!(
			r#"
			SELECT id, name, description, identity, context, active
			FROM features
			WHERE id IN (
				SELECT feature_id FROM subject_features WHERE subject_id = ?
				{role_clause}
			)
				AND (? = 0 OR active = 1)
			ORDER BY id
			"#
		);

		let mut query = sqlx::query(&sql).bind(subject.get());
		for role in roles {
			query = query.bind(role.get());
		}
		let rows = query.bind(active_only).fetch_all(&self.pool).await?;

		Ok(rows
			.iter()
			.map(|row| Feature {
				id: FeatureId::new(row.get("id")),
				name: row.get("name"),
				description: row.get("description"),
				identity: row.get("identity"),
				context: row.get("context"),
				active: row.get("active"),
			})
			.collect())
	}

	// =========================================================================
	// Records
	// =========================================================================

	/// Rows of the table named by `resource`, narrowed by `filter`.
	///
	/// The resource must be registered; its identity is used as the table name.
	#[tracing::instrument(skip(self, filter), fields(resource = %resource))]
	pub async fn query_records(
		&self,
		resource: &str,
		filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>, DbError> {
		if self.get_resource(resource).await?.is_none() {
			return Err(DbError::NotFound(resource.to_string()));
		}

		let table = quote_identifier(resource)?;
		let rendered = filter.map(render).transpose()?;
		let sql = match &rendered {
			Some(f) => format!("SELECT * FROM {table} WHERE {}", f.clause),
			None => format!("SELECT * FROM {table}"),
		};

		let mut query = sqlx::query(&sql);
		if let Some(f) = &rendered {
			query = bind_params(query, &f.params);
		}
		let rows = query.fetch_all(&self.pool).await?;

		tracing::debug!(rows = rows.len(), "records fetched");
		rows.iter().map(row_to_record).collect()
	}

	// =========================================================================
	// Writes
	// =========================================================================

	#[tracing::instrument(skip(self))]
	pub async fn create_resource(&self, name: &str, identity: &str) -> Result<ResourceId, DbError> {
		let result = sqlx::query("INSERT INTO resources (name, identity) VALUES (?, ?)")
			.bind(name)
			.bind(identity)
			.execute(&self.pool)
			.await?;
		Ok(ResourceId::new(result.last_insert_rowid()))
	}

	#[tracing::instrument(skip(self))]
	pub async fn create_role(&self, name: &str, active: bool) -> Result<RoleId, DbError> {
		let result = sqlx::query("INSERT INTO roles (name, active, created_at) VALUES (?, ?, ?)")
			.bind(name)
			.bind(active)
			.bind(Utc::now())
			.execute(&self.pool)
			.await?;
		Ok(RoleId::new(result.last_insert_rowid()))
	}

	#[tracing::instrument(skip(self))]
	pub async fn create_subject(&self, username: Option<&str>) -> Result<SubjectId, DbError> {
		let result = sqlx::query("INSERT INTO subjects (username, created_at) VALUES (?, ?)")
			.bind(username)
			.bind(Utc::now())
			.execute(&self.pool)
			.await?;
		Ok(SubjectId::new(result.last_insert_rowid()))
	}

	#[tracing::instrument(skip(self))]
	pub async fn assign_role(&self, subject: SubjectId, role: RoleId) -> Result<(), DbError> {
		sqlx::query("INSERT OR IGNORE INTO subject_roles (subject_id, role_id) VALUES (?, ?)")
			.bind(subject.get())
			.bind(role.get())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Stores a permission with its criteria and object filters in one transaction.
	#[tracing::instrument(skip(self, criteria, object_ids), fields(relation = holder.relation()))]
	pub async fn create_permission(
		&self,
		holder: Grantee,
		resource_id: ResourceId,
		action: Action,
		criteria: &[Criteria],
		object_ids: &[ObjectId],
	) -> Result<PermissionId, DbError> {
		let (subject_id, role_id) = match holder {
			Grantee::Subject(id) => (Some(id.get()), None),
			Grantee::Role(id) => (None, Some(id.get())),
		};

		let mut tx = self.pool.begin().await?;
		let result = sqlx::query(
			r#"
			INSERT INTO permissions (resource_id, action, relation, subject_id, role_id, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(resource_id.get())
		.bind(action.as_str())
		.bind(holder.relation())
		.bind(subject_id)
		.bind(role_id)
		.bind(Utc::now())
		.execute(&mut *tx)
		.await?;
		let permission_id = result.last_insert_rowid();

		for criterion in criteria {
			let clause = serde_json::to_string(&criterion.expr().to_where())?;
			sqlx::query("INSERT INTO permission_criteria (permission_id, where_clause) VALUES (?, ?)")
				.bind(permission_id)
				.bind(clause)
				.execute(&mut *tx)
				.await?;
		}

		for object_id in object_ids {
			sqlx::query("INSERT INTO permission_object_filters (permission_id, object_id) VALUES (?, ?)")
				.bind(permission_id)
				.bind(object_id.get())
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		tracing::debug!(permission_id, "permission created");
		Ok(PermissionId::new(permission_id))
	}

	#[tracing::instrument(skip(self, description))]
	pub async fn create_feature(
		&self,
		name: &str,
		identity: &str,
		description: Option<&str>,
		active: bool,
	) -> Result<FeatureId, DbError> {
		let result = sqlx::query(
			"INSERT INTO features (name, identity, description, active) VALUES (?, ?, ?, ?)",
		)
		.bind(name)
		.bind(identity)
		.bind(description)
		.bind(active)
		.execute(&self.pool)
		.await?;
		Ok(FeatureId::new(result.last_insert_rowid()))
	}

	#[tracing::instrument(skip(self), fields(relation = holder.relation()))]
	pub async fn grant_feature(&self, holder: Grantee, feature: FeatureId) -> Result<(), DbError> {
		let sql = match holder {
			Grantee::Subject(_) => {
				"INSERT OR IGNORE INTO subject_features (subject_id, feature_id) VALUES (?, ?)"
			}
			Grantee::Role(_) => {
				"INSERT OR IGNORE INTO role_features (role_id, feature_id) VALUES (?, ?)"
			}
		};
		let holder_id = match holder {
			Grantee::Subject(id) => id.get(),
			Grantee::Role(id) => id.get(),
		};
		sqlx::query(sql)
			.bind(holder_id)
			.bind(feature.get())
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

fn row_to_resource(row: &SqliteRow) -> Resource {
	Resource {
		id: ResourceId::new(row.get("id")),
		name: row.get("name"),
		identity: row.get("identity"),
	}
}

fn row_to_permission(row: &SqliteRow) -> Result<Permission, DbError> {
	let action: String = row.get("action");
	let action = action
		.parse::<Action>()
		.map_err(|e| DbError::Internal(e.to_string()))?;

	let relation: String = row.get("relation");
	let holder = match relation.as_str() {
		"user" => Grantee::Subject(SubjectId::new(row.get("subject_id"))),
		"role" => Grantee::Role(RoleId::new(row.get("role_id"))),
		other => return Err(DbError::Internal(format!("unknown relation: {other}"))),
	};

	Ok(Permission {
		id: Some(PermissionId::new(row.get("id"))),
		resource_id: ResourceId::new(row.get("resource_id")),
		action,
		holder,
		criteria: Vec::new(),
		object_filters: Vec::new(),
		origin: GrantOrigin::Stored,
	})
}

/// Decodes a row of any table into a JSON object keyed by column name.
fn row_to_record(row: &SqliteRow) -> Result<Record, DbError> {
	let mut record = Map::new();
	for column in row.columns() {
		let index = column.ordinal();
		let raw = row.try_get_raw(index)?;
		let value = if raw.is_null() {
			Value::Null
		} else {
			match raw.type_info().name() {
				"INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
				"REAL" => Number::from_f64(row.try_get::<f64, _>(index)?)
					.map(Value::Number)
					.unwrap_or(Value::Null),
				"BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
				_ => Value::String(row.try_get::<String, _>(index)?),
			}
		};
		record.insert(column.name().to_string(), value);
	}
	Ok(record)
}

#[async_trait]
impl ResourceRegistry for SqliteGrantStore {
	async fn list(&self, query: &ResourceQuery) -> Result<Vec<Resource>, StoreError> {
		Ok(self.list_resources(query).await?)
	}
}

#[async_trait]
impl GrantStore for SqliteGrantStore {
	async fn find_permissions_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		filter: &PermissionFilter,
		populate: Populate,
	) -> Result<Vec<Permission>, StoreError> {
		Ok(self
			.list_permissions_for(subject, roles, filter, populate)
			.await?)
	}

	async fn find_subject_roles(
		&self,
		subject: SubjectId,
		active_only: bool,
	) -> Result<Vec<Role>, StoreError> {
		Ok(self.list_subject_roles(subject, active_only).await?)
	}

	async fn find_features_for(
		&self,
		subject: SubjectId,
		roles: &[RoleId],
		active_only: bool,
	) -> Result<Vec<Feature>, StoreError> {
		Ok(self.list_features_for(subject, roles, active_only).await?)
	}

	async fn query(
		&self,
		resource: &str,
		filter: Option<&FilterExpr>,
	) -> Result<Vec<Record>, StoreError> {
		Ok(self.query_records(resource, filter).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_invoice_table, create_test_store};
	use serde_json::json;

	mod registry {
		use super::*;

		#[tokio::test]
		async fn lists_and_filters_resources() {
			let store = create_test_store().await;
			store.create_resource("Invoice", "invoice").await.unwrap();
			store.create_resource("Customer", "customer").await.unwrap();

			assert_eq!(store.list(&ResourceQuery::all()).await.unwrap().len(), 2);
			let only = store.list(&ResourceQuery::identity("customer")).await.unwrap();
			assert_eq!(only.len(), 1);
			assert_eq!(only[0].name, "Customer");
		}
	}

	mod permissions {
		use super::*;

		#[tokio::test]
		async fn loads_direct_and_role_permissions_with_associations() {
			let store = create_test_store().await;
			let invoice = store.create_resource("Invoice", "invoice").await.unwrap();
			let subject = store.create_subject(Some("ada")).await.unwrap();
			let other = store.create_subject(Some("bob")).await.unwrap();
			let role = store.create_role("auditor", true).await.unwrap();
			store.assign_role(subject, role).await.unwrap();

			let owned = Criteria::from_where(&json!({"owner": 1})).unwrap();
			store
				.create_permission(Grantee::Subject(subject), invoice, Action::Read, &[owned], &[])
				.await
				.unwrap();
			store
				.create_permission(
					Grantee::Role(role),
					invoice,
					Action::Read,
					&[],
					&[ObjectId::new(7), ObjectId::new(9)],
				)
				.await
				.unwrap();
			store
				.create_permission(Grantee::Subject(other), invoice, Action::Delete, &[], &[])
				.await
				.unwrap();

			let permissions = store
				.find_permissions_for(subject, &[role], &PermissionFilter::all(), Populate::all())
				.await
				.unwrap();
			assert_eq!(permissions.len(), 2);
			assert_eq!(permissions[0].holder, Grantee::Subject(subject));
			assert_eq!(permissions[0].criteria[0].expr().to_where(), json!({"owner": 1}));
			assert_eq!(permissions[1].object_filters.len(), 2);
		}

		#[tokio::test]
		async fn filter_limits_resource_and_action() {
			let store = create_test_store().await;
			let invoice = store.create_resource("Invoice", "invoice").await.unwrap();
			let customer = store.create_resource("Customer", "customer").await.unwrap();
			let subject = store.create_subject(None).await.unwrap();
			for (resource, action) in [
				(invoice, Action::Read),
				(invoice, Action::Update),
				(customer, Action::Read),
			] {
				store
					.create_permission(Grantee::Subject(subject), resource, action, &[], &[])
					.await
					.unwrap();
			}

			let filter = PermissionFilter {
				resource: Some("invoice".to_string()),
				action: Some(Action::Update),
			};
			let permissions = store
				.find_permissions_for(subject, &[], &filter, Populate::none())
				.await
				.unwrap();
			assert_eq!(permissions.len(), 1);
			assert_eq!(permissions[0].action, Action::Update);
			assert_eq!(permissions[0].resource_id, invoice);
		}

		#[tokio::test]
		async fn corrupt_criteria_surface_as_invalid_record() {
			let store = create_test_store().await;
			let invoice = store.create_resource("Invoice", "invoice").await.unwrap();
			let subject = store.create_subject(None).await.unwrap();
			let id = store
				.create_permission(Grantee::Subject(subject), invoice, Action::Read, &[], &[])
				.await
				.unwrap();
			sqlx::query("INSERT INTO permission_criteria (permission_id, where_clause) VALUES (?, ?)")
				.bind(id.get())
				.bind(r#"{"id": {"between": [1, 2]}}"#)
				.execute(store.pool())
				.await
				.unwrap();

			let err = store
				.find_permissions_for(subject, &[], &PermissionFilter::all(), Populate::all())
				.await
				.unwrap_err();
			assert!(matches!(err, StoreError::InvalidRecord(_)));
		}
	}

	mod roles_and_features {
		use super::*;

		#[tokio::test]
		async fn inactive_roles_are_excluded() {
			let store = create_test_store().await;
			let subject = store.create_subject(None).await.unwrap();
			let active = store.create_role("editor", true).await.unwrap();
			let retired = store.create_role("retired", false).await.unwrap();
			store.assign_role(subject, active).await.unwrap();
			store.assign_role(subject, retired).await.unwrap();

			let roles = store.find_subject_roles(subject, true).await.unwrap();
			assert_eq!(roles.len(), 1);
			assert_eq!(roles[0].id, active);
			assert_eq!(store.find_subject_roles(subject, false).await.unwrap().len(), 2);
		}

		#[tokio::test]
		async fn features_via_subject_and_roles() {
			let store = create_test_store().await;
			let subject = store.create_subject(None).await.unwrap();
			let role = store.create_role("beta", true).await.unwrap();
			let dark = store.create_feature("Dark mode", "dark-mode", None, true).await.unwrap();
			let export = store
				.create_feature("Export", "export", Some("CSV export"), true)
				.await
				.unwrap();
			let sunset = store.create_feature("Sunset", "sunset", None, false).await.unwrap();
			store.grant_feature(Grantee::Subject(subject), dark).await.unwrap();
			store.grant_feature(Grantee::Role(role), dark).await.unwrap();
			store.grant_feature(Grantee::Role(role), export).await.unwrap();
			store.grant_feature(Grantee::Role(role), sunset).await.unwrap();

			let features = store.find_features_for(subject, &[role], true).await.unwrap();
			let identities: Vec<_> = features.iter().map(|f| f.identity.as_str()).collect();
			assert_eq!(identities, vec!["dark-mode", "export"]);
			assert_eq!(features[1].description.as_deref(), Some("CSV export"));
			assert_eq!(features[0].context, "default");

			let direct_only = store.find_features_for(subject, &[], false).await.unwrap();
			assert_eq!(direct_only.len(), 1);
		}
	}

	mod records {
		use super::*;

		#[tokio::test]
		async fn query_applies_rendered_filter() {
			let store = create_test_store().await;
			store.create_resource("Invoice", "invoice").await.unwrap();
			create_invoice_table(store.pool()).await;

			let filter = FilterExpr::from_where(&json!({"or": [{"id": 7}, {"id": 9}]})).unwrap();
			let rows = store.query("invoice", Some(&filter)).await.unwrap();
			let mut ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
			ids.sort_unstable();
			assert_eq!(ids, vec![7, 9]);
		}

		#[tokio::test]
		async fn decodes_column_types() {
			let store = create_test_store().await;
			store.create_resource("Invoice", "invoice").await.unwrap();
			create_invoice_table(store.pool()).await;

			let rows = store
				.query("invoice", Some(&FilterExpr::eq("id", 42)))
				.await
				.unwrap();
			assert_eq!(rows.len(), 1);
			assert_eq!(rows[0]["total"], json!(42.5));
			assert_eq!(rows[0]["status"], json!("open"));
			assert_eq!(rows[0]["note"], Value::Null);
		}

		#[tokio::test]
		async fn unregistered_resource_is_rejected() {
			let store = create_test_store().await;
			let err = store.query("sqlite_master", None).await.unwrap_err();
			assert!(matches!(err, StoreError::UnknownResource(name) if name == "sqlite_master"));
		}

		#[tokio::test]
		async fn unrestricted_query_returns_all_rows() {
			let store = create_test_store().await;
			store.create_resource("Invoice", "invoice").await.unwrap();
			create_invoice_table(store.pool()).await;

			assert_eq!(store.query("invoice", None).await.unwrap().len(), 4);
		}

		#[tokio::test]
		async fn sql_and_in_process_evaluation_agree() {
			let store = create_test_store().await;
			store.create_resource("Invoice", "invoice").await.unwrap();
			create_invoice_table(store.pool()).await;
			let all_rows = store.query("invoice", None).await.unwrap();

			let clauses = [
				json!({"note": [null]}),
				json!({"note": [null, "first"]}),
				json!({"note": {"nin": [null, "first"]}}),
				json!({"note": {"nin": [null]}}),
				json!({"note": {"nin": ["first"]}}),
				json!({"note": {"!=": "first"}}),
				json!({"status": {"contains": "OP"}}),
				json!({"total": {">=": 42.5}}),
				json!({"or": [{"id": 7}, {"note": null}]}),
			];

			for clause in clauses {
				let filter = FilterExpr::from_where(&clause).unwrap();
				let mut from_sql: Vec<i64> = store
					.query("invoice", Some(&filter))
					.await
					.unwrap()
					.iter()
					.filter_map(|r| r["id"].as_i64())
					.collect();
				let mut in_process: Vec<i64> = all_rows
					.iter()
					.filter(|r| filter.matches(r))
					.filter_map(|r| r["id"].as_i64())
					.collect();
				from_sql.sort_unstable();
				in_process.sort_unstable();
				assert_eq!(from_sql, in_process, "{clause}");
			}
		}
	}
}
