// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grant-filtered lookups against a [`GrantStore`].

use tracing::{debug, instrument};
use warden_policy_core::{
	compile_grant, Action, Compiled, FilterExpr, PolicyDocument, Record, Result,
};

use crate::store::GrantStore;

/// Records of `resource` the policy allows for `action`, narrowed by `caller_filter`.
///
/// A denied grant returns no records without touching the store. A restricted
/// grant is AND-combined with the caller filter.
#[instrument(skip(store, policy, caller_filter), fields(resource = %resource, action = %action))]
pub async fn query_with_grant<S>(
	store: &S,
	policy: &PolicyDocument,
	resource: &str,
	action: Action,
	caller_filter: Option<&FilterExpr>,
) -> Result<Vec<Record>>
where
	S: GrantStore + ?Sized,
{
	let filter = match compile_grant(policy, resource, action)? {
		Compiled::Denied => {
			debug!("denied, skipping store query");
			return Ok(Vec::new());
		}
		Compiled::Unrestricted => caller_filter.cloned(),
		Compiled::Restricted(grant) => Some(match caller_filter {
			Some(caller) => grant.and(caller.clone()),
			None => grant,
		}),
	};

	Ok(store.query(resource, filter.as_ref()).await?)
}

/// Readable records of `resource`, narrowed by `caller_filter`.
pub async fn grant_find<S>(
	store: &S,
	policy: &PolicyDocument,
	resource: &str,
	caller_filter: Option<&FilterExpr>,
) -> Result<Vec<Record>>
where
	S: GrantStore + ?Sized,
{
	query_with_grant(store, policy, resource, Action::Read, caller_filter).await
}

/// Records readable only through explicit restrictions.
///
/// Unrestricted and denied grants both yield an empty list without a store query;
/// a restricted grant returns exactly the records its restriction selects.
#[instrument(skip(store, policy), fields(resource = %resource))]
pub async fn grant_find_white_list<S>(
	store: &S,
	policy: &PolicyDocument,
	resource: &str,
) -> Result<Vec<Record>>
where
	S: GrantStore + ?Sized,
{
	match compile_grant(policy, resource, Action::Read)? {
		Compiled::Denied | Compiled::Unrestricted => Ok(Vec::new()),
		Compiled::Restricted(grant) => Ok(store.query(resource, Some(&grant)).await?),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryStore;
	use serde_json::json;
	use warden_policy_core::{
		build_policy, GrantOrigin, Grantee, ObjectFilter, ObjectId, Permission, PolicyError,
		Resource, ResourceId, RoleId,
	};

	fn store() -> MemoryStore {
		let store = MemoryStore::new();
		store.add_resource(ResourceId::new(1), "Invoice", "invoice");
		for (id, owner) in [(1, 5), (2, 5), (3, 6), (4, 7)] {
			let serde_json::Value::Object(record) = json!({"id": id, "owner": owner}) else {
				unreachable!();
			};
			store.insert_record("invoice", record);
		}
		store
	}

	fn policy(objects: Option<&[i64]>) -> PolicyDocument {
		let resources = [Resource {
			id: ResourceId::new(1),
			name: "Invoice".to_string(),
			identity: "invoice".to_string(),
		}];
		let permissions: Vec<Permission> = objects
			.map(|ids| Permission {
				id: None,
				resource_id: ResourceId::new(1),
				action: Action::Read,
				holder: Grantee::Role(RoleId::new(1)),
				criteria: Vec::new(),
				object_filters: ids.iter().map(|id| ObjectFilter::new(ObjectId::new(*id))).collect(),
				origin: GrantOrigin::Stored,
			})
			.into_iter()
			.collect();
		build_policy(&resources, &permissions)
	}

	fn ids(records: &[Record]) -> Vec<i64> {
		let mut ids: Vec<i64> = records.iter().filter_map(|r| r["id"].as_i64()).collect();
		ids.sort_unstable();
		ids
	}

	mod find {
		use super::*;

		#[tokio::test]
		async fn denied_returns_empty_without_query() {
			let store = store();
			let rows = grant_find(&store, &policy(None), "invoice", None).await.unwrap();
			assert!(rows.is_empty());
			assert_eq!(store.query_count(), 0);
		}

		#[tokio::test]
		async fn unrestricted_uses_caller_filter_only() {
			let store = store();
			let caller = FilterExpr::eq("owner", 5);
			let rows = grant_find(&store, &policy(Some(&[])), "invoice", Some(&caller))
				.await
				.unwrap();
			assert_eq!(ids(&rows), vec![1, 2]);
		}

		#[tokio::test]
		async fn restricted_is_and_combined_with_caller_filter() {
			let store = store();
			let caller = FilterExpr::eq("owner", 5);
			let rows = grant_find(&store, &policy(Some(&[2, 3])), "invoice", Some(&caller))
				.await
				.unwrap();
			assert_eq!(ids(&rows), vec![2]);
		}

		#[tokio::test]
		async fn unknown_resource_is_an_error() {
			let store = store();
			let err = grant_find(&store, &policy(None), "ledger", None).await.unwrap_err();
			assert!(matches!(err, PolicyError::UnknownResource(_)));
		}
	}

	mod white_list {
		use super::*;
		use warden_policy_core::Criteria;

		#[tokio::test]
		async fn empty_where_clause_is_unrestricted() {
			let store = store();
			let resources = [Resource {
				id: ResourceId::new(1),
				name: "Invoice".to_string(),
				identity: "invoice".to_string(),
			}];
			let open_grant = Permission {
				id: None,
				resource_id: ResourceId::new(1),
				action: Action::Read,
				holder: Grantee::Role(RoleId::new(1)),
				criteria: vec![Criteria::from_where(&json!({})).unwrap()],
				object_filters: Vec::new(),
				origin: GrantOrigin::Stored,
			};
			let policy_doc = build_policy(&resources, &[open_grant]);

			let rows = grant_find_white_list(&store, &policy_doc, "invoice").await.unwrap();
			assert!(rows.is_empty());
			assert_eq!(store.query_count(), 0);
		}

		#[tokio::test]
		async fn large_ids_are_not_confused_with_neighbours() {
			let granted: i64 = 9_007_199_254_740_993;
			let store = store();
			for id in [granted - 1, granted, granted + 1] {
				let serde_json::Value::Object(record) = json!({"id": id, "owner": 9}) else {
					unreachable!();
				};
				store.insert_record("invoice", record);
			}

			let rows = grant_find_white_list(&store, &policy(Some(&[granted])), "invoice")
				.await
				.unwrap();
			assert_eq!(ids(&rows), vec![granted]);
		}

		#[tokio::test]
		async fn unrestricted_is_empty_without_query() {
			let store = store();
			let rows = grant_find_white_list(&store, &policy(Some(&[])), "invoice").await.unwrap();
			assert!(rows.is_empty());
			assert_eq!(store.query_count(), 0);
		}

		#[tokio::test]
		async fn denied_is_empty_without_query() {
			let store = store();
			let rows = grant_find_white_list(&store, &policy(None), "invoice").await.unwrap();
			assert!(rows.is_empty());
			assert_eq!(store.query_count(), 0);
		}

		#[tokio::test]
		async fn restricted_returns_whitelisted_records() {
			let store = store();
			let rows = grant_find_white_list(&store, &policy(Some(&[1, 4])), "invoice")
				.await
				.unwrap();
			assert_eq!(ids(&rows), vec![1, 4]);
		}
	}

	#[tokio::test]
	async fn store_failure_propagates() {
		let store = store();
		store.fail_with("disk full");
		let err = grant_find(&store, &policy(Some(&[1])), "invoice", None)
			.await
			.unwrap_err();
		assert!(matches!(err, PolicyError::Store(_)));
	}
}
