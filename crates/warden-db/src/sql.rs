// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rendering of [`FilterExpr`] trees to parameterized SQLite `WHERE` clauses.
//!
//! Field names are validated and double-quoted; every value is bound as a `?`
//! parameter. Null comparisons, including null members of `in`/`nin` lists,
//! render as `IS NULL` / `IS NOT NULL` so results agree with [`FilterExpr::matches`].

use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::query::Query;
use warden_policy_core::{FilterExpr, Operator, Predicate};

use crate::error::{DbError, Result};

/// A bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
	Null,
	Integer(i64),
	Real(f64),
	Text(String),
}

impl SqlValue {
	fn from_json(field: &str, value: &Value) -> Result<Self> {
		match value {
			Value::Null => Ok(SqlValue::Null),
			Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
			Value::Number(n) => {
				if let Some(i) = n.as_i64() {
					Ok(SqlValue::Integer(i))
				} else if let Some(f) = n.as_f64() {
					Ok(SqlValue::Real(f))
				} else {
					Err(DbError::UnsupportedValue {
						field: field.to_string(),
						message: format!("number {n} out of range"),
					})
				}
			}
			Value::String(s) => Ok(SqlValue::Text(s.clone())),
			Value::Array(_) | Value::Object(_) => Err(DbError::UnsupportedValue {
				field: field.to_string(),
				message: "expected a scalar".to_string(),
			}),
		}
	}
}

/// A rendered `WHERE` clause and its parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
	pub clause: String,
	pub params: Vec<SqlValue>,
}

/// Validates `name` as a plain SQL identifier and double-quotes it.
pub fn quote_identifier(name: &str) -> Result<String> {
	let mut chars = name.chars();
	let valid = match chars.next() {
		Some(first) => {
			(first.is_ascii_alphabetic() || first == '_')
				&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
		}
		None => false,
	};
	if !valid {
		return Err(DbError::InvalidIdentifier(name.to_string()));
	}
	Ok(format!("\"{name}\""))
}

/// `?, ?, ?` for `count` parameters.
pub(crate) fn placeholders(count: usize) -> String {
	vec!["?"; count].join(", ")
}

/// Renders `expr` to a `WHERE` clause.
pub fn render(expr: &FilterExpr) -> Result<SqlFilter> {
	let mut params = Vec::new();
	let clause = render_into(expr, &mut params)?;
	Ok(SqlFilter { clause, params })
}

fn render_into(expr: &FilterExpr, params: &mut Vec<SqlValue>) -> Result<String> {
	match expr {
		FilterExpr::Predicate(p) => render_predicate(p, params),
		FilterExpr::AllOf(children) => render_group(children, " AND ", "1", params),
		FilterExpr::AnyOf(children) => render_group(children, " OR ", "0", params),
	}
}

fn render_group(
	children: &[FilterExpr],
	joiner: &str,
	empty: &str,
	params: &mut Vec<SqlValue>,
) -> Result<String> {
	if children.is_empty() {
		return Ok(empty.to_string());
	}
	let parts = children
		.iter()
		.map(|child| render_into(child, params))
		.collect::<Result<Vec<_>>>()?;
	Ok(format!("({})", parts.join(joiner)))
}

fn render_predicate(p: &Predicate, params: &mut Vec<SqlValue>) -> Result<String> {
	let column = quote_identifier(&p.field)?;

	let clause = match p.op {
		Operator::Eq if p.value.is_null() => format!("{column} IS NULL"),
		Operator::Ne if p.value.is_null() => format!("{column} IS NOT NULL"),
		Operator::Eq => {
			params.push(SqlValue::from_json(&p.field, &p.value)?);
			format!("{column} = ?")
		}
		Operator::Ne => {
			params.push(SqlValue::from_json(&p.field, &p.value)?);
			format!("({column} IS NULL OR {column} != ?)")
		}
		Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
			let symbol = p.op.where_key();
			params.push(SqlValue::from_json(&p.field, &p.value)?);
			format!("{column} {symbol} ?")
		}
		Operator::In | Operator::NotIn => {
			let values = p.value.as_array().ok_or_else(|| DbError::UnsupportedValue {
				field: p.field.clone(),
				message: "expected an array".to_string(),
			})?;
			let negated = p.op == Operator::NotIn;
			// `x IN (NULL)` is never true in SQL, so null members become IS tests.
			let with_null = values.iter().any(Value::is_null);
			let members: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
			if members.is_empty() {
				let clause = match (negated, with_null) {
					(false, false) => "0".to_string(),
					(true, false) => "1".to_string(),
					(false, true) => format!("{column} IS NULL"),
					(true, true) => format!("{column} IS NOT NULL"),
				};
				return Ok(clause);
			}
			for value in &members {
				params.push(SqlValue::from_json(&p.field, value)?);
			}
			let list = placeholders(members.len());
			match (negated, with_null) {
				(false, false) => format!("{column} IN ({list})"),
				(false, true) => format!("({column} IS NULL OR {column} IN ({list}))"),
				(true, false) => format!("({column} IS NULL OR {column} NOT IN ({list}))"),
				(true, true) => format!("({column} IS NOT NULL AND {column} NOT IN ({list}))"),
			}
		}
		Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Like => {
			let text = p.value.as_str().ok_or_else(|| DbError::UnsupportedValue {
				field: p.field.clone(),
				message: "expected a string".to_string(),
			})?;
			let pattern = match p.op {
				Operator::Contains => format!("%{}%", escape_like(text)),
				Operator::StartsWith => format!("{}%", escape_like(text)),
				Operator::EndsWith => format!("%{}", escape_like(text)),
				_ => text.to_string(),
			};
			params.push(SqlValue::Text(pattern));
			if p.op == Operator::Like {
				format!("{column} LIKE ?")
			} else {
				format!("{column} LIKE ? ESCAPE '\\'")
			}
		}
	};
	Ok(clause)
}

fn escape_like(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '%' | '_' | '\\') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

/// Binds rendered parameters onto `query` in order.
pub(crate) fn bind_params<'q>(
	mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
	params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	for param in params {
		query = match param {
			SqlValue::Null => query.bind(None::<i64>),
			SqlValue::Integer(i) => query.bind(*i),
			SqlValue::Real(f) => query.bind(*f),
			SqlValue::Text(s) => query.bind(s.clone()),
		};
	}
	query
}
