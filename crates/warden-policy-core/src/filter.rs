// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filter expressions for narrowing record lookups.
//!
//! A [`FilterExpr`] is a boolean tree over row predicates:
//!
//! ```text
//! FilterExpr ::= Predicate(field, op, value)
//!              | AllOf([FilterExpr])   -- AND, empty = match everything
//!              | AnyOf([FilterExpr])   -- OR,  empty = match nothing
//! ```
//!
//! Expressions serialize as a tagged union (`{"predicate": {...}}`,
//! `{"all_of": [...]}`, `{"any_of": [...]}`) for transport between processes.
//! Stored criteria and configuration use the where-clause dialect instead, which
//! [`FilterExpr::from_where`] and [`FilterExpr::to_where`] translate:
//!
//! ```text
//! {"status": "open"}                     status = 'open'
//! {"id": [1, 2]}                         id IN (1, 2)
//! {"total": {">=": 10, "<": 100}}        total >= 10 AND total < 100
//! {"or": [{"id": 7}, {"id": 9}]}         id = 7 OR id = 9
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// A business record as returned by the grant store.
pub type Record = Map<String, Value>;

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
	Eq,
	Ne,
	Lt,
	Lte,
	Gt,
	Gte,
	In,
	NotIn,
	Contains,
	StartsWith,
	EndsWith,
	Like,
}

impl Operator {
	fn from_where_key(key: &str) -> Option<Self> {
		match key {
			"=" | "==" => Some(Operator::Eq),
			"!=" | "not" => Some(Operator::Ne),
			"<" | "lessThan" => Some(Operator::Lt),
			"<=" | "lessThanOrEqual" => Some(Operator::Lte),
			">" | "greaterThan" => Some(Operator::Gt),
			">=" | "greaterThanOrEqual" => Some(Operator::Gte),
			"in" => Some(Operator::In),
			"nin" => Some(Operator::NotIn),
			"contains" => Some(Operator::Contains),
			"startsWith" => Some(Operator::StartsWith),
			"endsWith" => Some(Operator::EndsWith),
			"like" => Some(Operator::Like),
			_ => None,
		}
	}

	/// The where-clause key for this operator.
	pub fn where_key(&self) -> &'static str {
		match self {
			Operator::Eq => "=",
			Operator::Ne => "!=",
			Operator::Lt => "<",
			Operator::Lte => "<=",
			Operator::Gt => ">",
			Operator::Gte => ">=",
			Operator::In => "in",
			Operator::NotIn => "nin",
			Operator::Contains => "contains",
			Operator::StartsWith => "startsWith",
			Operator::EndsWith => "endsWith",
			Operator::Like => "like",
		}
	}

	fn expects_array(&self) -> bool {
		matches!(self, Operator::In | Operator::NotIn)
	}

	fn expects_string(&self) -> bool {
		matches!(
			self,
			Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Like
		)
	}
}

/// A single row-level comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
	pub field: String,
	pub op: Operator,
	pub value: Value,
}

impl Predicate {
	/// Evaluates this predicate against a record. Missing fields compare as null.
	pub fn matches(&self, record: &Record) -> bool {
		let actual = record.get(&self.field).unwrap_or(&Value::Null);
		match self.op {
			Operator::Eq => values_equal(actual, &self.value),
			Operator::Ne => !values_equal(actual, &self.value),
			Operator::Lt => compare(actual, &self.value) == Some(Ordering::Less),
			Operator::Lte => matches!(
				compare(actual, &self.value),
				Some(Ordering::Less | Ordering::Equal)
			),
			Operator::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
			Operator::Gte => matches!(
				compare(actual, &self.value),
				Some(Ordering::Greater | Ordering::Equal)
			),
			Operator::In => self
				.value
				.as_array()
				.is_some_and(|values| values.iter().any(|v| values_equal(actual, v))),
			Operator::NotIn => self
				.value
				.as_array()
				.is_some_and(|values| !values.iter().any(|v| values_equal(actual, v))),
			Operator::Contains => {
				folded_pair(actual, &self.value).is_some_and(|(a, b)| a.contains(&b))
			}
			Operator::StartsWith => {
				folded_pair(actual, &self.value).is_some_and(|(a, b)| a.starts_with(&b))
			}
			Operator::EndsWith => {
				folded_pair(actual, &self.value).is_some_and(|(a, b)| a.ends_with(&b))
			}
			Operator::Like => folded_pair(actual, &self.value).is_some_and(|(a, p)| like_match(&a, &p)),
		}
	}
}

/// Boolean filter tree over row predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
	Predicate(Predicate),
	AllOf(Vec<FilterExpr>),
	AnyOf(Vec<FilterExpr>),
}

/// Errors raised while parsing a where clause.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
	#[error("where clause must be an object, got {0}")]
	NotAnObject(String),

	#[error("'{0}' must be an array of where clauses")]
	ExpectedArray(String),

	#[error("unknown operator '{op}' on field '{field}'")]
	UnknownOperator { field: String, op: String },

	#[error("empty condition on field '{0}'")]
	EmptyCondition(String),

	#[error("operator '{op}' on field '{field}' expects {expected}")]
	InvalidOperand {
		field: String,
		op: String,
		expected: &'static str,
	},
}

impl FilterExpr {
	pub fn predicate(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
		FilterExpr::Predicate(Predicate {
			field: field.into(),
			op,
			value: value.into(),
		})
	}

	/// Equality predicate, `field = value`.
	pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::predicate(field, Operator::Eq, value)
	}

	/// An expression every record satisfies.
	pub fn match_all() -> Self {
		FilterExpr::AllOf(Vec::new())
	}

	pub fn is_match_all(&self) -> bool {
		matches!(self, FilterExpr::AllOf(children) if children.is_empty())
	}

	/// OR-combines `items` without wrapping: `None` for no items, the item itself
	/// for one, an `AnyOf` node otherwise.
	pub fn any(mut items: Vec<FilterExpr>) -> Option<FilterExpr> {
		match items.len() {
			0 => None,
			1 => items.pop(),
			_ => Some(FilterExpr::AnyOf(items)),
		}
	}

	/// AND-combines `items` without wrapping; see [`FilterExpr::any`].
	pub fn all(mut items: Vec<FilterExpr>) -> Option<FilterExpr> {
		match items.len() {
			0 => None,
			1 => items.pop(),
			_ => Some(FilterExpr::AllOf(items)),
		}
	}

	/// Conjunction of two expressions. A match-all side is dropped.
	pub fn and(self, other: FilterExpr) -> FilterExpr {
		if self.is_match_all() {
			return other;
		}
		if other.is_match_all() {
			return self;
		}
		FilterExpr::AllOf(vec![self, other])
	}

	/// Evaluates the expression against a record.
	pub fn matches(&self, record: &Record) -> bool {
		match self {
			FilterExpr::Predicate(p) => p.matches(record),
			FilterExpr::AllOf(children) => children.iter().all(|c| c.matches(record)),
			FilterExpr::AnyOf(children) => children.iter().any(|c| c.matches(record)),
		}
	}

	/// Parses a where clause.
	///
	/// An empty object parses to [`FilterExpr::match_all`]. Keys of one object are
	/// AND-combined; a single key yields its condition directly.
	pub fn from_where(clause: &Value) -> Result<Self, FilterError> {
		let Value::Object(map) = clause else {
			return Err(FilterError::NotAnObject(describe(clause)));
		};

		let mut parts = Vec::with_capacity(map.len());
		for (key, value) in map {
			match key.as_str() {
				"or" => parts.push(FilterExpr::AnyOf(parse_group(key, value)?)),
				"and" => parts.push(FilterExpr::AllOf(parse_group(key, value)?)),
				field => parts.push(parse_field(field, value)?),
			}
		}

		Ok(FilterExpr::all(parts).unwrap_or_else(FilterExpr::match_all))
	}

	/// Renders the expression in the where-clause dialect.
	pub fn to_where(&self) -> Value {
		match self {
			FilterExpr::Predicate(p) => {
				let condition = match p.op {
					Operator::Eq => p.value.clone(),
					op => {
						let mut ops = Map::new();
						ops.insert(op.where_key().to_string(), p.value.clone());
						Value::Object(ops)
					}
				};
				let mut clause = Map::new();
				clause.insert(p.field.clone(), condition);
				Value::Object(clause)
			}
			FilterExpr::AllOf(children) if children.is_empty() => Value::Object(Map::new()),
			FilterExpr::AllOf(children) => group("and", children),
			FilterExpr::AnyOf(children) => group("or", children),
		}
	}
}

fn group(key: &str, children: &[FilterExpr]) -> Value {
	let mut clause = Map::new();
	clause.insert(
		key.to_string(),
		Value::Array(children.iter().map(FilterExpr::to_where).collect()),
	);
	Value::Object(clause)
}

fn parse_group(key: &str, value: &Value) -> Result<Vec<FilterExpr>, FilterError> {
	let Value::Array(clauses) = value else {
		return Err(FilterError::ExpectedArray(key.to_string()));
	};
	clauses.iter().map(FilterExpr::from_where).collect()
}

fn parse_field(field: &str, value: &Value) -> Result<FilterExpr, FilterError> {
	match value {
		Value::Array(_) => Ok(FilterExpr::predicate(field, Operator::In, value.clone())),
		Value::Object(ops) => {
			if ops.is_empty() {
				return Err(FilterError::EmptyCondition(field.to_string()));
			}
			let mut parts = Vec::with_capacity(ops.len());
			for (key, operand) in ops {
				let op = Operator::from_where_key(key).ok_or_else(|| FilterError::UnknownOperator {
					field: field.to_string(),
					op: key.clone(),
				})?;
				if op.expects_array() && !operand.is_array() {
					return Err(FilterError::InvalidOperand {
						field: field.to_string(),
						op: key.clone(),
						expected: "an array",
					});
				}
				if op.expects_string() && !operand.is_string() {
					return Err(FilterError::InvalidOperand {
						field: field.to_string(),
						op: key.clone(),
						expected: "a string",
					});
				}
				parts.push(FilterExpr::predicate(field, op, operand.clone()));
			}
			Ok(FilterExpr::all(parts).unwrap_or_else(FilterExpr::match_all))
		}
		scalar => Ok(FilterExpr::eq(field, scalar.clone())),
	}
}

fn describe(value: &Value) -> String {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
	.to_string()
}

fn values_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
		_ => a == b,
	}
}

/// Integers compare exactly; `f64` is used only when one side is a float.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
	if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
		return Some(x.cmp(&y));
	}
	if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
		return Some(x.cmp(&y));
	}
	let integral = |n: &Number| n.is_i64() || n.is_u64();
	if integral(x) && integral(y) {
		// One side is negative, the other above i64::MAX.
		return Some(if x.is_i64() { Ordering::Less } else { Ordering::Greater });
	}
	x.as_f64()?.partial_cmp(&y.as_f64()?)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		_ => None,
	}
}

fn folded_pair(a: &Value, b: &Value) -> Option<(String, String)> {
	match (a, b) {
		(Value::String(a), Value::String(b)) => Some((a.to_ascii_lowercase(), b.to_ascii_lowercase())),
		_ => None,
	}
}

/// SQL `LIKE` matching: `%` matches any run, `_` matches one character.
fn like_match(text: &str, pattern: &str) -> bool {
	let text: Vec<char> = text.chars().collect();
	let pattern: Vec<char> = pattern.chars().collect();
	let (mut t, mut p) = (0, 0);
	let mut backtrack: Option<(usize, usize)> = None;

	while t < text.len() {
		if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
			t += 1;
			p += 1;
		} else if p < pattern.len() && pattern[p] == '%' {
			backtrack = Some((p, t));
			p += 1;
		} else if let Some((star, matched)) = backtrack {
			p = star + 1;
			t = matched + 1;
			backtrack = Some((star, matched + 1));
		} else {
			return false;
		}
	}

	while p < pattern.len() && pattern[p] == '%' {
		p += 1;
	}
	p == pattern.len()
}
