// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP responses for the request-handling layer.
//!
//! Successful results become `200` JSON bodies. Denials and every internal
//! failure become the same generic `403`: errors are logged here and never
//! echoed to the client.

use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use serde::Serialize;
use tracing::{error, warn};
use warden_policy_core::{Authorization, Result};

/// Body of every forbidden response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForbiddenBody {
	/// Error code, always "forbidden"
	pub error: &'static str,
	pub message: &'static str,
}

impl Default for ForbiddenBody {
	fn default() -> Self {
		Self {
			error: "forbidden",
			message: "Insufficient permissions",
		}
	}
}

fn json_response(status: StatusCode, body: String) -> Response<String> {
	let mut response = Response::new(body);
	*response.status_mut() = status;
	response
		.headers_mut()
		.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	response
}

/// The generic forbidden response.
pub fn forbidden() -> Response<String> {
	let body = serde_json::to_string(&ForbiddenBody::default())
		.unwrap_or_else(|_| r#"{"error":"forbidden"}"#.to_string());
	json_response(StatusCode::FORBIDDEN, body)
}

/// `200` with `value` serialized as JSON.
pub fn ok<T: Serialize>(value: &T) -> Response<String> {
	match serde_json::to_string(value) {
		Ok(body) => json_response(StatusCode::OK, body),
		Err(e) => {
			error!(error = %e, "failed to serialize response body");
			forbidden()
		}
	}
}

/// Responds with the result, or with a forbidden response on error.
pub fn respond<T: Serialize>(result: Result<T>) -> Response<String> {
	match result {
		Ok(value) => ok(&value),
		Err(e) => {
			error!(error = %e, "policy resolution failed");
			forbidden()
		}
	}
}

/// Like [`respond`], but a denied authorization is also forbidden.
pub fn respond_authorization(result: Result<Authorization>) -> Response<String> {
	match result {
		Ok(auth) if auth.allowed => ok(&auth),
		Ok(_) => {
			warn!("authorization denied");
			forbidden()
		}
		Err(e) => {
			error!(error = %e, "authorization check failed");
			forbidden()
		}
	}
}
