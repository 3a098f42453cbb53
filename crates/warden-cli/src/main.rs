// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `warden`: inspect policies and run grant-filtered lookups against a grant database.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_db::SqliteGrantStore;
use warden_policy::boundary;
use warden_policy::{PolicyResolver, ResolveOptions};
use warden_policy_core::{Action, FilterExpr, SubjectId};

/// Warden - access policy resolution.
#[derive(Parser, Debug)]
#[command(name = "warden", about = "Warden access policy resolution", version)]
struct Args {
	/// Config file (defaults to /etc/warden/warden.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Database URL, overriding configuration
	#[arg(long, global = true, env = "WARDEN_DATABASE_URL")]
	database: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create the grant schema
	Migrate,

	/// Print the subject's policy document
	Policy {
		#[arg(long)]
		subject: i64,
		/// Limit to one resource identity
		#[arg(long)]
		resource: Option<String>,
		#[arg(long)]
		action: Option<Action>,
	},

	/// Check one action on one resource
	Check {
		#[arg(long)]
		subject: i64,
		#[arg(long)]
		resource: String,
		#[arg(long)]
		action: Action,
	},

	/// Grant-filtered lookup on a resource
	Find {
		#[arg(long)]
		subject: i64,
		#[arg(long)]
		resource: String,
		/// Additional where clause, as JSON
		#[arg(long = "where", conflicts_with = "whitelist")]
		where_clause: Option<String>,
		/// Only records the grant itself narrows to; takes no --where clause
		#[arg(long)]
		whitelist: bool,
	},

	/// Print the subject's feature policy
	Features {
		#[arg(long)]
		subject: i64,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => warden_config::load_config_with_file(path)?,
		None => warden_config::load_config()?,
	};
	if let Some(url) = args.database {
		config.database.url = url;
	}

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::info!(database = %config.database.url, command = ?args.command, "starting warden");

	if config.database.is_in_memory() {
		tracing::warn!("in-memory database: grants are discarded on exit");
	}

	let pool = warden_db::create_pool(&config.database.url).await?;
	warden_db::run_migrations(&pool).await?;

	let store = Arc::new(SqliteGrantStore::new(pool));
	let resolver = PolicyResolver::new(store.clone(), store, config.policy);

	match args.command {
		Command::Migrate => {
			tracing::info!("schema is up to date");
		}
		Command::Policy {
			subject,
			resource,
			action,
		} => {
			let mut options = match resource {
				Some(identity) => ResolveOptions::resource(identity),
				None => ResolveOptions::default(),
			};
			if let Some(action) = action {
				options = options.with_action(action);
			}
			let policy = resolver
				.resolve_policy(SubjectId::new(subject), &options)
				.await?;
			print_json(&policy)?;
		}
		Command::Check {
			subject,
			resource,
			action,
		} => {
			let options = ResolveOptions::resource(resource.clone()).with_action(action);
			let result = match resolver
				.resolve_policy(SubjectId::new(subject), &options)
				.await
			{
				Ok(policy) => resolver.authorize(&policy, &resource, action),
				Err(e) => Err(e),
			};
			let response = boundary::respond_authorization(result);
			println!("{}", response.body());
			if !response.status().is_success() {
				std::process::exit(1);
			}
		}
		Command::Find {
			subject,
			resource,
			where_clause,
			whitelist,
		} => {
			let caller_filter = match where_clause {
				Some(raw) => {
					let value: serde_json::Value = serde_json::from_str(&raw)?;
					Some(FilterExpr::from_where(&value)?)
				}
				None => None,
			};
			let options = ResolveOptions::resource(resource.clone());
			let policy = resolver
				.resolve_policy(SubjectId::new(subject), &options)
				.await?;
			let records = if whitelist {
				resolver.grant_find_white_list(&policy, &resource).await?
			} else {
				resolver
					.grant_find(&policy, &resource, caller_filter.as_ref())
					.await?
			};
			print_json(&records)?;
		}
		Command::Features { subject } => {
			let features = resolver.resolve_features(SubjectId::new(subject)).await?;
			print_json(&features)?;
		}
	}

	Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
