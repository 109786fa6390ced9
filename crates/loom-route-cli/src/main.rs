// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! loom-route - send a message or exception to one named destination.
//!
//! Destinations come from `/etc/loom/route.toml` (or `--config`) and
//! `LOOM_ROUTE_DSN_<NAME>` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loom_route::{
	capture_backtrace, ExceptionPayload, HttpClientFactory, HttpTransportConfig, Router,
};
use loom_route_config::{load_config, load_config_with_file, LogFormat, LoggingConfig, RouteConfig};
use loom_route_core::{Level, Tags};

#[derive(Parser, Debug)]
#[command(name = "loom-route", version, about, long_about = None)]
struct Args {
	/// Path to a TOML config file (default: /etc/loom/route.toml)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List configured destinations with redacted DSNs
	Destinations,
	/// Send a text message
	Message {
		/// Destination name
		#[arg(long)]
		to: String,
		/// Severity (debug, info, warning, error, fatal)
		#[arg(long, default_value = "info")]
		level: Level,
		/// Extra tag (repeatable: --tag KEY=VALUE)
		#[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
		tags: Vec<(String, String)>,
		text: String,
	},
	/// Send an exception with the current backtrace
	Exception {
		/// Destination name
		#[arg(long)]
		to: String,
		/// Exception type reported to the destination
		#[arg(long = "type", default_value = "Error")]
		exception_type: String,
		/// Extra tag (repeatable: --tag KEY=VALUE)
		#[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
		tags: Vec<(String, String)>,
		message: String,
	},
}

fn parse_tag(s: &str) -> std::result::Result<(String, String), String> {
	let (key, value) = s
		.split_once('=')
		.ok_or_else(|| format!("invalid tag '{s}', expected KEY=VALUE"))?;
	if key.is_empty() {
		return Err(format!("invalid tag '{s}', key is empty"));
	}
	Ok((key.to_string(), value.to_string()))
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Text => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

/// Loads configuration under a stderr subscriber scoped to the load, so the
/// loader's own events are visible before the configured subscriber exists.
fn load_route_config(path: Option<&Path>) -> Result<RouteConfig> {
	let bootstrap = tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(fmt::layer().with_writer(std::io::stderr));

	tracing::subscriber::with_default(bootstrap, || match path {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	})
	.context("failed to load configuration")
}

fn build_router(config: &RouteConfig) -> Result<Router> {
	if config.destinations.is_empty() {
		bail!(
			"no destinations configured; add a [destinations.<name>] table or set LOOM_ROUTE_DSN_<NAME>"
		);
	}

	let factory = HttpClientFactory::new(HttpTransportConfig::from(&config.transport));
	Router::from_config(config, Arc::new(factory)).context("failed to register destinations")
}

async fn run(router: &Router, command: Command) -> Result<()> {
	match command {
		Command::Destinations => {
			for name in router.destinations() {
				match router.dsn(name.as_str()) {
					Some(dsn) => println!("{name}\t{dsn}"),
					None => println!("{name}"),
				}
			}
		}
		Command::Message {
			to,
			level,
			tags,
			text,
		} => {
			let tags: Tags = tags.into_iter().collect();
			let event_id = router
				.capture_message(&to, &text, level, tags)
				.await
				.with_context(|| format!("failed to send message to '{to}'"))?;
			println!("{event_id}");
		}
		Command::Exception {
			to,
			exception_type,
			tags,
			message,
		} => {
			let tags: Tags = tags.into_iter().collect();
			let payload =
				ExceptionPayload::new(exception_type, message).with_stacktrace(capture_backtrace());
			let event_id = router
				.capture_exception(&to, payload, tags)
				.await
				.with_context(|| format!("failed to send exception to '{to}'"))?;
			println!("{event_id}");
		}
	}

	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_route_config(args.config.as_deref())?;

	init_tracing(&config.logging);
	debug!(?args, "parsed arguments");

	let router = build_router(&config)?;
	info!(
		destinations = router.destinations().len(),
		"router ready"
	);

	let result = run(&router, args.command).await;

	let report = router.close().await;
	for failure in &report.failures {
		error!(
			destination = %failure.destination,
			error = %failure.error,
			"failed to release destination client"
		);
	}

	result
}
