// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture for exception events.

use std::backtrace::Backtrace;

use loom_route_core::{Frame, Stacktrace};
use rustc_demangle::demangle;

/// Frames from these crates belong to the runtime, not the application.
const RUNTIME_PREFIXES: &[&str] = &[
	"std::",
	"core::",
	"alloc::",
	"tokio::",
	"futures::",
	"futures_util::",
	"async_trait::",
	"tracing::",
	"backtrace::",
	"panic_unwind::",
	"loom_route::backtrace::",
	"rust_begin_unwind",
	"rust_panic",
	"__rust_",
	"_rust_",
];

const RUNTIME_SEGMENTS: &[&str] = &["::panicking::", "::rt::", "::sys_common::"];

/// Captures the current thread's backtrace, innermost frame last.
pub fn capture_backtrace() -> Stacktrace {
	let backtrace = Backtrace::force_capture();
	let mut frames = parse_backtrace(&format!("{backtrace}"));
	frames.reverse();
	Stacktrace { frames }
}

/// Parses the `Display` form of a backtrace, innermost frame first.
///
/// Frame lines look like `  3: my_app::handlers::report` and may be followed
/// by a location line `      at ./src/handlers.rs:42:9`.
fn parse_backtrace(text: &str) -> Vec<Frame> {
	let mut frames: Vec<Frame> = Vec::new();

	for line in text.lines().map(str::trim) {
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				apply_location(frame, location);
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	frames
}

fn parse_frame_line(line: &str) -> Option<Frame> {
	let (index, function) = line.split_once(':')?;
	if index.trim().parse::<u32>().is_err() {
		return None;
	}

	let function = function.trim();
	if function.is_empty() {
		return None;
	}

	let function = demangle(function).to_string();
	let module = function
		.trim_start_matches('<')
		.rsplit_once("::")
		.map(|(module, _)| module.to_string());

	Some(Frame {
		in_app: is_in_app(&function),
		function: Some(function),
		module,
		..Default::default()
	})
}

/// Applies `path:line:col` (line and column optional) to a frame.
fn apply_location(frame: &mut Frame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let last = parts.next();
	let middle = parts.next();
	let rest = parts.next();

	match (rest, middle, last) {
		(Some(path), Some(line), Some(col)) => {
			frame.filename = Some(path.to_string());
			frame.lineno = line.parse().ok();
			frame.colno = col.parse().ok();
		}
		(None, Some(path), Some(line)) => {
			frame.filename = Some(path.to_string());
			frame.lineno = line.parse().ok();
		}
		_ => frame.filename = Some(location.to_string()),
	}
}

fn is_in_app(function: &str) -> bool {
	let function = function.trim_start_matches('<');
	!RUNTIME_PREFIXES.iter().any(|p| function.starts_with(p))
		&& !RUNTIME_SEGMENTS.iter().any(|s| function.contains(s))
}
