//! Wire types for the loopback daemon transport.
//!
//! One NDJSON line in, one NDJSON line out, then the connection closes.
//! `RequestFrame` carries the auth token alongside the request body so the
//! transport layer can reject unauthenticated frames before anything in
//! `body` is even classified.

use serde::{Deserialize, Serialize};

use crate::types::BrowserKind;

/// Hard cap on a single frame, request or response, in either direction.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestFrame {
	pub token: String,
	#[serde(flatten)]
	pub body: DaemonRequest,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonRequest {
	Ping,
	/// Acquire a browser, reusing an existing one if reuse_key matches.
	AcquireBrowser {
		browser: BrowserKind,
		headless: bool,
		/// Optional key for browser reuse (e.g., context name or session path).
		/// If provided and a browser with this key exists, it will be reused.
		/// If None, a new browser is always spawned.
		reuse_key: Option<String>,
	},
	/// Legacy: spawn a new browser without reuse (kept for compatibility).
	SpawnBrowser {
		browser: BrowserKind,
		headless: bool,
		port: Option<u16>,
	},
	GetBrowser {
		port: u16,
	},
	KillBrowser {
		port: u16,
	},
	/// Release a browser by reuse_key (marks it available but doesn't close it).
	ReleaseBrowser {
		reuse_key: String,
	},
	ListBrowsers,
	/// Run a command's core logic inside the daemon process under lane and
	/// lease discipline, returning its captured output. This is the shape
	/// the worker orchestrator dispatches non-bypassed requests through.
	RunCommand {
		session_authority: String,
		argv: Vec<String>,
	},
	Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonResponse {
	Pong,
	Browser { cdp_endpoint: String, port: u16 },
	Browsers { list: Vec<BrowserInfo> },
	CommandResult { stdout: String, stderr: String, exit_code: i32 },
	Ok,
	Error { code: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserInfo {
	pub port: u16,
	pub browser: BrowserKind,
	pub headless: bool,
	pub created_at: u64,
	/// Optional reuse key if this browser was acquired with one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reuse_key: Option<String>,
	/// Last time this browser was used (unix timestamp).
	#[serde(default)]
	pub last_used_at: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_frame_round_trips_with_token() {
		let frame = RequestFrame {
			token: "abc123".to_string(),
			body: DaemonRequest::Ping,
		};
		let json = serde_json::to_string(&frame).unwrap();
		assert!(json.contains("\"token\":\"abc123\""));
		let back: RequestFrame = serde_json::from_str(&json).unwrap();
		assert_eq!(back.token, "abc123");
		assert!(matches!(back.body, DaemonRequest::Ping));
	}
}
