//! Worker orchestrator: classifies an incoming request, decides whether it
//! bypasses the daemon entirely, and for non-bypassed work drives it
//! through the lane scheduler and session runtime pool with bounded,
//! truncation-marked output capture.
//!
//! The verb's actual execution is behind the [`Verb`] trait so this module
//! is testable without a real browser.

use std::sync::Arc;

use crate::control::diagnostics::{DiagnosticsSink, Metric};
use crate::control::lane_scheduler::{LaneScheduler, QueueError, lane_key};
use crate::control::runtime_pool::{AcquireRequest, PoolError, RuntimePool};
use crate::output::ErrorCode;

/// Per-stream byte cap on captured stdout/stderr. Exceeding it appends the
/// two-token truncation marker specified by the contract.
pub const CAPTURE_CAP_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Invocation {
	pub session_id: Option<String>,
	pub cdp_origin: String,
	pub argv: Vec<String>,
}

/// The tagged variant a raw request classifies into.
#[derive(Debug, Clone)]
pub enum RequestKind {
	Run(Invocation),
	Control(String),
	WorkerInternal(String),
}

/// Names recognized as worker-internal entrypoints; these always bypass.
const WORKER_INTERNAL_NAMES: &[&str] = &["net-tailer", "daemon-supervisor"];

/// Verb names that stream NDJSON to stdout rather than returning one
/// envelope; these always bypass since the daemon's one-response-per-
/// connection model can't represent a stream.
const STREAMING_VERB_NAMES: &[&str] = &["auth.listen", "page.console", "har.show"];

/// Classify a raw argv into a request kind. `argv[0]` is the command name.
pub fn classify(argv: &[String]) -> RequestKind {
	let Some(head) = argv.first() else {
		return RequestKind::Control("noop".to_string());
	};

	if WORKER_INTERNAL_NAMES.contains(&head.as_str()) {
		return RequestKind::WorkerInternal(head.clone());
	}

	if head.starts_with("session.") || head.starts_with("daemon.") || head == "contract" {
		return RequestKind::Control(head.clone());
	}

	RequestKind::Run(Invocation {
		session_id: None,
		cdp_origin: String::new(),
		argv: argv.to_vec(),
	})
}

/// Reasons a request runs locally without ever transiting the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
	WorkerInternal,
	StreamingVerb,
	StdinFedPlan,
	CwdRelativeDiagnostic,
}

/// Decide whether `kind` bypasses the daemon. `command` is the canonical
/// verb name; `reads_stdin_plan` and `reads_cwd_relative_paths` are set by
/// the caller based on how the command was invoked (e.g. `run --stdin`, or
/// a diagnostic verb resolving a path relative to the caller's CWD, which
/// the long-lived daemon process cannot see).
pub fn decide_bypass(kind: &RequestKind, command: &str, reads_stdin_plan: bool, reads_cwd_relative_paths: bool) -> Option<BypassReason> {
	if matches!(kind, RequestKind::WorkerInternal(_)) {
		return Some(BypassReason::WorkerInternal);
	}
	if STREAMING_VERB_NAMES.contains(&command) {
		return Some(BypassReason::StreamingVerb);
	}
	if reads_stdin_plan {
		return Some(BypassReason::StdinFedPlan);
	}
	if reads_cwd_relative_paths {
		return Some(BypassReason::CwdRelativeDiagnostic);
	}
	None
}

/// A verb's core logic, abstracted so the orchestrator can dispatch it
/// under lane/lease discipline without depending on a real CDP connection.
/// Writes go to the provided per-request buffers rather than process-level
/// stdout/stderr, so concurrent dispatches never interleave output.
pub trait Verb: Send + Sync {
	fn execute(&self, browser: &Arc<dyn crate::control::runtime_pool::BrowserHandle>, stdout: &mut Vec<u8>, stderr: &mut Vec<u8>) -> Result<i32, String>;
}

/// Outcome of a dispatched request, after truncation has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
	pub stdout: String,
	pub stderr: String,
	pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
	/// Queue overload: typed failure returned directly to the caller, never
	/// silently falls back to local execution.
	QueueOverload(ErrorCode),
	/// Runtime pool could not warm/assign a browser for this request.
	PoolFailed(ErrorCode),
}

/// Append the deterministic truncation marker when `buf` exceeds `cap`.
/// The two tokens (`"truncated at N bytes"`, `"(M bytes omitted)"`) are
/// part of the wire contract and must be emitted exactly as written here.
pub fn truncate_capture(buf: Vec<u8>, cap: usize) -> String {
	if buf.len() <= cap {
		return String::from_utf8_lossy(&buf).into_owned();
	}
	let omitted = buf.len() - cap;
	let mut kept = String::from_utf8_lossy(&buf[..cap]).into_owned();
	kept.push_str(&format!("\ntruncated at {cap} bytes\n({omitted} bytes omitted)"));
	kept
}

pub struct Orchestrator {
	lanes: Arc<LaneScheduler>,
	pool: Arc<RuntimePool>,
	diagnostics: Arc<DiagnosticsSink>,
}

impl Orchestrator {
	pub fn new(lanes: Arc<LaneScheduler>, pool: Arc<RuntimePool>, diagnostics: Arc<DiagnosticsSink>) -> Self {
		Self { lanes, pool, diagnostics }
	}

	/// Dispatch a non-bypassed `Run` request: derive its lane key, enqueue
	/// in the lane scheduler, acquire a lease from the runtime pool on
	/// dispatch, run the verb with capped output buffers, and map the
	/// outcome.
	///
	/// Queue overload (`E_DAEMON_QUEUE_SATURATED` / `E_DAEMON_QUEUE_TIMEOUT`)
	/// is returned as a typed error directly — callers must never silently
	/// retry locally for these codes. Pool failures are likewise typed;
	/// only a transport-level failure to reach the daemon at all (handled
	/// one layer up, outside this function) triggers local fallback.
	pub async fn dispatch(&self, invocation: &Invocation, verb: &dyn Verb) -> Result<DispatchOutcome, OrchestratorError> {
		let key = lane_key(invocation.session_id.as_deref(), Some(invocation.cdp_origin.as_str()));

		let ticket = self.lanes.enqueue(&key).await.map_err(|err| {
			self.diagnostics.event("orchestrator.queue_rejected", crate::control::diagnostics::EventFields::default());
			OrchestratorError::QueueOverload(queue_error_code(err))
		})?;

		let lease = self
			.pool
			.acquire(AcquireRequest {
				session_id: invocation.session_id.as_deref(),
				cdp_origin: &invocation.cdp_origin,
			})
			.await
			.map_err(|err| OrchestratorError::PoolFailed(pool_error_code(&err)))?;

		let mut stdout = Vec::new();
		let mut stderr = Vec::new();
		let exit_code = match verb.execute(lease.browser(), &mut stdout, &mut stderr) {
			Ok(code) => code,
			Err(message) => {
				stderr.extend_from_slice(message.as_bytes());
				1
			}
		};

		self.diagnostics.metric(Metric::QueueWaitMs, ticket.wait_ms as f64, Some(&key));
		lease.release().await;

		Ok(DispatchOutcome {
			stdout: truncate_capture(stdout, CAPTURE_CAP_BYTES),
			stderr: truncate_capture(stderr, CAPTURE_CAP_BYTES),
			exit_code,
		})
	}
}

fn queue_error_code(err: QueueError) -> ErrorCode {
	err.code()
}

fn pool_error_code(err: &PoolError) -> ErrorCode {
	err.code()
}

/// Whether a transport-level failure (daemon unreachable, connect refused,
/// startup failure) should fall back to local execution. Per the contract
/// this is always true — it is queue overload and pool failure that must
/// NOT fall back, since those indicate the daemon is live but can't serve
/// the request right now.
pub fn should_fall_back_locally(transport_failed: bool) -> bool {
	transport_failed
}

#[cfg(test)]
mod tests {
	use super::*;

	fn argv(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn classifies_worker_internal_entrypoints() {
		assert!(matches!(classify(&argv(&["net-tailer"])), RequestKind::WorkerInternal(_)));
	}

	#[test]
	fn classifies_control_ops_by_dotted_prefix() {
		assert!(matches!(classify(&argv(&["session.status"])), RequestKind::Control(_)));
		assert!(matches!(classify(&argv(&["daemon.start"])), RequestKind::Control(_)));
		assert!(matches!(classify(&argv(&["contract"])), RequestKind::Control(_)));
	}

	#[test]
	fn classifies_everything_else_as_run() {
		assert!(matches!(classify(&argv(&["navigate", "https://example.com"])), RequestKind::Run(_)));
	}

	#[test]
	fn empty_argv_classifies_as_control_noop() {
		assert!(matches!(classify(&[]), RequestKind::Control(_)));
	}

	#[test]
	fn bypass_table_covers_all_four_reasons() {
		let run = classify(&argv(&["navigate"]));
		assert_eq!(decide_bypass(&run, "navigate", false, false), None);
		assert_eq!(
			decide_bypass(&classify(&argv(&["net-tailer"])), "net-tailer", false, false),
			Some(BypassReason::WorkerInternal)
		);
		assert_eq!(decide_bypass(&run, "auth.listen", false, false), Some(BypassReason::StreamingVerb));
		assert_eq!(decide_bypass(&run, "navigate", true, false), Some(BypassReason::StdinFedPlan));
		assert_eq!(decide_bypass(&run, "navigate", false, true), Some(BypassReason::CwdRelativeDiagnostic));
	}

	#[test]
	fn truncation_marker_is_exact_and_deterministic() {
		let buf = vec![b'a'; 10];
		let out = truncate_capture(buf, 4);
		assert_eq!(out, "aaaa\ntruncated at 4 bytes\n(6 bytes omitted)");
	}

	#[test]
	fn under_cap_output_is_not_marked() {
		let buf = b"hello".to_vec();
		assert_eq!(truncate_capture(buf, 64), "hello");
	}

	#[test]
	fn exactly_at_cap_is_not_marked() {
		let buf = vec![b'x'; 64];
		let out = truncate_capture(buf, 64);
		assert!(!out.contains("truncated"));
	}

	#[test]
	fn transport_failure_always_falls_back_locally() {
		assert!(should_fall_back_locally(true));
		assert!(!should_fall_back_locally(false));
	}

	#[tokio::test]
	async fn queue_saturation_never_falls_back_and_reports_typed_error() {
		use crate::control::config::LaneSchedulerConfig;

		let config = LaneSchedulerConfig {
			per_lane_concurrency: 1,
			global_active_cap: 8,
			per_lane_queue_depth_cap: 1,
			queue_wait_budget_ms: 2000,
		};
		let diagnostics = Arc::new(DiagnosticsSink::noop());
		let lanes = Arc::new(LaneScheduler::new(config, Arc::clone(&diagnostics)));

		// Hold the one in-flight slot so the next enqueue attempt sees the
		// lane as saturated at depth-cap-check time.
		let held = lanes.enqueue("s-1").await.unwrap();
		let sched2 = Arc::clone(&lanes);
		let pending = tokio::spawn(async move { sched2.enqueue("s-1").await });
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;

		let result = lanes.enqueue("s-1").await;
		assert_eq!(result.unwrap_err().code(), ErrorCode::EDaemonQueueSaturated);

		drop(held);
		let _ = pending.await;
	}
}
