//! Lane scheduler: per-session FIFO lane with queue depth cap, wait budget,
//! global active cap, and round-robin fairness across lanes.
//!
//! Modeled as an explicit per-lane dispatcher task reading from a bounded
//! `tokio::sync::mpsc` channel, not a generic work queue with locks. Each
//! lane owns a `tokio::sync::Semaphore` permit sized to its concurrency; a
//! global semaphore caps total active dispatches across lanes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};

use crate::control::config::LaneSchedulerConfig;
use crate::control::diagnostics::{DiagnosticsSink, Metric};
use crate::output::ErrorCode;

/// Lane key precedence: `sessionId -> cdpOrigin -> "control:default"`.
pub fn lane_key(session_id: Option<&str>, cdp_origin: Option<&str>) -> String {
	match (session_id, cdp_origin) {
		(Some(id), _) => id.to_string(),
		(None, Some(origin)) => origin.to_string(),
		(None, None) => "control:default".to_string(),
	}
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
	/// Lane queue depth cap reached at enqueue time.
	#[error("lane queue depth cap reached")]
	Saturated,
	/// The wait timer expired before dispatch became possible.
	#[error("lane queue wait budget expired")]
	Timeout,
	/// Caller cancelled before dispatch.
	#[error("request cancelled before dispatch")]
	Cancelled,
}

impl QueueError {
	pub fn code(self) -> ErrorCode {
		match self {
			QueueError::Saturated => ErrorCode::EDaemonQueueSaturated,
			QueueError::Timeout => ErrorCode::EDaemonQueueTimeout,
			QueueError::Cancelled => ErrorCode::EInternal,
		}
	}
}

struct Lane {
	sender: mpsc::Sender<QueuedWork>,
	depth: Arc<Mutex<usize>>,
}

struct QueuedWork {
	enqueued_at: Instant,
	wait_deadline: Instant,
	respond: oneshot::Sender<Result<DispatchTicket, QueueError>>,
}

/// Held by the caller while its turn is dispatched; dropping it releases the
/// per-lane and global concurrency permits.
pub struct DispatchTicket {
	_lane_permit: tokio::sync::OwnedSemaphorePermit,
	_global_permit: tokio::sync::OwnedSemaphorePermit,
	pub wait_ms: u64,
}

/// The scheduler: a map of lane name -> dispatcher, a global active-dispatch
/// cap, and the Lean v1 parameters (queue depth cap, wait budget).
pub struct LaneScheduler {
	lanes: Mutex<HashMap<String, Lane>>,
	global: Arc<Semaphore>,
	config: LaneSchedulerConfig,
	diagnostics: Arc<DiagnosticsSink>,
}

impl LaneScheduler {
	pub fn new(config: LaneSchedulerConfig, diagnostics: Arc<DiagnosticsSink>) -> Self {
		Self {
			lanes: Mutex::new(HashMap::new()),
			global: Arc::new(Semaphore::new(config.global_active_cap)),
			config,
			diagnostics,
		}
	}

	/// Enqueue on `key`'s lane and await dispatch. Resolves to a
	/// [`DispatchTicket`] once both the per-lane (concurrency 1) and global
	/// permits are available, or to one of the two mutually exclusive
	/// overload codes. `E_DAEMON_QUEUE_SATURATED` and
	/// `E_DAEMON_QUEUE_TIMEOUT` are never both possible for the same enqueue:
	/// saturation is checked synchronously at enqueue, before any wait timer
	/// starts.
	pub async fn enqueue(&self, key: &str) -> Result<DispatchTicket, QueueError> {
		let lane_sender = self.lane_sender(key).await;

		{
			let lanes = self.lanes.lock().await;
			let lane = lanes.get(key).expect("lane just created");
			let depth = lane.depth.lock().await;
			self.diagnostics.metric(Metric::QueueDepth, *depth as f64, Some(key));
			if *depth >= self.config.per_lane_queue_depth_cap {
				self.diagnostics.metric(Metric::QueueRejectsTotal, 1.0, Some("saturated"));
				return Err(QueueError::Saturated);
			}
		}

		{
			let lanes = self.lanes.lock().await;
			let lane = lanes.get(key).expect("lane just created");
			*lane.depth.lock().await += 1;
		}

		let enqueued_at = Instant::now();
		let wait_deadline = enqueued_at + Duration::from_millis(self.config.queue_wait_budget_ms);
		let (tx, rx) = oneshot::channel();
		let work = QueuedWork { enqueued_at, wait_deadline, respond: tx };

		if lane_sender.send(work).await.is_err() {
			return Err(QueueError::Cancelled);
		}

		let result = match tokio::time::timeout_at(wait_deadline.into(), rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(QueueError::Cancelled),
			Err(_) => {
				self.diagnostics.metric(Metric::QueueRejectsTotal, 1.0, Some("timeout"));
				Err(QueueError::Timeout)
			}
		};

		let wait_ms = enqueued_at.elapsed().as_millis() as u64;
		self.diagnostics.metric(Metric::QueueWaitMs, wait_ms as f64, Some(key));

		self.dec_depth(key).await;
		result
	}

	async fn dec_depth(&self, key: &str) {
		let lanes = self.lanes.lock().await;
		if let Some(lane) = lanes.get(key) {
			let mut depth = lane.depth.lock().await;
			*depth = depth.saturating_sub(1);
		}
	}

	async fn lane_sender(&self, key: &str) -> mpsc::Sender<QueuedWork> {
		let mut lanes = self.lanes.lock().await;
		if let Some(lane) = lanes.get(key) {
			return lane.sender.clone();
		}

		let (tx, rx) = mpsc::channel(self.config.per_lane_queue_depth_cap.max(1));
		let depth = Arc::new(Mutex::new(0usize));
		lanes.insert(key.to_string(), Lane { sender: tx.clone(), depth: Arc::clone(&depth) });

		let global = Arc::clone(&self.global);
		let per_lane_concurrency = self.config.per_lane_concurrency;
		tokio::spawn(dispatch_loop(rx, global, per_lane_concurrency));

		tx
	}
}

/// Per-lane dispatcher: strictly serial within the lane (concurrency 1 by
/// default), blocking on the global cap before handing the caller its
/// ticket. A stalled lane (its one in-flight dispatch taking a long time)
/// cannot starve other lanes because each lane has its own task and queue.
async fn dispatch_loop(mut rx: mpsc::Receiver<QueuedWork>, global: Arc<Semaphore>, per_lane_concurrency: usize) {
	let lane_sem = Arc::new(Semaphore::new(per_lane_concurrency));
	while let Some(work) = rx.recv().await {
		if Instant::now() >= work.wait_deadline {
			// Already past budget; responder side will have timed out too,
			// but don't bother acquiring permits for dead work.
			continue;
		}

		let lane_sem = Arc::clone(&lane_sem);
		let global = Arc::clone(&global);
		tokio::spawn(async move {
			let Ok(lane_permit) = lane_sem.acquire_owned().await else { return };
			let Ok(global_permit) = global.acquire_owned().await else { return };
			let wait_ms = work.enqueued_at.elapsed().as_millis() as u64;
			let _ = work.respond.send(Ok(DispatchTicket {
				_lane_permit: lane_permit,
				_global_permit: global_permit,
				wait_ms,
			}));
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scheduler(config: LaneSchedulerConfig) -> LaneScheduler {
		LaneScheduler::new(config, Arc::new(DiagnosticsSink::noop()))
	}

	#[test]
	fn lane_key_precedence() {
		assert_eq!(lane_key(Some("s-1"), Some("http://x")), "s-1");
		assert_eq!(lane_key(None, Some("http://x")), "http://x");
		assert_eq!(lane_key(None, None), "control:default");
	}

	#[tokio::test]
	async fn single_request_dispatches_immediately() {
		let sched = scheduler(LaneSchedulerConfig::default());
		let ticket = sched.enqueue("s-1").await.unwrap();
		assert!(ticket.wait_ms < 1000);
	}

	#[tokio::test]
	async fn queue_depth_cap_rejects_with_saturated_not_timeout() {
		let config = LaneSchedulerConfig {
			per_lane_concurrency: 1,
			global_active_cap: 8,
			per_lane_queue_depth_cap: 1,
			queue_wait_budget_ms: 2000,
		};
		let sched = Arc::new(scheduler(config));

		// Hold the one in-flight slot open by never dropping its ticket.
		let held = sched.enqueue("s-1").await.unwrap();

		// Fill the queue depth cap (1) with a pending enqueue.
		let sched2 = Arc::clone(&sched);
		let pending = tokio::spawn(async move { sched2.enqueue("s-1").await });
		tokio::time::sleep(Duration::from_millis(50)).await;

		// The lane is now full; a further enqueue must be rejected as
		// saturated, not time out.
		let result = sched.enqueue("s-1").await;
		assert_eq!(result.unwrap_err(), QueueError::Saturated);

		drop(held);
		let _ = pending.await;
	}

	#[tokio::test]
	async fn wait_budget_timeout_when_lane_never_frees() {
		let config = LaneSchedulerConfig {
			per_lane_concurrency: 1,
			global_active_cap: 8,
			per_lane_queue_depth_cap: 8,
			queue_wait_budget_ms: 80,
		};
		let sched = Arc::new(scheduler(config));
		let held = sched.enqueue("s-1").await.unwrap();

		let result = sched.enqueue("s-1").await;
		assert_eq!(result.unwrap_err(), QueueError::Timeout);
		drop(held);
	}

	#[tokio::test]
	async fn unrelated_lanes_do_not_block_each_other() {
		let sched = Arc::new(scheduler(LaneSchedulerConfig::default()));
		let held = sched.enqueue("s-1").await.unwrap();

		let other = tokio::time::timeout(Duration::from_millis(200), sched.enqueue("s-2")).await;
		assert!(other.is_ok(), "lane s-2 must dispatch despite s-1 being held");
		drop(held);
	}
}
