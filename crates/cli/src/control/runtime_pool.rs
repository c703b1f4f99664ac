//! Session runtime pool: keyed cache of live CDP browser connections with
//! an explicit state machine and lease discipline.
//!
//! The pool owns `RuntimeEntry` storage keyed by session authority;
//! [`Lease`] is a lightweight handle with a drop guard that decrements the
//! entry's borrow count exactly once. The actual CDP connect/warm operation
//! is behind the [`Connector`] trait so the state machine is testable
//! without a real browser.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Notify};

use crate::control::diagnostics::{DiagnosticsSink, Metric};
use crate::output::ErrorCode;

pub const MAX_ENTRIES: usize = 64;
pub const TIMEOUT_HARD_CLOSE_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeState {
	Absent,
	Warming,
	Ready,
	Degraded,
	Draining,
	Closed,
}

impl RuntimeState {
	/// The complete adjacency; any transition not listed here is a
	/// programmer error and `transition()` panics on it.
	fn allowed(self, next: RuntimeState) -> bool {
		use RuntimeState::*;
		matches!(
			(self, next),
			(Absent, Warming)
				| (Warming, Ready)
				| (Warming, Absent)
				| (Ready, Degraded)
				| (Degraded, Warming)
				| (Degraded, Closed)
				| (Closed, Absent)
				| (Ready, Draining)
				| (Degraded, Draining)
				| (Draining, Closed)
		)
	}
}

/// A live (or warming) CDP browser connection behind a lease.
pub trait BrowserHandle: Send + Sync + 'static {
	/// Best-effort cancellation of any in-flight CDP command on this handle.
	fn cancel_best_effort(&self);
	/// Close the underlying connection. Called when the entry is finalized.
	fn close(&self);
}

/// Establishes/verifies a browser connection for a given authority. Kept
/// behind a trait so the pool's state machine is unit-testable without a
/// real Chromium; the daemon worker wires in a `pw_rs`-backed implementation.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
	async fn warm(&self, session_id: Option<&str>, cdp_origin: &str) -> Result<Arc<dyn BrowserHandle>, String>;
}

struct RuntimeEntry {
	key: String,
	session_id: Option<String>,
	cdp_origin: String,
	state: RuntimeState,
	browser: Option<Arc<dyn BrowserHandle>>,
	borrow_count: u32,
	timeout_strikes: u32,
	last_used_at: Instant,
	/// Non-None while a warm is in flight; concurrent acquires on the same
	/// key await this instead of racing a second warm.
	warming: Option<Arc<Notify>>,
}

impl RuntimeEntry {
	fn transition(&mut self, next: RuntimeState) {
		assert!(
			self.state.allowed(next),
			"illegal runtime pool transition {:?} -> {:?} for {}",
			self.state,
			next,
			self.key
		);
		self.state = next;
	}
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
	#[error("runtime pool entry disagrees with requested session authority")]
	SessionMismatch,
	#[error("runtime pool warm attempt failed: {0}")]
	WarmFailed(String),
}

impl PoolError {
	pub fn code(&self) -> ErrorCode {
		match self {
			PoolError::SessionMismatch => ErrorCode::ERuntimePoolSessionMismatch,
			PoolError::WarmFailed(_) => ErrorCode::ERuntimePoolWarmFailed,
		}
	}
}

pub struct AcquireRequest<'a> {
	pub session_id: Option<&'a str>,
	pub cdp_origin: &'a str,
}

fn authority(request: &AcquireRequest<'_>) -> String {
	match request.session_id {
		Some(id) => format!("session:{id}"),
		None => format!("session:origin:{}", request.cdp_origin),
	}
}

/// A transferable borrow of a runtime entry. Must be released exactly once;
/// dropping it without calling [`Lease::release`] still decrements the
/// borrow count via its `Drop` impl.
pub struct Lease {
	pool: Arc<PoolInner>,
	key: String,
	/// `None` for an uncached one-off lease (pool saturated, or entry draining).
	cached: bool,
	browser: Arc<dyn BrowserHandle>,
	released: bool,
}

impl Lease {
	pub fn browser(&self) -> &Arc<dyn BrowserHandle> {
		&self.browser
	}

	pub async fn release(mut self) {
		self.released = true;
		if self.cached {
			self.pool.release(&self.key).await;
		}
	}
}

impl Drop for Lease {
	fn drop(&mut self) {
		if !self.released && self.cached {
			let pool = Arc::clone(&self.pool);
			let key = self.key.clone();
			tokio::spawn(async move { pool.release(&key).await });
		}
	}
}

struct PoolInner {
	entries: Mutex<HashMap<String, RuntimeEntry>>,
	connector: Arc<dyn Connector>,
	diagnostics: Arc<DiagnosticsSink>,
	max_entries: usize,
}

impl PoolInner {
	async fn release(&self, key: &str) {
		let mut entries = self.entries.lock().await;
		if let Some(entry) = entries.get_mut(key) {
			entry.borrow_count = entry.borrow_count.saturating_sub(1);
			if entry.state == RuntimeState::Draining && entry.borrow_count == 0 {
				if let Some(browser) = entry.browser.take() {
					browser.close();
				}
				entry.transition(RuntimeState::Closed);
				entries.remove(key);
			}
		}
	}
}

/// Keyed cache of `RuntimeEntry` with capacity `max_entries`, evicting idle
/// (`ready`, `borrow_count == 0`) entries LRU when full.
pub struct RuntimePool {
	inner: Arc<PoolInner>,
}

impl RuntimePool {
	pub fn new(connector: Arc<dyn Connector>, diagnostics: Arc<DiagnosticsSink>) -> Self {
		Self::with_capacity(connector, diagnostics, MAX_ENTRIES)
	}

	pub fn with_capacity(connector: Arc<dyn Connector>, diagnostics: Arc<DiagnosticsSink>, max_entries: usize) -> Self {
		Self {
			inner: Arc::new(PoolInner {
				entries: Mutex::new(HashMap::new()),
				connector,
				diagnostics,
				max_entries,
			}),
		}
	}

	/// Acquire a lease for `request`. Fails closed with
	/// [`PoolError::SessionMismatch`] if a cached entry under the computed
	/// key disagrees with the request's `(sessionId, cdpOrigin)`, so a key
	/// collision can never hand one session's lease to another.
	pub async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Lease, PoolError> {
		let key = authority(&request);

		loop {
			let notify = {
				let mut entries = self.inner.entries.lock().await;
				match entries.get_mut(&key) {
					Some(entry) => {
						if !session_matches(entry, &request) {
							self.inner.diagnostics.metric(Metric::SessionIsolationBreaksTotal, 1.0, None);
							return Err(PoolError::SessionMismatch);
						}
						match entry.state {
							RuntimeState::Ready => {
								entry.borrow_count += 1;
								entry.last_used_at = Instant::now();
								self.inner.diagnostics.metric(Metric::PoolCacheHit, 1.0, None);
								let browser = entry.browser.clone().expect("ready entry always has a browser");
								return Ok(Lease {
									pool: Arc::clone(&self.inner),
									key,
									cached: true,
									browser,
									released: false,
								});
							}
							RuntimeState::Warming => Some(Arc::clone(entry.warming.get_or_insert_with(|| Arc::new(Notify::new())))),
							RuntimeState::Degraded => {
								entry.transition(RuntimeState::Warming);
								entry.warming = Some(Arc::new(Notify::new()));
								None
							}
							RuntimeState::Draining => {
								// Uncached one-off: don't touch the pool slot.
								drop(entries);
								return self.warm_uncached(&request).await;
							}
							RuntimeState::Closed | RuntimeState::Absent => {
								entries.remove(&key);
								None
							}
						}
					}
					None => None,
				}
			};

			if let Some(notify) = notify {
				notify.notified().await;
				continue;
			}

			return self.warm_into_cache(&request, key.clone()).await;
		}
	}

	async fn warm_uncached(&self, request: &AcquireRequest<'_>) -> Result<Lease, PoolError> {
		self.inner.diagnostics.metric(Metric::PoolCacheMiss, 1.0, None);
		match self.inner.connector.warm(request.session_id, request.cdp_origin).await {
			Ok(browser) => Ok(Lease {
				pool: Arc::clone(&self.inner),
				key: authority(request),
				cached: false,
				browser,
				released: false,
			}),
			Err(err) => Err(PoolError::WarmFailed(err)),
		}
	}

	async fn warm_into_cache(&self, request: &AcquireRequest<'_>, key: String) -> Result<Lease, PoolError> {
		{
			let mut entries = self.inner.entries.lock().await;
			if !entries.contains_key(&key) && entries.len() >= self.inner.max_entries {
				if !self.evict_one_idle(&mut entries) {
					drop(entries);
					return self.warm_uncached(request).await;
				}
			}
			entries.entry(key.clone()).or_insert_with(|| RuntimeEntry {
				key: key.clone(),
				session_id: request.session_id.map(str::to_string),
				cdp_origin: request.cdp_origin.to_string(),
				state: RuntimeState::Absent,
				browser: None,
				borrow_count: 0,
				timeout_strikes: 0,
				last_used_at: Instant::now(),
				warming: None,
			});
			let entry = entries.get_mut(&key).unwrap();
			if entry.state == RuntimeState::Absent {
				entry.transition(RuntimeState::Warming);
				entry.warming = Some(Arc::new(Notify::new()));
			}
		}

		self.inner.diagnostics.metric(Metric::PoolCacheMiss, 1.0, None);
		let result = self.inner.connector.warm(request.session_id, request.cdp_origin).await;

		let mut entries = self.inner.entries.lock().await;
		let Some(entry) = entries.get_mut(&key) else {
			// Entry vanished (raced with a drain); fall through as uncached.
			return match result {
				Ok(browser) => Ok(Lease {
					pool: Arc::clone(&self.inner),
					key,
					cached: false,
					browser,
					released: false,
				}),
				Err(err) => Err(PoolError::WarmFailed(err)),
			};
		};
		let notify = entry.warming.take();
		match result {
			Ok(browser) => {
				entry.transition(RuntimeState::Ready);
				entry.browser = Some(browser.clone());
				entry.borrow_count += 1;
				entry.last_used_at = Instant::now();
				if let Some(notify) = notify {
					notify.notify_waiters();
				}
				Ok(Lease {
					pool: Arc::clone(&self.inner),
					key,
					cached: true,
					browser,
					released: false,
				})
			}
			Err(err) => {
				entry.transition(RuntimeState::Absent);
				entries.remove(&key);
				if let Some(notify) = notify {
					notify.notify_waiters();
				}
				Err(PoolError::WarmFailed(err))
			}
		}
	}

	/// Evict the oldest idle (`ready`, `borrow_count == 0`) entry. Returns
	/// false (and increments the overflow metric) if none are eligible.
	fn evict_one_idle(&self, entries: &mut HashMap<String, RuntimeEntry>) -> bool {
		let victim = entries
			.iter()
			.filter(|(_, e)| e.state == RuntimeState::Ready && e.borrow_count == 0)
			.min_by_key(|(_, e)| e.last_used_at)
			.map(|(k, _)| k.clone());

		match victim {
			Some(key) => {
				if let Some(mut entry) = entries.remove(&key) {
					if let Some(browser) = entry.browser.take() {
						browser.close();
					}
					entry.transition(RuntimeState::Closed);
				}
				self.inner.diagnostics.metric(Metric::RuntimePoolEvictionsTotal, 1.0, Some("lru"));
				true
			}
			None => {
				self.inner.diagnostics.metric(Metric::RuntimePoolOverflowTotal, 1.0, Some("all_busy"));
				false
			}
		}
	}

	/// On a timeout during a verb: ready -> degraded, attempt cancel; if the
	/// entry accumulates `timeoutHardCloseThreshold` strikes it is drained
	/// instead of reconnected.
	pub async fn handle_timeout(&self, key: &str) {
		let mut entries = self.inner.entries.lock().await;
		let Some(entry) = entries.get_mut(key) else { return };
		if entry.state != RuntimeState::Ready && entry.state != RuntimeState::Degraded {
			return;
		}
		if entry.state == RuntimeState::Ready {
			entry.transition(RuntimeState::Degraded);
		}
		entry.timeout_strikes += 1;
		if let Some(browser) = &entry.browser {
			browser.cancel_best_effort();
		}
		if entry.timeout_strikes >= TIMEOUT_HARD_CLOSE_THRESHOLD {
			entry.transition(RuntimeState::Draining);
			if entry.borrow_count == 0 {
				if let Some(browser) = entry.browser.take() {
					browser.close();
				}
				entry.transition(RuntimeState::Closed);
				entries.remove(key);
			}
		}
	}

	/// Evict the oldest idle ready entries under memory pressure.
	pub async fn drain_cold_entries(&self, n: usize) {
		let mut entries = self.inner.entries.lock().await;
		for _ in 0..n {
			if !self.evict_one_idle(&mut entries) {
				break;
			}
		}
	}

	pub async fn snapshot(&self) -> Vec<(String, RuntimeState, u32)> {
		let entries = self.inner.entries.lock().await;
		entries.values().map(|e| (e.key.clone(), e.state, e.borrow_count)).collect()
	}
}

fn session_matches(entry: &RuntimeEntry, request: &AcquireRequest<'_>) -> bool {
	entry.cdp_origin == request.cdp_origin && entry.session_id.as_deref() == request.session_id
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FakeHandle;
	impl BrowserHandle for FakeHandle {
		fn cancel_best_effort(&self) {}
		fn close(&self) {}
	}

	struct AlwaysWarm;
	#[async_trait::async_trait]
	impl Connector for AlwaysWarm {
		async fn warm(&self, _session_id: Option<&str>, _cdp_origin: &str) -> Result<Arc<dyn BrowserHandle>, String> {
			Ok(Arc::new(FakeHandle))
		}
	}

	struct AlwaysFail;
	#[async_trait::async_trait]
	impl Connector for AlwaysFail {
		async fn warm(&self, _session_id: Option<&str>, _cdp_origin: &str) -> Result<Arc<dyn BrowserHandle>, String> {
			Err("boom".to_string())
		}
	}

	fn pool(connector: Arc<dyn Connector>) -> RuntimePool {
		RuntimePool::new(connector, Arc::new(DiagnosticsSink::noop()))
	}

	#[tokio::test]
	async fn acquire_warms_and_caches() {
		let pool = pool(Arc::new(AlwaysWarm));
		let lease = pool
			.acquire(AcquireRequest { session_id: Some("s-1"), cdp_origin: "http://x" })
			.await
			.unwrap();
		let snap = pool.snapshot().await;
		assert_eq!(snap.len(), 1);
		assert_eq!(snap[0].1, RuntimeState::Ready);
		assert_eq!(snap[0].2, 1);
		lease.release().await;
		let snap = pool.snapshot().await;
		assert_eq!(snap[0].2, 0);
	}

	#[tokio::test]
	async fn mismatched_authority_fails_closed() {
		let pool = pool(Arc::new(AlwaysWarm));
		let lease = pool
			.acquire(AcquireRequest { session_id: Some("s-1"), cdp_origin: "http://x" })
			.await
			.unwrap();
		lease.release().await;

		// Same sessionId key but different cdpOrigin must never be satisfied
		// from cache.
		let result = pool
			.acquire(AcquireRequest { session_id: Some("s-1"), cdp_origin: "http://y" })
			.await;
		assert!(matches!(result, Err(PoolError::SessionMismatch)));
	}

	#[tokio::test]
	async fn warm_failure_removes_entry_and_propagates_typed_error() {
		let pool = pool(Arc::new(AlwaysFail));
		let result = pool
			.acquire(AcquireRequest { session_id: Some("s-1"), cdp_origin: "http://x" })
			.await;
		assert!(matches!(result, Err(PoolError::WarmFailed(_))));
		assert!(pool.snapshot().await.is_empty());
	}

	#[tokio::test]
	async fn borrowed_entries_are_never_evicted() {
		let pool = pool(Arc::new(AlwaysWarm));
		let mut leases = Vec::new();
		for i in 0..MAX_ENTRIES {
			let lease = pool
				.acquire(AcquireRequest { session_id: Some(&format!("s-{i}")), cdp_origin: "http://x" })
				.await
				.unwrap();
			leases.push(lease);
		}
		// Pool full and every entry borrowed: next acquire must be an
		// uncached overflow lease, not an eviction of a borrowed entry.
		let overflow = pool
			.acquire(AcquireRequest { session_id: Some("s-overflow"), cdp_origin: "http://x" })
			.await
			.unwrap();
		assert_eq!(pool.snapshot().await.len(), MAX_ENTRIES);
		overflow.release().await;
	}

	#[tokio::test]
	async fn hard_close_threshold_drains_entry() {
		let pool = pool(Arc::new(AlwaysWarm));
		let lease = pool
			.acquire(AcquireRequest { session_id: Some("s-1"), cdp_origin: "http://x" })
			.await
			.unwrap();
		lease.release().await;
		pool.handle_timeout("session:s-1").await;
		pool.handle_timeout("session:s-1").await;
		// Idle (borrow_count==0) at hard-close threshold: entry closes and
		// is removed outright.
		assert!(pool.snapshot().await.is_empty());
	}

	#[test]
	fn illegal_transition_panics() {
		let result = std::panic::catch_unwind(|| {
			let mut entry = RuntimeEntry {
				key: "k".into(),
				session_id: None,
				cdp_origin: "http://x".into(),
				state: RuntimeState::Absent,
				browser: None,
				borrow_count: 0,
				timeout_strikes: 0,
				last_used_at: Instant::now(),
				warming: None,
			};
			entry.transition(RuntimeState::Ready);
		});
		assert!(result.is_err());
	}
}
