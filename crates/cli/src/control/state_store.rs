//! State store: agent-scoped, sharded, versioned, lock-guarded state.
//!
//! Shares the sharded load/save shape and root resolution precedence used
//! elsewhere in this crate, adding the `StateEnvelope` schema, atomic
//! per-shard writes, a real advisory lock file (`fs2`), and
//! quarantine-on-corruption.
//!
//! Mutation is only ever reachable through [`StateStore::with_mutation`];
//! everything else returns a read-only snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::output::ErrorCode;

/// Current schema constant. A payload whose `version` disagrees is never
/// upgraded in place — it is quarantined and an empty envelope is returned.
pub const CURRENT_STATE_VERSION: u32 = 2;

const LOCK_RETRY_BUDGET: Duration = Duration::from_millis(2000);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
	#[error("state store lock not acquired within budget")]
	Locked,
	#[error("state read failed: {0}")]
	Read(#[source] io::Error),
	#[error("state envelope version mismatch: expected {expected}, found {found}")]
	Version { expected: u32, found: u32 },
	#[error("state write failed: {0}")]
	Write(#[source] io::Error),
}

impl StateStoreError {
	pub fn code(&self) -> ErrorCode {
		match self {
			StateStoreError::Locked => ErrorCode::EStateLocked,
			StateStoreError::Read(_) => ErrorCode::EStateRead,
			StateStoreError::Version { .. } => ErrorCode::EStateVersion,
			StateStoreError::Write(_) => ErrorCode::EStateRead,
		}
	}
}

pub type Result<T> = std::result::Result<T, StateStoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
	Managed,
	Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
	Persistent,
	Ephemeral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserMode {
	Headless,
	Headed,
	#[default]
	Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub session_id: String,
	pub kind: SessionKind,
	pub policy: SessionPolicy,
	pub cdp_origin: String,
	#[serde(default)]
	pub debug_port: Option<u16>,
	#[serde(default)]
	pub user_data_dir: Option<PathBuf>,
	#[serde(default)]
	pub browser_pid: Option<u32>,
	#[serde(default)]
	pub owner_id: Option<String>,
	#[serde(default)]
	pub lease_expires_at: Option<u64>,
	#[serde(default)]
	pub lease_ttl_ms: Option<u64>,
	#[serde(default)]
	pub managed_unreachable_since: Option<u64>,
	#[serde(default)]
	pub managed_unreachable_count: u32,
	#[serde(default)]
	pub browser_mode: BrowserMode,
	pub created_at: u64,
	pub last_seen_at: u64,
}

impl Session {
	/// Managed sessions may own a process; attached sessions never do.
	pub fn invariant_ok(&self) -> bool {
		match self.kind {
			SessionKind::Attached => self.browser_pid.is_none() && self.user_data_dir.is_none(),
			SessionKind::Managed => true,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
	pub target_id: String,
	pub session_id: String,
	pub url: String,
	pub title: String,
	#[serde(default)]
	pub status: Option<String>,
	pub updated_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkCapture {
	pub capture_id: String,
	pub session_id: String,
	pub started_at: u64,
	#[serde(default)]
	pub stopped_at: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkArtifact {
	pub artifact_id: String,
	pub capture_id: String,
	pub path: PathBuf,
}

/// The full logical state, as read by callers. On disk this is sharded
/// (`meta.json`, `sessions.json`, `network-captures.json`,
/// `network-artifacts.json`, `targets-by-session/<urlenc(sessionId)>.json`);
/// in memory it is one value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEnvelope {
	pub version: u32,
	pub active_session_id: Option<String>,
	pub next_session_ordinal: u64,
	pub next_capture_ordinal: u64,
	pub next_artifact_ordinal: u64,
	pub sessions: Vec<Session>,
	pub targets: Vec<Target>,
	pub network_captures: Vec<NetworkCapture>,
	pub network_artifacts: Vec<NetworkArtifact>,
	pub revision: u64,
}

impl StateEnvelope {
	fn empty() -> Self {
		Self {
			version: CURRENT_STATE_VERSION,
			..Default::default()
		}
	}

	pub fn session(&self, session_id: &str) -> Option<&Session> {
		self.sessions.iter().find(|s| s.session_id == session_id)
	}

	pub fn targets_for(&self, session_id: &str) -> impl Iterator<Item = &Target> {
		self.targets.iter().filter(move |t| t.session_id == session_id)
	}
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MetaShard {
	version: u32,
	active_session_id: Option<String>,
	next_session_ordinal: u64,
	next_capture_ordinal: u64,
	next_artifact_ordinal: u64,
	revision: u64,
}

/// Agent-scoped state store rooted at `stateRoot()`.
pub struct StateStore {
	root: PathBuf,
}

impl StateStore {
	pub fn new(root: PathBuf) -> Self {
		Self { root }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn v2_dir(&self) -> PathBuf {
		self.root.join("state-v2")
	}

	fn legacy_path(&self) -> PathBuf {
		self.root.join("state.json")
	}

	fn lock_path(&self) -> PathBuf {
		self.root.join("state.lock")
	}

	/// Read the current envelope. On parse/version mismatch the offending
	/// file is quarantined to `state.corrupt.<ts>` and an empty envelope is
	/// returned; callers report the quarantine via a typed error at the
	/// ingress layer rather than silently upgrading.
	pub fn read(&self) -> Result<StateEnvelope> {
		fs::create_dir_all(&self.root).map_err(StateStoreError::Read)?;

		if self.v2_dir().join("meta.json").exists() {
			return self.read_v2();
		}
		if self.legacy_path().exists() {
			return self.read_legacy();
		}
		Ok(StateEnvelope::empty())
	}

	fn read_v2(&self) -> Result<StateEnvelope> {
		let dir = self.v2_dir();
		let meta: MetaShard = match read_json(&dir.join("meta.json")) {
			Ok(Some(meta)) => meta,
			Ok(None) => return Ok(StateEnvelope::empty()),
			Err(_) => {
				self.quarantine(&dir.join("meta.json"));
				return Ok(StateEnvelope::empty());
			}
		};
		if meta.version != CURRENT_STATE_VERSION {
			self.quarantine(&dir.join("meta.json"));
			return Ok(StateEnvelope::empty());
		}

		let sessions: Vec<Session> = read_json(&dir.join("sessions.json")).ok().flatten().unwrap_or_default();
		let network_captures: Vec<NetworkCapture> =
			read_json(&dir.join("network-captures.json")).ok().flatten().unwrap_or_default();
		let network_artifacts: Vec<NetworkArtifact> =
			read_json(&dir.join("network-artifacts.json")).ok().flatten().unwrap_or_default();

		let mut targets = Vec::new();
		let shard_dir = dir.join("targets-by-session");
		if let Ok(entries) = fs::read_dir(&shard_dir) {
			for entry in entries.flatten() {
				if let Ok(Some(mut shard)) = read_json::<Vec<Target>>(&entry.path()) {
					targets.append(&mut shard);
				}
			}
		}

		Ok(StateEnvelope {
			version: meta.version,
			active_session_id: meta.active_session_id,
			next_session_ordinal: meta.next_session_ordinal,
			next_capture_ordinal: meta.next_capture_ordinal,
			next_artifact_ordinal: meta.next_artifact_ordinal,
			sessions,
			targets,
			network_captures,
			network_artifacts,
			revision: meta.revision,
		})
	}

	fn read_legacy(&self) -> Result<StateEnvelope> {
		let path = self.legacy_path();
		match read_json::<StateEnvelope>(&path) {
			Ok(Some(envelope)) if envelope.version == CURRENT_STATE_VERSION => Ok(envelope),
			Ok(Some(envelope)) => {
				self.quarantine(&path);
				let _ = envelope;
				Ok(StateEnvelope::empty())
			}
			Ok(None) => Ok(StateEnvelope::empty()),
			Err(_) => {
				self.quarantine(&path);
				Ok(StateEnvelope::empty())
			}
		}
	}

	fn quarantine(&self, path: &Path) {
		if !path.exists() {
			return;
		}
		let ts = now_ms();
		let dest = self.root.join(format!("state.corrupt.{ts}"));
		let _ = fs::rename(path, &dest);
	}

	/// Acquire the exclusive lock, read, apply `f`, and write the result back
	/// atomically shard-by-shard. Returns whatever `f` returns alongside the
	/// applied mutation's resulting envelope.
	pub fn with_mutation<T>(&self, f: impl FnOnce(&mut StateEnvelope) -> T) -> Result<T> {
		fs::create_dir_all(&self.root).map_err(StateStoreError::Write)?;
		let lock_file = self.acquire_lock()?;

		let mut envelope = self.read()?;
		let out = f(&mut envelope);
		envelope.revision += 1;
		self.write_v2(&envelope)?;

		drop(lock_file);
		Ok(out)
	}

	fn acquire_lock(&self) -> Result<File> {
		let file = OpenOptions::new()
			.create(true)
			.write(true)
			.open(self.lock_path())
			.map_err(StateStoreError::Write)?;

		let deadline = Instant::now() + LOCK_RETRY_BUDGET;
		loop {
			match file.try_lock_exclusive() {
				Ok(()) => return Ok(file),
				Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_RETRY_INTERVAL),
				Err(_) => return Err(StateStoreError::Locked),
			}
		}
	}

	fn write_v2(&self, envelope: &StateEnvelope) -> Result<()> {
		let dir = self.v2_dir();
		fs::create_dir_all(&dir).map_err(StateStoreError::Write)?;
		fs::create_dir_all(dir.join("targets-by-session")).map_err(StateStoreError::Write)?;

		let meta = MetaShard {
			version: CURRENT_STATE_VERSION,
			active_session_id: envelope.active_session_id.clone(),
			next_session_ordinal: envelope.next_session_ordinal,
			next_capture_ordinal: envelope.next_capture_ordinal,
			next_artifact_ordinal: envelope.next_artifact_ordinal,
			revision: envelope.revision,
		};
		write_json_atomic(&dir.join("meta.json"), &meta)?;
		write_json_atomic(&dir.join("sessions.json"), &envelope.sessions)?;
		write_json_atomic(&dir.join("network-captures.json"), &envelope.network_captures)?;
		write_json_atomic(&dir.join("network-artifacts.json"), &envelope.network_artifacts)?;

		// Clear stale per-session shards, then rewrite only the sessions that
		// currently have targets (orphans are prunable per the data model).
		let shard_dir = dir.join("targets-by-session");
		if let Ok(entries) = fs::read_dir(&shard_dir) {
			for entry in entries.flatten() {
				let _ = fs::remove_file(entry.path());
			}
		}
		let mut by_session: std::collections::BTreeMap<&str, Vec<&Target>> = std::collections::BTreeMap::new();
		for target in &envelope.targets {
			by_session.entry(target.session_id.as_str()).or_default().push(target);
		}
		for (session_id, targets) in by_session {
			let path = shard_dir.join(format!("{}.json", urlencode(session_id)));
			write_json_atomic(&path, &targets)?;
		}

		Ok(())
	}

	/// Allocate the next session ordinal, stamping it into the envelope in
	/// the same mutation that creates the session.
	pub fn allocate_session_id(&self, envelope: &mut StateEnvelope) -> String {
		let ordinal = envelope.next_session_ordinal;
		envelope.next_session_ordinal += 1;
		format!("s-{ordinal}")
	}

	pub fn allocate_capture_id(&self, envelope: &mut StateEnvelope) -> String {
		let ordinal = envelope.next_capture_ordinal;
		envelope.next_capture_ordinal += 1;
		format!("cap-{ordinal}")
	}

	pub fn allocate_artifact_id(&self, envelope: &mut StateEnvelope) -> String {
		let ordinal = envelope.next_artifact_ordinal;
		envelope.next_artifact_ordinal += 1;
		format!("art-{ordinal}")
	}
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> std::result::Result<Option<T>, ()> {
	match fs::read_to_string(path) {
		Ok(content) => serde_json::from_str(&content).map(Some).map_err(|_| ()),
		Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(_) => Err(()),
	}
}

/// Write-to-temp-then-rename: no partial shard is ever observable.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
	let tmp = path.with_extension("json.tmp");
	{
		let mut file = File::create(&tmp).map_err(StateStoreError::Write)?;
		let bytes = serde_json::to_vec_pretty(value).map_err(|e| StateStoreError::Write(io::Error::other(e)))?;
		file.write_all(&bytes).map_err(StateStoreError::Write)?;
		file.sync_all().map_err(StateStoreError::Write)?;
	}
	fs::rename(&tmp, path).map_err(StateStoreError::Write)?;
	Ok(())
}

fn urlencode(value: &str) -> String {
	value
		.bytes()
		.map(|b| {
			if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
				(b as char).to_string()
			} else {
				format!("%{:02X}", b)
			}
		})
		.collect()
}

fn now_ms() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
	use super::*;

	fn new_store() -> (tempfile::TempDir, StateStore) {
		let tmp = tempfile::tempdir().unwrap();
		let store = StateStore::new(tmp.path().to_path_buf());
		(tmp, store)
	}

	#[test]
	fn read_on_empty_root_returns_empty_envelope() {
		let (_tmp, store) = new_store();
		let envelope = store.read().unwrap();
		assert_eq!(envelope.version, CURRENT_STATE_VERSION);
		assert!(envelope.sessions.is_empty());
	}

	#[test]
	fn mutation_is_atomic_and_bumps_revision() {
		let (_tmp, store) = new_store();
		store
			.with_mutation(|env| {
				let id = store.allocate_session_id(env);
				env.sessions.push(Session {
					session_id: id.clone(),
					kind: SessionKind::Managed,
					policy: SessionPolicy::Ephemeral,
					cdp_origin: "http://127.0.0.1:9222".into(),
					debug_port: Some(9222),
					user_data_dir: None,
					browser_pid: Some(100),
					owner_id: None,
					lease_expires_at: None,
					lease_ttl_ms: None,
					managed_unreachable_since: None,
					managed_unreachable_count: 0,
					browser_mode: BrowserMode::Headless,
					created_at: 0,
					last_seen_at: 0,
				});
			})
			.unwrap();

		let envelope = store.read().unwrap();
		assert_eq!(envelope.sessions.len(), 1);
		assert_eq!(envelope.revision, 1);

		store.with_mutation(|_| {}).unwrap();
		let envelope = store.read().unwrap();
		assert_eq!(envelope.revision, 2);
		assert_eq!(envelope.sessions.len(), 1, "unrelated mutation must not drop existing sessions");
	}

	#[test]
	fn version_mismatch_quarantines_and_returns_empty() {
		let (tmp, store) = new_store();
		fs::create_dir_all(tmp.path().join("state-v2")).unwrap();
		fs::write(
			tmp.path().join("state-v2/meta.json"),
			r#"{"version":999,"activeSessionId":null,"nextSessionOrdinal":0,"nextCaptureOrdinal":0,"nextArtifactOrdinal":0,"revision":0}"#,
		)
		.unwrap();

		let envelope = store.read().unwrap();
		assert_eq!(envelope.version, CURRENT_STATE_VERSION);
		assert!(envelope.sessions.is_empty());

		let quarantined = fs::read_dir(tmp.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.any(|e| e.file_name().to_string_lossy().starts_with("state.corrupt."));
		assert!(quarantined, "expected a state.corrupt.<ts> file");
	}

	#[test]
	fn corrupt_json_is_quarantined_not_silently_parsed() {
		let (tmp, store) = new_store();
		fs::write(tmp.path().join("state.json"), "{").unwrap();

		let envelope = store.read().unwrap();
		assert!(envelope.sessions.is_empty());
		let quarantined = fs::read_dir(tmp.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.any(|e| e.file_name().to_string_lossy().starts_with("state.corrupt."));
		assert!(quarantined);
	}

	#[test]
	fn lock_contention_returns_typed_error() {
		let (_tmp, store) = new_store();
		let lock_file = OpenOptions::new().create(true).write(true).open(store.lock_path()).unwrap();
		lock_file.lock_exclusive().unwrap();

		let result = store.with_mutation(|_| {});
		assert!(matches!(result, Err(StateStoreError::Locked)));
	}

	#[test]
	fn attached_session_invariant_rejects_owned_process_fields() {
		let attached = Session {
			session_id: "s-1".into(),
			kind: SessionKind::Attached,
			policy: SessionPolicy::Persistent,
			cdp_origin: "http://127.0.0.1:9222".into(),
			debug_port: None,
			user_data_dir: Some(PathBuf::from("/tmp/profile")),
			browser_pid: None,
			owner_id: None,
			lease_expires_at: None,
			lease_ttl_ms: None,
			managed_unreachable_since: None,
			managed_unreachable_count: 0,
			browser_mode: BrowserMode::Unknown,
			created_at: 0,
			last_seen_at: 0,
		};
		assert!(!attached.invariant_ok());
	}

	#[test]
	fn targets_are_sharded_per_session_and_round_trip() {
		let (_tmp, store) = new_store();
		store
			.with_mutation(|env| {
				env.targets.push(Target {
					target_id: "t-1".into(),
					session_id: "s-1".into(),
					url: "https://example.com".into(),
					title: "Example".into(),
					status: None,
					updated_at: 0,
				});
			})
			.unwrap();

		let dir = store.v2_dir().join("targets-by-session");
		let shard = dir.join(format!("{}.json", urlencode("s-1")));
		assert!(shard.exists());

		let envelope = store.read().unwrap();
		assert_eq!(envelope.targets.len(), 1);
		assert_eq!(envelope.targets[0].target_id, "t-1");
	}
}
