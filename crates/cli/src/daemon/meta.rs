//! `daemon.json`: the loopback daemon's discovery file.
//!
//! Written by the daemon immediately after it binds its ephemeral port,
//! read by clients deciding whether (and how) to connect. Mode 0600,
//! owned by the current user; a file that fails either check is treated
//! as stale and deleted rather than trusted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DAEMON_META_FILE: &str = "daemon.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonMeta {
	pub pid: u32,
	pub host: String,
	pub port: u16,
	pub token: String,
	#[serde(rename = "startedAt")]
	pub started_at: String,
}

impl DaemonMeta {
	pub fn new(port: u16) -> Self {
		Self {
			pid: std::process::id(),
			host: "127.0.0.1".to_string(),
			port,
			token: generate_token(),
			started_at: now_iso8601(),
		}
	}

	pub fn path(state_root: &Path) -> PathBuf {
		state_root.join(DAEMON_META_FILE)
	}

	/// Persist with mode 0600. Written via a temp file and rename so a
	/// concurrently-starting reader never observes a partial write.
	pub fn write(&self, state_root: &Path) -> io::Result<()> {
		fs::create_dir_all(state_root)?;
		let path = Self::path(state_root);
		let tmp = path.with_extension("json.tmp");
		let bytes = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
		fs::write(&tmp, bytes)?;
		set_owner_only_permissions(&tmp)?;
		fs::rename(&tmp, &path)?;
		Ok(())
	}

	/// Read and validate the meta file's permissions. A world/group
	/// readable or non-owned file is treated as absent so a stale daemon's
	/// leftover file can never be mistaken for a live one.
	pub fn read(state_root: &Path) -> io::Result<Option<Self>> {
		let path = Self::path(state_root);
		let content = match fs::read_to_string(&path) {
			Ok(content) => content,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err),
		};

		if !has_owner_only_permissions(&path)? {
			let _ = fs::remove_file(&path);
			return Ok(None);
		}

		match serde_json::from_str(&content) {
			Ok(meta) => Ok(Some(meta)),
			Err(_) => {
				let _ = fs::remove_file(&path);
				Ok(None)
			}
		}
	}

	pub fn remove(state_root: &Path) {
		let _ = fs::remove_file(Self::path(state_root));
	}
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> io::Result<()> {
	Ok(())
}

#[cfg(unix)]
fn has_owner_only_permissions(path: &Path) -> io::Result<bool> {
	use std::os::unix::fs::MetadataExt;
	let metadata = fs::metadata(path)?;
	let mode_ok = metadata.mode() & 0o077 == 0;
	let owned_by_us = metadata.uid() == current_euid();
	Ok(mode_ok && owned_by_us)
}

#[cfg(unix)]
fn current_euid() -> u32 {
	unsafe extern "C" {
		fn geteuid() -> u32;
	}
	// SAFETY: geteuid takes no arguments, performs no allocation, and cannot fail.
	unsafe { geteuid() }
}

#[cfg(not(unix))]
fn has_owner_only_permissions(_path: &Path) -> io::Result<bool> {
	Ok(true)
}

fn generate_token() -> String {
	let a: u64 = rand::random();
	let b: u64 = rand::random();
	format!("{a:016x}{b:016x}")
}

fn now_iso8601() -> String {
	let secs = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs();
	epoch_seconds_to_iso8601(secs)
}

fn epoch_seconds_to_iso8601(secs: u64) -> String {
	let days = (secs / 86_400) as i64;
	let rem = secs % 86_400;
	let (y, m, d) = civil_from_days(days);
	let (hh, mm, ss) = (rem / 3600, (rem % 3600) / 60, rem % 60);
	format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z")
}

/// Howard Hinnant's `civil_from_days`: days-since-epoch to (year, month, day),
/// proleptic Gregorian, without pulling in a date/time crate for one field.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
	let z = z + 719_468;
	let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
	let doe = (z - era * 146_097) as u64;
	let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
	let y = yoe as i64 + era * 400;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
	let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
	let y = if m <= 2 { y + 1 } else { y };
	(y, m, d)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn epoch_zero_is_unix_epoch_date() {
		assert_eq!(epoch_seconds_to_iso8601(0), "1970-01-01T00:00:00Z");
	}

	#[test]
	fn round_trips_through_write_and_read() {
		let dir = tempfile::tempdir().unwrap();
		let meta = DaemonMeta::new(54321);
		meta.write(dir.path()).unwrap();
		let read_back = DaemonMeta::read(dir.path()).unwrap().unwrap();
		assert_eq!(read_back.port, 54321);
		assert_eq!(read_back.pid, meta.pid);
		assert_eq!(read_back.token, meta.token);
	}

	#[test]
	fn missing_file_reads_as_none() {
		let dir = tempfile::tempdir().unwrap();
		assert!(DaemonMeta::read(dir.path()).unwrap().is_none());
	}

	#[cfg(unix)]
	#[test]
	fn world_readable_file_is_rejected_and_removed() {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		let meta = DaemonMeta::new(1);
		meta.write(dir.path()).unwrap();
		let path = DaemonMeta::path(dir.path());
		fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

		assert!(DaemonMeta::read(dir.path()).unwrap().is_none());
		assert!(!path.exists());
	}
}
