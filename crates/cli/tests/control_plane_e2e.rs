//! Literal end-to-end scenarios from the control-plane contract, driven
//! through the compiled `pw` binary rather than in-process unit tests.
//! These don't require a real browser/CDP connection: `session new`/
//! `session attach` only touch the state store, and state corruption is a
//! filesystem-level concern.

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

fn pw_binary() -> PathBuf {
	let mut path = std::env::current_exe().unwrap();
	path.pop();
	path.pop();
	path.push("pw");
	path
}

fn run_pw(state_dir: &std::path::Path, args: &[&str]) -> (bool, String, String) {
	let output = Command::new(pw_binary())
		.env("SURFWRIGHT_STATE_DIR", state_dir)
		.env_remove("SURFWRIGHT_DAEMON")
		.args(args)
		.output()
		.expect("failed to execute pw");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	(output.status.success(), stdout, stderr)
}

/// S1: parallel `session new --session-id s-x` twice must yield exactly one
/// `{ok:true,sessionId:"s-x",created:true}` and exactly one
/// `{ok:false,code:"E_SESSION_EXISTS"}`. The state store's lock file
/// serializes the two `with_mutation` calls so the second one always
/// observes the first's write before deciding whether to fail.
#[test]
fn s1_parallel_session_new_exactly_one_succeeds() {
	let tmp = TempDir::new().unwrap();
	let state_dir = tmp.path().to_path_buf();

	let a = {
		let state_dir = state_dir.clone();
		std::thread::spawn(move || run_pw(&state_dir, &["-f", "ndjson", "session", "new", "--session-id", "s-x"]))
	};
	let b = {
		let state_dir = state_dir.clone();
		std::thread::spawn(move || run_pw(&state_dir, &["-f", "ndjson", "session", "new", "--session-id", "s-x"]))
	};

	let (success_a, stdout_a, _) = a.join().unwrap();
	let (success_b, stdout_b, _) = b.join().unwrap();

	let successes = [success_a, success_b].iter().filter(|s| **s).count();
	assert_eq!(successes, 1, "exactly one of the two racing `session new` calls must succeed");

	let outputs = [stdout_a, stdout_b];
	let winner = outputs.iter().find(|s| s.contains("\"ok\":true")).expect("one success envelope");
	assert!(winner.contains("\"sessionId\":\"s-x\""));
	assert!(winner.contains("\"created\":true"));

	let loser = outputs.iter().find(|s| s.contains("\"ok\":false")).expect("one failure envelope");
	assert!(loser.contains("E_SESSION_EXISTS"));
}

/// S6: corrupting `state.json` makes the next verb quarantine it rather than
/// parse it, and leaves a usable empty envelope behind.
#[test]
fn s6_corrupt_state_file_is_quarantined_and_recovers() {
	let tmp = TempDir::new().unwrap();
	let state_dir = tmp.path().to_path_buf();
	std::fs::create_dir_all(&state_dir).unwrap();
	std::fs::write(state_dir.join("state.json"), "{").unwrap();

	let (success, stdout, _stderr) = run_pw(&state_dir, &["-f", "ndjson", "session", "new", "--session-id", "s-1"]);
	assert!(success, "a fresh (quarantined) envelope must still be usable: {stdout}");
	assert!(stdout.contains("\"sessionId\":\"s-1\""));

	let quarantined = std::fs::read_dir(&state_dir)
		.unwrap()
		.filter_map(|e| e.ok())
		.any(|e| e.file_name().to_string_lossy().starts_with("state.corrupt."));
	assert!(quarantined, "expected a state.corrupt.<ts> file next to the quarantined state.json");
}

/// S2-adjacent: attaching a session with an explicit id that already exists
/// fails the same way as `session new` (both share the `with_mutation`
/// exists-check), never silently overwriting the existing record.
#[test]
fn attach_fails_closed_on_colliding_session_id() {
	let tmp = TempDir::new().unwrap();
	let state_dir = tmp.path().to_path_buf();

	let (first_ok, _, _) = run_pw(&state_dir, &["-f", "ndjson", "session", "new", "--session-id", "s-dup"]);
	assert!(first_ok);

	let (second_ok, stdout, _) = run_pw(
		&state_dir,
		&["-f", "ndjson", "session", "attach", "--session-id", "s-dup", "--cdp-origin", "http://127.0.0.1:9222"],
	);
	assert!(!second_ok);
	assert!(stdout.contains("E_SESSION_EXISTS"));
}

/// S5 (contract variant): the `contractFingerprint` the registry computes
/// is stable across separate process invocations, not just within one
/// process's lifetime.
#[test]
fn contract_fingerprint_is_stable_across_process_invocations() {
	let tmp = TempDir::new().unwrap();
	let state_dir = tmp.path().to_path_buf();

	let (ok_a, stdout_a, _) = run_pw(&state_dir, &["-f", "ndjson", "contract"]);
	let (ok_b, stdout_b, _) = run_pw(&state_dir, &["-f", "ndjson", "contract"]);
	assert!(ok_a && ok_b);

	let fp_a: serde_json::Value = serde_json::from_str(&stdout_a).unwrap();
	let fp_b: serde_json::Value = serde_json::from_str(&stdout_b).unwrap();
	assert_eq!(fp_a["data"]["contractFingerprint"], fp_b["data"]["contractFingerprint"]);
	assert!(fp_a["data"]["commands"].as_array().unwrap().len() > 0);
	assert!(fp_a["data"]["errors"].as_array().unwrap().len() > 0);
}

/// A newly created session without an explicit id gets the state store's
/// monotonic ordinal allocator rather than colliding with another session.
#[test]
fn session_new_without_explicit_id_allocates_distinct_ids() {
	let tmp = TempDir::new().unwrap();
	let state_dir = tmp.path().to_path_buf();

	let (ok_a, stdout_a, _) = run_pw(&state_dir, &["-f", "ndjson", "session", "new"]);
	let (ok_b, stdout_b, _) = run_pw(&state_dir, &["-f", "ndjson", "session", "new"]);
	assert!(ok_a && ok_b);

	let a: serde_json::Value = serde_json::from_str(&stdout_a).unwrap();
	let b: serde_json::Value = serde_json::from_str(&stdout_b).unwrap();
	assert_ne!(a["data"]["sessionId"], b["data"]["sessionId"]);
}
