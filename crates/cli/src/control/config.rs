//! Resolution of control-plane configuration: agent id, workspace/state
//! roots, and daemon/lane-scheduler knobs.
//!
//! Follows the same precedence the rest of the CLI uses for workspace
//! resolution: explicit value wins, then environment variable, then a
//! computed default.

use std::path::{Path, PathBuf};

use crate::workspace::STATE_VERSION_DIR;

pub const ENV_AGENT_ID: &str = "SURFWRIGHT_AGENT_ID";
pub const ENV_WORKSPACE_DIR: &str = "SURFWRIGHT_WORKSPACE_DIR";
pub const ENV_STATE_DIR: &str = "SURFWRIGHT_STATE_DIR";
pub const ENV_DAEMON: &str = "SURFWRIGHT_DAEMON";

/// Lane scheduler knobs, overridable so operators can tune concurrency and
/// queueing without a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct LaneSchedulerConfig {
	pub per_lane_concurrency: usize,
	pub global_active_cap: usize,
	pub per_lane_queue_depth_cap: usize,
	pub queue_wait_budget_ms: u64,
}

impl Default for LaneSchedulerConfig {
	fn default() -> Self {
		Self {
			per_lane_concurrency: 1,
			global_active_cap: 8,
			per_lane_queue_depth_cap: 8,
			queue_wait_budget_ms: 2000,
		}
	}
}

/// Runtime pool knobs.
#[derive(Debug, Clone, Copy)]
pub struct RuntimePoolConfig {
	pub max_entries: usize,
	pub timeout_hard_close_threshold: u32,
}

impl Default for RuntimePoolConfig {
	fn default() -> Self {
		Self {
			max_entries: 64,
			timeout_hard_close_threshold: 2,
		}
	}
}

/// Resolved control-plane configuration for one invocation.
#[derive(Debug, Clone)]
pub struct SurfwrightConfig {
	pub agent_id: Option<String>,
	pub workspace_dir: PathBuf,
	pub state_dir_override: Option<PathBuf>,
	pub daemon_enabled: bool,
	pub lane: LaneSchedulerConfig,
	pub pool: RuntimePoolConfig,
	pub verbose_diagnostics: bool,
}

/// CLI-supplied overrides; any field left `None`/`false` falls through to
/// environment, then default.
#[derive(Debug, Clone, Default)]
pub struct SurfwrightConfigArgs {
	pub agent_id: Option<String>,
	pub workspace_dir: Option<PathBuf>,
	pub state_dir: Option<PathBuf>,
	pub no_daemon: bool,
	pub verbose_diagnostics: bool,
}

impl SurfwrightConfig {
	pub fn resolve(args: SurfwrightConfigArgs, fallback_workspace_root: &Path) -> Self {
		let agent_id = args
			.agent_id
			.or_else(|| std::env::var(ENV_AGENT_ID).ok())
			.filter(|s| !s.is_empty());

		let workspace_dir = args
			.workspace_dir
			.or_else(|| std::env::var_os(ENV_WORKSPACE_DIR).map(PathBuf::from))
			.unwrap_or_else(|| fallback_workspace_root.to_path_buf());

		let state_dir_override = args
			.state_dir
			.or_else(|| std::env::var_os(ENV_STATE_DIR).map(PathBuf::from));

		let daemon_enabled = !args.no_daemon && env_daemon_enabled();

		Self {
			agent_id,
			workspace_dir,
			state_dir_override,
			daemon_enabled,
			lane: LaneSchedulerConfig::default(),
			pool: RuntimePoolConfig::default(),
			verbose_diagnostics: args.verbose_diagnostics,
		}
	}

	/// Resolve `stateRoot()`: explicit override wins; else
	/// `~/.surfwright/agents/<agentId>` when agent-scoped; else
	/// `~/.surfwright`.
	pub fn state_root(&self) -> PathBuf {
		if let Some(ref dir) = self.state_dir_override {
			return dir.clone();
		}

		let home = dirs::home_dir().unwrap_or_else(|| self.workspace_dir.clone());
		let base = home.join(".surfwright");
		match &self.agent_id {
			Some(agent_id) => base.join("agents").join(sanitize_agent_id(agent_id)),
			None => base,
		}
	}

	/// Convenience accessor matching the workspace-scoped state dir used by
	/// the existing context store (`<workspace>/.playwright/<STATE_VERSION_DIR>`),
	/// kept for the verb layer which is unaffected by agent scoping.
	pub fn workspace_state_dir(&self) -> PathBuf {
		self.workspace_dir.join(pw_rs::dirs::PLAYWRIGHT).join(STATE_VERSION_DIR)
	}
}

fn env_daemon_enabled() -> bool {
	match std::env::var(ENV_DAEMON) {
		Ok(value) => value != "0",
		Err(_) => true,
	}
}

fn sanitize_agent_id(agent_id: &str) -> String {
	agent_id
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_root_defaults_under_home_without_agent() {
		let cfg = SurfwrightConfig::resolve(SurfwrightConfigArgs::default(), Path::new("/tmp/ws"));
		assert!(!cfg.state_root().ends_with("agents"));
	}

	#[test]
	fn state_root_scopes_under_agents_dir() {
		let args = SurfwrightConfigArgs {
			agent_id: Some("agent-7".to_string()),
			..Default::default()
		};
		let cfg = SurfwrightConfig::resolve(args, Path::new("/tmp/ws"));
		let root = cfg.state_root();
		assert!(root.ends_with("agents/agent-7"));
	}

	#[test]
	fn explicit_state_dir_overrides_agent_scoping() {
		let args = SurfwrightConfigArgs {
			agent_id: Some("agent-7".to_string()),
			state_dir: Some(PathBuf::from("/tmp/explicit-state")),
			..Default::default()
		};
		let cfg = SurfwrightConfig::resolve(args, Path::new("/tmp/ws"));
		assert_eq!(cfg.state_root(), PathBuf::from("/tmp/explicit-state"));
	}

	#[test]
	fn sanitize_agent_id_strips_path_separators() {
		assert_eq!(sanitize_agent_id("a/b c"), "a-b-c");
	}
}
