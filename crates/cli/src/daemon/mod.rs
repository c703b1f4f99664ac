mod client;
pub mod meta;
pub mod protocol;
mod server;
pub mod transport;

use anyhow::{Result, anyhow};
use tracing::debug;

pub use protocol::BrowserInfo;
pub use server::Daemon;

use crate::control::config::{SurfwrightConfig, SurfwrightConfigArgs};
use crate::types::BrowserKind;
use client::DaemonAddress;
use protocol::DaemonRequest;

#[derive(Debug, Clone)]
pub struct DaemonClient {
	address: DaemonAddress,
}

fn default_state_root() -> std::path::PathBuf {
	let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
	SurfwrightConfig::resolve(SurfwrightConfigArgs::default(), &cwd).state_root()
}

/// Probe for a running daemon via its `daemon.json` meta file, then confirm
/// it actually answers a ping before handing back a usable client. A stale
/// meta file (process gone, port now owned by something else) reads back as
/// `None` rather than an error.
pub async fn try_connect() -> Option<DaemonClient> {
	let state_root = default_state_root();
	let address = match client::locate(&state_root) {
		Ok(Some(address)) => address,
		Ok(None) => return None,
		Err(err) => {
			debug!(target = "pw.daemon", error = %err, "failed to read daemon meta file");
			return None;
		}
	};

	match client::send_probe(&address, DaemonRequest::Ping).await {
		Ok(protocol::DaemonResponse::Pong) => Some(DaemonClient { address }),
		Ok(_) => None,
		Err(err) if client::is_not_running_error(&err) => None,
		Err(err) => {
			debug!(target = "pw.daemon", error = %err, "daemon connection failed");
			None
		}
	}
}

/// Request a browser from the daemon with a deterministic reuse key.
///
/// Browsers are reused only when reuse keys match exactly.
pub async fn request_browser(client: &DaemonClient, kind: BrowserKind, headless: bool, session_key: &str) -> Result<String> {
	let request = DaemonRequest::AcquireBrowser {
		browser: kind,
		headless,
		reuse_key: Some(session_key.to_string()),
	};
	match client::send_request(&client.address, request).await? {
		protocol::DaemonResponse::Browser { cdp_endpoint, .. } => Ok(cdp_endpoint),
		protocol::DaemonResponse::Error { code, message } => Err(anyhow!("daemon acquire_browser failed ({code}): {message}")),
		_ => Err(anyhow!("daemon returned an unexpected response to acquire_browser")),
	}
}

pub async fn ping() -> Result<Option<bool>> {
	let state_root = default_state_root();
	let Some(address) = client::locate(&state_root)? else {
		return Ok(None);
	};
	match client::send_probe(&address, DaemonRequest::Ping).await {
		Ok(protocol::DaemonResponse::Pong) => Ok(Some(true)),
		Ok(_) => Ok(Some(false)),
		Err(err) if client::is_not_running_error(&err) => Ok(None),
		Err(err) => Err(anyhow!("daemon ping failed: {err}")),
	}
}

pub async fn shutdown() -> Result<Option<()>> {
	let state_root = default_state_root();
	let Some(address) = client::locate(&state_root)? else {
		return Ok(None);
	};

	match client::send_probe(&address, DaemonRequest::Ping).await {
		Ok(protocol::DaemonResponse::Pong) => {}
		Ok(_) => return Ok(None),
		Err(err) if client::is_not_running_error(&err) => return Ok(None),
		Err(err) => return Err(anyhow!("daemon ping failed before shutdown: {err}")),
	}

	match client::send_request(&address, DaemonRequest::Shutdown).await {
		Ok(protocol::DaemonResponse::Ok) => Ok(Some(())),
		Ok(protocol::DaemonResponse::Error { code, message }) => Err(anyhow!("daemon shutdown failed ({code}): {message}")),
		Ok(_) => Ok(Some(())),
		Err(err) if client::is_not_running_error(&err) => Ok(None),
		Err(err) => Err(anyhow!("daemon shutdown failed: {err}")),
	}
}

pub async fn list_browsers() -> Result<Option<Vec<BrowserInfo>>> {
	let state_root = default_state_root();
	let Some(address) = client::locate(&state_root)? else {
		return Ok(None);
	};

	match client::send_request(&address, DaemonRequest::ListBrowsers).await {
		Ok(protocol::DaemonResponse::Browsers { list }) => Ok(Some(list)),
		Ok(protocol::DaemonResponse::Error { code, message }) => Err(anyhow!("daemon list_browsers failed ({code}): {message}")),
		Ok(_) => Ok(Some(Vec::new())),
		Err(err) if client::is_not_running_error(&err) => Ok(None),
		Err(err) => Err(anyhow!("daemon list_browsers failed: {err}")),
	}
}
