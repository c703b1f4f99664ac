use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use pw_rs::{LaunchOptions, Playwright};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::meta::DaemonMeta;
use super::protocol::{BrowserInfo, DaemonRequest, DaemonResponse, RequestFrame};
use super::transport::{self, IDLE_TIMEOUT};
use crate::control::config::{SurfwrightConfig, SurfwrightConfigArgs};
use crate::types::BrowserKind;

const PORT_RANGE_START: u16 = 9222;
const PORT_RANGE_END: u16 = 10221;

struct BrowserInstance {
	info: BrowserInfo,
	browser: pw_rs::Browser,
}

struct DaemonState {
	playwright: Playwright,
	/// Browsers indexed by port.
	browsers: HashMap<u16, BrowserInstance>,
	/// Maps reuse_key -> port for browser reuse lookup.
	session_index: HashMap<String, u16>,
}

pub struct Daemon {
	state: Arc<Mutex<DaemonState>>,
	shutdown_tx: watch::Sender<bool>,
	shutdown_rx: watch::Receiver<bool>,
	token: Arc<str>,
	state_root: std::path::PathBuf,
}

impl Daemon {
	pub async fn start() -> Result<Self> {
		let playwright = Playwright::launch().await.map_err(|e| anyhow!(e.to_string()))?;
		let state = DaemonState {
			playwright,
			browsers: HashMap::new(),
			session_index: HashMap::new(),
		};
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
		let config = SurfwrightConfig::resolve(SurfwrightConfigArgs::default(), &cwd);
		Ok(Self {
			state: Arc::new(Mutex::new(state)),
			shutdown_tx,
			shutdown_rx,
			token: Arc::from(""),
			state_root: config.state_root(),
		})
	}

	/// Bind a loopback listener, write `daemon.json` with the assigned port
	/// and a freshly generated token, then serve until idle or shut down.
	pub async fn run(mut self) -> Result<()> {
		let (listener, port) = transport::bind_loopback().await?;
		let meta = DaemonMeta::new(port);
		self.token = Arc::from(meta.token.as_str());
		meta.write(&self.state_root)?;
		info!(target = "pw.daemon", port, "daemon listening");

		let state = Arc::clone(&self.state);
		let token = Arc::clone(&self.token);
		let shutdown_tx = self.shutdown_tx.clone();

		let mut serve_task = tokio::spawn(async move {
			transport::serve(listener, IDLE_TIMEOUT, move |frame: RequestFrame| {
				let state = Arc::clone(&state);
				let token = Arc::clone(&token);
				let shutdown_tx = shutdown_tx.clone();
				async move {
					if !transport::is_valid_token(&token, &frame.token) {
						return (
							DaemonResponse::Error {
								code: "E_UNAUTHORIZED".to_string(),
								message: "invalid or missing daemon token".to_string(),
							},
							false,
						);
					}
					handle_request(&state, &shutdown_tx, frame.body).await
				}
			})
			.await;
		});

		#[cfg(unix)]
		{
			use tokio::signal::unix::{SignalKind, signal};

			let mut sigterm = signal(SignalKind::terminate())?;
			let mut sigint = signal(SignalKind::interrupt())?;

			tokio::select! {
				_ = self.shutdown_rx.changed() => {
					info!(target = "pw.daemon", "shutdown requested");
				}
				_ = sigterm.recv() => {
					info!(target = "pw.daemon", "received SIGTERM, shutting down");
					shutdown_daemon_state(&self.state).await;
				}
				_ = sigint.recv() => {
					info!(target = "pw.daemon", "received SIGINT, shutting down");
					shutdown_daemon_state(&self.state).await;
				}
				_ = &mut serve_task => {
					info!(target = "pw.daemon", "idle timeout elapsed, shutting down");
					shutdown_daemon_state(&self.state).await;
				}
			}
		}

		#[cfg(windows)]
		{
			tokio::select! {
				_ = self.shutdown_rx.changed() => {
					info!(target = "pw.daemon", "shutdown requested");
				}
				_ = tokio::signal::ctrl_c() => {
					info!(target = "pw.daemon", "received Ctrl+C, shutting down");
					shutdown_daemon_state(&self.state).await;
				}
				_ = &mut serve_task => {
					info!(target = "pw.daemon", "idle timeout elapsed, shutting down");
					shutdown_daemon_state(&self.state).await;
				}
			}
		}

		serve_task.abort();
		DaemonMeta::remove(&self.state_root);
		Ok(())
	}
}

async fn handle_request(state: &Arc<Mutex<DaemonState>>, shutdown_tx: &watch::Sender<bool>, request: DaemonRequest) -> (DaemonResponse, bool) {
	match request {
		DaemonRequest::Ping => (DaemonResponse::Pong, false),

		DaemonRequest::AcquireBrowser { browser, headless, reuse_key } => {
			let mut daemon = state.lock().await;
			match daemon.acquire_browser(browser, headless, reuse_key).await {
				Ok((port, cdp_endpoint)) => (DaemonResponse::Browser { cdp_endpoint, port }, false),
				Err(err) => (error_response("E_ACQUIRE_FAILED", err), false),
			}
		}

		DaemonRequest::SpawnBrowser { browser, headless, port } => {
			let mut daemon = state.lock().await;
			let reuse_key = format!("spawn:{}:{}:{}", browser, headless, now_ts());
			match daemon.spawn_browser(browser, headless, port, reuse_key).await {
				Ok((port, cdp_endpoint)) => (DaemonResponse::Browser { cdp_endpoint, port }, false),
				Err(err) => (error_response("E_SPAWN_FAILED", err), false),
			}
		}

		DaemonRequest::GetBrowser { port } => {
			let daemon = state.lock().await;
			match daemon.browsers.get(&port) {
				Some(instance) => (
					DaemonResponse::Browser {
						cdp_endpoint: format!("http://127.0.0.1:{port}"),
						port: instance.info.port,
					},
					false,
				),
				None => (error_response("E_NOT_FOUND", anyhow!("no browser on port {port}")), false),
			}
		}

		DaemonRequest::KillBrowser { port } => {
			let mut daemon = state.lock().await;
			match daemon.kill_browser(port).await {
				Ok(()) => (DaemonResponse::Ok, false),
				Err(err) => (error_response("E_KILL_FAILED", err), false),
			}
		}

		DaemonRequest::ReleaseBrowser { reuse_key } => {
			let mut daemon = state.lock().await;
			daemon.release_browser(&reuse_key);
			(DaemonResponse::Ok, false)
		}

		DaemonRequest::ListBrowsers => {
			let daemon = state.lock().await;
			let list = daemon.browsers.values().map(|instance| instance.info.clone()).collect();
			(DaemonResponse::Browsers { list }, false)
		}

		DaemonRequest::RunCommand { .. } => (
			error_response("E_NOT_IMPLEMENTED", anyhow!("command dispatch over the daemon transport is not wired up")),
			false,
		),

		DaemonRequest::Shutdown => {
			let mut daemon = state.lock().await;
			match daemon.shutdown().await {
				Ok(()) => {
					let _ = shutdown_tx.send(true);
					(DaemonResponse::Ok, true)
				}
				Err(err) => (error_response("E_SHUTDOWN_FAILED", err), false),
			}
		}
	}
}

fn error_response(code: &str, err: anyhow::Error) -> DaemonResponse {
	DaemonResponse::Error { code: code.to_string(), message: err.to_string() }
}

impl DaemonState {
	/// Acquire a browser, reusing an existing one if `reuse_key` matches an
	/// existing still-connected browser. `None` always spawns a fresh one.
	async fn acquire_browser(&mut self, browser_kind: BrowserKind, headless: bool, reuse_key: Option<String>) -> Result<(u16, String)> {
		if let Some(key) = &reuse_key {
			if let Some(&port) = self.session_index.get(key) {
				if let Some(instance) = self.browsers.get_mut(&port) {
					if instance.browser.is_connected() {
						debug!(target = "pw.daemon", port, reuse_key = %key, "reusing existing browser");
						instance.info.last_used_at = now_ts();
						let cdp_endpoint = format!("http://127.0.0.1:{port}");
						return Ok((port, cdp_endpoint));
					}

					debug!(target = "pw.daemon", port, reuse_key = %key, "browser disconnected, removing");
					self.browsers.remove(&port);
					self.session_index.remove(key);
				}
			}
		}

		self.spawn_browser(browser_kind, headless, None, reuse_key.unwrap_or_default()).await
	}

	/// Spawn a new browser, optionally bound to `reuse_key` for future reuse.
	async fn spawn_browser(&mut self, browser_kind: BrowserKind, headless: bool, requested_port: Option<u16>, reuse_key: String) -> Result<(u16, String)> {
		if browser_kind != BrowserKind::Chromium {
			return Err(anyhow!("Daemon-managed browsers currently require chromium"));
		}

		let port = if let Some(port) = requested_port {
			if !(PORT_RANGE_START..=PORT_RANGE_END).contains(&port) {
				return Err(anyhow!("Port {port} outside allowed range"));
			}
			if self.browsers.contains_key(&port) {
				return Err(anyhow!("Port {port} already assigned"));
			}
			if !port_available(port) {
				return Err(anyhow!("Port {port} already in use"));
			}
			port
		} else {
			self.find_available_port().ok_or_else(|| anyhow!("No available ports"))?
		};

		let launch_options = LaunchOptions {
			headless: Some(headless),
			remote_debugging_port: Some(port),
			handle_sighup: Some(false),
			handle_sigint: Some(false),
			handle_sigterm: Some(false),
			..Default::default()
		};

		debug!(target = "pw.daemon", port, headless, reuse_key = %reuse_key, "launching browser");
		let browser = self
			.playwright
			.chromium()
			.launch_with_options(launch_options)
			.await
			.map_err(|e| anyhow!(e.to_string()))?;

		let now = now_ts();
		let stored_key = if reuse_key.is_empty() { None } else { Some(reuse_key.clone()) };
		let info = BrowserInfo {
			port,
			browser: browser_kind,
			headless,
			created_at: now,
			reuse_key: stored_key,
			last_used_at: now,
		};

		self.browsers.insert(port, BrowserInstance { info: info.clone(), browser });
		if !reuse_key.is_empty() {
			self.session_index.insert(reuse_key, port);
		}

		let cdp_endpoint = format!("http://127.0.0.1:{port}");
		Ok((port, cdp_endpoint))
	}

	/// Release a browser by reuse key (removes from index but keeps browser running).
	fn release_browser(&mut self, reuse_key: &str) {
		if let Some(port) = self.session_index.remove(reuse_key) {
			if let Some(instance) = self.browsers.get_mut(&port) {
				instance.info.reuse_key = None;
			}
		}
	}

	async fn kill_browser(&mut self, port: u16) -> Result<()> {
		let Some(instance) = self.browsers.get(&port) else {
			return Err(anyhow!("No browser on port {port}"));
		};

		if let Some(key) = &instance.info.reuse_key {
			self.session_index.remove(key);
		}

		instance.browser.close().await.map_err(|e| anyhow!(e.to_string()))?;
		self.browsers.remove(&port);
		Ok(())
	}

	async fn shutdown(&mut self) -> Result<()> {
		let ports: Vec<u16> = self.browsers.keys().copied().collect();
		for port in ports {
			let _ = self.kill_browser(port).await;
		}
		self.session_index.clear();
		self.playwright.shutdown().await.map_err(|e| anyhow!(e.to_string()))?;
		Ok(())
	}

	fn find_available_port(&self) -> Option<u16> {
		(PORT_RANGE_START..=PORT_RANGE_END).find(|port| !self.browsers.contains_key(port) && port_available(*port))
	}
}

async fn shutdown_daemon_state(state: &Arc<Mutex<DaemonState>>) {
	let mut daemon = state.lock().await;
	if let Err(err) = daemon.shutdown().await {
		warn!(target = "pw.daemon", error = %err, "error during shutdown");
	}
}

fn port_available(port: u16) -> bool {
	StdTcpListener::bind(("127.0.0.1", port)).is_ok()
}

fn now_ts() -> u64 {
	std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs()
}
