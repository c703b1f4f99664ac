//! Persistent session descriptor management.
//!
//! `session status/start/stop/clear` let an agent keep a Chromium instance
//! running across separate `pw` invocations by tracking a [`SessionDescriptor`]
//! next to the workspace state.

use pw_rs::WaitUntil;
use serde_json::json;

use crate::context_store::ContextState;
use crate::control::config::SurfwrightConfig;
use crate::control::state_store::{BrowserMode, Session, SessionKind, SessionPolicy, StateStore};
use crate::error::{PwError, Result};
use crate::output::{ErrorCode, OutputFormat, ResultBuilder, SessionStartData, print_result};
use crate::session::SessionDescriptor;
use crate::session_broker::{SessionBroker, SessionRequest};
use crate::types::BrowserKind;

/// Reports whether a tracked session descriptor exists and is still alive.
pub async fn status(ctx_state: &mut ContextState, format: OutputFormat) -> Result<()> {
	let data = match ctx_state.session_descriptor_path() {
		Some(path) => match SessionDescriptor::load(&path)? {
			Some(descriptor) => json!({
				"exists": true,
				"alive": descriptor.is_alive(),
				"pid": descriptor.pid,
				"browser": descriptor.browser.to_string(),
				"headless": descriptor.headless,
				"cdpEndpoint": descriptor.cdp_endpoint,
				"wsEndpoint": descriptor.ws_endpoint,
			}),
			None => json!({ "exists": false }),
		},
		None => json!({ "exists": false }),
	};

	let result = ResultBuilder::new("session.status").data(data).build();
	print_result(&result, format);
	Ok(())
}

/// Removes the tracked session descriptor without touching the browser process.
pub async fn clear(ctx_state: &mut ContextState, format: OutputFormat) -> Result<()> {
	let removed = match ctx_state.session_descriptor_path() {
		Some(path) => {
			let existed = path.exists();
			if existed {
				std::fs::remove_file(&path)?;
			}
			existed
		}
		None => false,
	};

	let result = ResultBuilder::new("session.clear").data(json!({ "removed": removed })).build();
	print_result(&result, format);
	Ok(())
}

/// Launches (or reuses) a persistent, descriptor-tracked Chromium session.
pub async fn start(ctx_state: &mut ContextState, broker: &mut SessionBroker<'_>, headful: bool, format: OutputFormat) -> Result<()> {
	let ctx = broker.context();

	if ctx.browser != BrowserKind::Chromium {
		return Err(crate::error::PwError::BrowserLaunch(format!(
			"Persistent sessions require Chromium, but {} was specified. Use --browser chromium or omit the flag.",
			ctx.browser
		)));
	}

	let mut request = SessionRequest::from_context(WaitUntil::NetworkIdle, ctx);
	request.headless = !headful;
	request.launch_server = false;
	request.keep_browser_running = true;

	let session = broker.session(request).await?;

	let data = SessionStartData {
		ws_endpoint: session.ws_endpoint().map(str::to_string),
		cdp_endpoint: session.cdp_endpoint().map(str::to_string),
		browser: ctx.browser.to_string(),
		headless: !headful,
	};

	if let Some(path) = ctx_state.session_descriptor_path() {
		let descriptor = SessionDescriptor::new_for(ctx, !headful, data.cdp_endpoint.clone(), data.ws_endpoint.clone());
		descriptor.save(&path)?;
	}

	let result = ResultBuilder::new("session.start").data(data).build();
	print_result(&result, format);
	Ok(())
}

/// Stops the tracked persistent session and clears its descriptor.
pub async fn stop(ctx_state: &mut ContextState, broker: &mut SessionBroker<'_>, format: OutputFormat) -> Result<()> {
	let Some(path) = ctx_state.session_descriptor_path() else {
		let result = ResultBuilder::new("session.stop").data(json!({ "stopped": false })).build();
		print_result(&result, format);
		return Ok(());
	};

	let descriptor = SessionDescriptor::load(&path)?;
	let stopped = if let Some(descriptor) = &descriptor {
		if let Some(endpoint) = descriptor.cdp_endpoint.as_deref().or(descriptor.ws_endpoint.as_deref()) {
			let ctx = broker.context();
			let mut request = SessionRequest::from_context(WaitUntil::NetworkIdle, ctx);
			request.cdp_endpoint = Some(endpoint);
			request.keep_browser_running = false;
			if let Ok(session) = broker.session(request).await {
				let _ = session.browser().close().await;
			}
		}
		true
	} else {
		false
	};

	if path.exists() {
		std::fs::remove_file(&path)?;
	}

	let result = ResultBuilder::new("session.stop").data(json!({ "stopped": stopped })).build();
	print_result(&result, format);
	Ok(())
}

/// Create a new managed session record in the control-plane state store.
/// Fails closed with `E_SESSION_EXISTS` when `session_id` is explicit and
/// already present, so two callers racing to create the same session id
/// never both succeed: the store's locked read-modify-write resolves the
/// race to exactly one creation and one rejection.
///
/// This only registers the session record; it does not warm a browser —
/// that happens lazily on first `acquire()` through the session runtime pool.
pub async fn new_session(
	config: &SurfwrightConfig,
	format: OutputFormat,
	session_id: Option<String>,
	policy: SessionPolicy,
	headed: bool,
) -> Result<()> {
	let store = StateStore::new(config.state_root());
	let requested_id = session_id;
	let now = now_ms();

	let outcome = store
		.with_mutation(|env| {
			if let Some(id) = &requested_id {
				if env.session(id).is_some() {
					return Err(ErrorCode::ESessionExists);
				}
			}
			let id = requested_id.clone().unwrap_or_else(|| store.allocate_session_id(env));
			env.sessions.push(Session {
				session_id: id.clone(),
				kind: SessionKind::Managed,
				policy,
				cdp_origin: String::new(),
				debug_port: None,
				user_data_dir: None,
				browser_pid: None,
				owner_id: config.agent_id.clone(),
				lease_expires_at: None,
				lease_ttl_ms: None,
				managed_unreachable_since: None,
				managed_unreachable_count: 0,
				browser_mode: if headed { BrowserMode::Headed } else { BrowserMode::Headless },
				created_at: now,
				last_seen_at: now,
			});
			if env.active_session_id.is_none() {
				env.active_session_id = Some(id.clone());
			}
			Ok(id)
		})
		.map_err(|e| PwError::control(e.code(), e.to_string()))?;

	match outcome {
		Ok(id) => {
			let result = ResultBuilder::new("session.new").data(json!({ "sessionId": id, "created": true })).build();
			print_result(&result, format);
			Ok(())
		}
		Err(code) => Err(PwError::control(code, "session already exists".to_string())),
	}
}

/// Register an externally-owned session (one this binary never launched) by
/// its CDP origin. Attached sessions never carry `browserPid`/`userDataDir` —
/// the orchestrator connects to them but never closes the underlying
/// process.
pub async fn attach_session(
	config: &SurfwrightConfig,
	format: OutputFormat,
	session_id: Option<String>,
	cdp_origin: String,
) -> Result<()> {
	let store = StateStore::new(config.state_root());
	let requested_id = session_id;
	let now = now_ms();

	let outcome = store
		.with_mutation(|env| {
			if let Some(id) = &requested_id {
				if env.session(id).is_some() {
					return Err(ErrorCode::ESessionExists);
				}
			}
			let id = requested_id.clone().unwrap_or_else(|| store.allocate_session_id(env));
			env.sessions.push(Session {
				session_id: id.clone(),
				kind: SessionKind::Attached,
				policy: SessionPolicy::Persistent,
				cdp_origin: cdp_origin.clone(),
				debug_port: None,
				user_data_dir: None,
				browser_pid: None,
				owner_id: config.agent_id.clone(),
				lease_expires_at: None,
				lease_ttl_ms: None,
				managed_unreachable_since: None,
				managed_unreachable_count: 0,
				browser_mode: BrowserMode::Unknown,
				created_at: now,
				last_seen_at: now,
			});
			if env.active_session_id.is_none() {
				env.active_session_id = Some(id.clone());
			}
			Ok(id)
		})
		.map_err(|e| PwError::control(e.code(), e.to_string()))?;

	match outcome {
		Ok(id) => {
			let result = ResultBuilder::new("session.attach")
				.data(json!({ "sessionId": id, "attached": true, "cdpOrigin": cdp_origin }))
				.build();
			print_result(&result, format);
			Ok(())
		}
		Err(code) => Err(PwError::control(code, "session already exists".to_string())),
	}
}

fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}
