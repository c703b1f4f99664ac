use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::meta::DaemonMeta;
use super::protocol::{DaemonRequest, DaemonResponse, RequestFrame};

const DAEMON_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const DAEMON_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub(crate) struct DaemonAddress {
	pub port: u16,
	pub token: String,
}

/// Locate the running daemon via its `daemon.json` meta file. `None` means
/// no daemon is registered (never started, or its file failed validation).
pub(crate) fn locate(state_root: &std::path::Path) -> Result<Option<DaemonAddress>> {
	match DaemonMeta::read(state_root).context("failed to read daemon meta file")? {
		Some(meta) => Ok(Some(DaemonAddress { port: meta.port, token: meta.token })),
		None => Ok(None),
	}
}

/// Send one request and wait for one response, with a probe-length timeout
/// appropriate for liveness checks (`ping`) rather than real work.
pub(crate) async fn send_probe(address: &DaemonAddress, request: DaemonRequest) -> Result<DaemonResponse> {
	send(address, request, DAEMON_PROBE_TIMEOUT).await
}

pub(crate) async fn send_request(address: &DaemonAddress, request: DaemonRequest) -> Result<DaemonResponse> {
	send(address, request, DAEMON_REQUEST_TIMEOUT).await
}

async fn send(address: &DaemonAddress, request: DaemonRequest, request_timeout: Duration) -> Result<DaemonResponse> {
	let connect = timeout(request_timeout, TcpStream::connect(("127.0.0.1", address.port)));
	let stream = connect
		.await
		.map_err(|_| anyhow!("connection timed out"))?
		.context("failed to connect to daemon")?;

	let (read_half, mut write_half) = stream.into_split();
	let frame = RequestFrame { token: address.token.clone(), body: request };
	let mut payload = serde_json::to_vec(&frame).context("failed to encode daemon request")?;
	payload.push(b'\n');

	timeout(request_timeout, write_half.write_all(&payload))
		.await
		.map_err(|_| anyhow!("request timed out"))?
		.context("failed to write daemon request")?;
	write_half.flush().await.context("failed to flush daemon request")?;

	let mut reader = BufReader::new(read_half);
	let mut line = Vec::new();
	let read = timeout(request_timeout, reader.read_until(b'\n', &mut line));
	let n = read.await.map_err(|_| anyhow!("response timed out"))?.context("failed to read daemon response")?;
	if n == 0 {
		return Err(anyhow!("connection closed before message completed"));
	}

	serde_json::from_slice(&line).context("failed to decode daemon response")
}

/// Whether `err` indicates "no daemon reachable" rather than a real failure
/// from a live daemon (e.g. a malformed request).
pub(crate) fn is_not_running_error(err: &anyhow::Error) -> bool {
	let msg = err.to_string().to_ascii_lowercase();
	msg.contains("connection refused")
		|| msg.contains("connection reset")
		|| msg.contains("connection timed out")
		|| msg.contains("timed out")
		|| msg.contains("failed to connect")
		|| msg.contains("connection closed before message completed")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn connection_refused_is_not_running() {
		let err = anyhow!("failed to connect to daemon: connection refused");
		assert!(is_not_running_error(&err));
	}

	#[test]
	fn malformed_response_is_not_a_not_running_error() {
		let err = anyhow!("failed to decode daemon response: invalid json");
		assert!(!is_not_running_error(&err));
	}
}
