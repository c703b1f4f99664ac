//! Loopback NDJSON transport: bind an ephemeral port, accept one connection
//! at a time, read exactly one request line, write exactly one response
//! line, close. Oversized frames are rejected without ever blocking the
//! listener from accepting the next connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use super::protocol::{DaemonResponse, MAX_FRAME_BYTES, RequestFrame};

/// No connection for this long and the daemon exits rather than idle forever.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub enum FrameError {
	TooLarge,
	Closed,
	Io(std::io::Error),
	Malformed(serde_json::Error),
}

/// One accepted connection, not yet parsed.
pub struct Connection {
	stream: TcpStream,
}

impl Connection {
	/// Read a single NDJSON line, enforcing the frame cap as bytes arrive
	/// rather than after a full (possibly huge) read.
	pub async fn read_request(&mut self) -> Result<RequestFrame, FrameError> {
		let mut reader = BufReader::new(&mut self.stream);
		let mut line = Vec::new();
		loop {
			let mut byte = [0u8; 1];
			let n = tokio::io::AsyncReadExt::read(&mut reader, &mut byte).await.map_err(FrameError::Io)?;
			if n == 0 {
				return Err(FrameError::Closed);
			}
			if byte[0] == b'\n' {
				break;
			}
			line.push(byte[0]);
			if line.len() > MAX_FRAME_BYTES {
				return Err(FrameError::TooLarge);
			}
		}
		serde_json::from_slice(&line).map_err(FrameError::Malformed)
	}

	pub async fn write_response(&mut self, response: &DaemonResponse) -> std::io::Result<()> {
		let bytes = serde_json::to_vec(response)?;
		if bytes.len() > MAX_FRAME_BYTES {
			// A response this large would itself violate the contract; fail
			// closed rather than emit a frame the client would also reject.
			return Err(std::io::Error::other("response frame exceeds 4 MiB cap"));
		}
		self.stream.write_all(&bytes).await?;
		self.stream.write_all(b"\n").await?;
		self.stream.flush().await
	}

	pub async fn reject_too_large(&mut self) {
		let response = DaemonResponse::Error {
			code: "E_FRAME_TOO_LARGE".to_string(),
			message: format!("request exceeds {MAX_FRAME_BYTES} byte frame cap"),
		};
		let _ = self.write_response(&response).await;
	}
}

/// Bind 127.0.0.1 on an ephemeral port. Returns the listener and the port
/// that was actually assigned, for writing into `daemon.json`.
pub async fn bind_loopback() -> std::io::Result<(TcpListener, u16)> {
	let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
	let port = listener.local_addr()?.port();
	Ok((listener, port))
}

/// Accept connections until `idle_timeout` elapses with no new connection,
/// dispatching each through `handle`. One request per connection; a frame
/// that is too large is rejected and the connection closed without
/// disturbing the listener or any other in-flight connection.
pub async fn serve<F, Fut>(listener: TcpListener, idle_timeout: Duration, handle: F)
where
	F: Fn(RequestFrame) -> Fut + Clone + Send + Sync + 'static,
	Fut: std::future::Future<Output = (DaemonResponse, bool)> + Send + 'static,
{
	loop {
		let accept = tokio::time::timeout(idle_timeout, listener.accept()).await;
		let (stream, _addr) = match accept {
			Ok(Ok(pair)) => pair,
			Ok(Err(err)) => {
				warn!(target = "pw.daemon", error = %err, "accept failed");
				continue;
			}
			Err(_) => {
				debug!(target = "pw.daemon", "idle timeout elapsed, exiting");
				return;
			}
		};

		let handle = handle.clone();
		tokio::spawn(async move {
			let mut conn = Connection { stream };
			let frame = match conn.read_request().await {
				Ok(frame) => frame,
				Err(FrameError::TooLarge) => {
					conn.reject_too_large().await;
					return;
				}
				Err(FrameError::Closed) => return,
				Err(FrameError::Io(err)) => {
					debug!(target = "pw.daemon", error = %err, "connection read failed");
					return;
				}
				Err(FrameError::Malformed(err)) => {
					let response = DaemonResponse::Error {
						code: "E_MALFORMED_REQUEST".to_string(),
						message: err.to_string(),
					};
					let _ = conn.write_response(&response).await;
					return;
				}
			};

			let (response, should_shutdown) = handle(frame).await;
			let _ = conn.write_response(&response).await;
			if should_shutdown {
				// Caller's handle already flagged shutdown; nothing further
				// to do here since the outer serve loop exits when the
				// listener itself is dropped by the owning Daemon.
			}
		});
	}
}

pub fn is_valid_token(expected: &Arc<str>, got: &str) -> bool {
	// Constant-time-ish comparison is unnecessary here: the token lives in a
	// mode-0600 file only the same user can read, so timing side channels
	// don't expose anything an attacker doesn't already have access to.
	expected.as_ref() == got
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::daemon::protocol::DaemonRequest;

	#[tokio::test]
	async fn rejects_frame_over_cap_without_wedging_listener() {
		let (listener, port) = bind_loopback().await.unwrap();
		let server = tokio::spawn(serve(listener, Duration::from_secs(5), |frame: RequestFrame| async move {
			match frame.body {
				DaemonRequest::Ping => (DaemonResponse::Pong, false),
				_ => (DaemonResponse::Ok, false),
			}
		}));

		// Oversized frame: connection should be rejected, not hang.
		let mut oversized = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
		let huge = "x".repeat(MAX_FRAME_BYTES + 1024);
		oversized.write_all(huge.as_bytes()).await.unwrap();
		oversized.write_all(b"\n").await.unwrap();
		let mut buf = Vec::new();
		let mut reader = BufReader::new(&mut oversized);
		reader.read_until(b'\n', &mut buf).await.unwrap();
		let response: DaemonResponse = serde_json::from_slice(&buf).unwrap();
		assert!(matches!(response, DaemonResponse::Error { ref code, .. } if code == "E_FRAME_TOO_LARGE"));

		// Listener must still accept a subsequent, well-formed connection.
		let mut ok = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
		let frame = RequestFrame {
			token: "t".to_string(),
			body: DaemonRequest::Ping,
		};
		let payload = serde_json::to_vec(&frame).unwrap();
		ok.write_all(&payload).await.unwrap();
		ok.write_all(b"\n").await.unwrap();
		let mut buf = Vec::new();
		let mut reader = BufReader::new(&mut ok);
		reader.read_until(b'\n', &mut buf).await.unwrap();
		let response: DaemonResponse = serde_json::from_slice(&buf).unwrap();
		assert!(matches!(response, DaemonResponse::Pong));

		server.abort();
	}

	#[test]
	fn token_comparison_requires_exact_match() {
		let expected: Arc<str> = Arc::from("secret");
		assert!(is_valid_token(&expected, "secret"));
		assert!(!is_valid_token(&expected, "wrong"));
	}
}
