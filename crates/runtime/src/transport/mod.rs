//! Transport layer: length-prefixed JSON framing over stdio pipes or WebSocket.
//!
//! Wire format matches the other Playwright language bindings: a 4-byte
//! little-endian length prefix followed by that many bytes of UTF-8 JSON,
//! i.e. `len(data).to_bytes(4, byteorder="little") + data`.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::{Error, Result};

/// Sends protocol messages to the Playwright server.
pub trait Transport: Send {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Drives the read side of a transport until it closes, forwarding decoded
/// messages to the channel it was built with.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Split halves of a transport, plus the channel its receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

async fn read_frame<R: AsyncRead + Unpin>(source: &mut R) -> Result<Value> {
	let mut len_buf = [0u8; 4];
	source
		.read_exact(&mut len_buf)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	source
		.read_exact(&mut msg_buf)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to read message body: {e}")))?;

	serde_json::from_slice(&msg_buf)
		.map_err(|e| Error::TransportError(format!("Failed to parse message: {e}")))
}

async fn write_frame<W: AsyncWrite + Unpin>(sink: &mut W, message: &Value) -> Result<()> {
	let bytes = serde_json::to_vec(message)?;
	let length = bytes.len() as u32;
	sink.write_all(&length.to_le_bytes())
		.await
		.map_err(Error::Io)?;
	sink.write_all(&bytes).await.map_err(Error::Io)?;
	sink.flush().await.map_err(Error::Io)?;
	Ok(())
}

/// Stdio pipe transport: the driver process's stdin/stdout pipes.
pub struct PipeTransport<W, R> {
	sink: W,
	source: R,
	tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	pub fn new(sink: W, source: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { sink, source, tx }, rx)
	}

	/// Splits into independent sender/receiver halves for the Connection's
	/// writer and reader tasks.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender { sink: self.sink },
			PipeTransportReceiver {
				source: self.source,
				tx: self.tx,
			},
		)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}

	/// Drives the read loop directly, consuming `self`. Used by callers that
	/// don't need the sender half (e.g. tests feeding only one direction).
	pub async fn run(mut self) -> Result<()> {
		loop {
			let value = read_frame(&mut self.source).await?;
			if self.tx.send(value).is_err() {
				return Ok(());
			}
		}
	}
}

pub struct PipeTransportSender<W> {
	sink: W,
}

impl<W: AsyncWrite + Unpin + Send> Transport for PipeTransportSender<W> {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { write_frame(&mut self.sink, &message).await })
	}
}

pub struct PipeTransportReceiver<R> {
	source: R,
	tx: mpsc::UnboundedSender<Value>,
}

impl<R: AsyncRead + Unpin + Send + 'static> TransportReceiver for PipeTransportReceiver<R> {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let mut this = *self;
			loop {
				let value = read_frame(&mut this.source).await?;
				if this.tx.send(value).is_err() {
					return Ok(());
				}
			}
		})
	}
}

/// WebSocket transport, used when connecting to a Playwright server exposed
/// over `ws://`/`wss://` instead of a spawned driver process.
pub struct WebSocketTransport<S> {
	stream: WebSocketStream<S>,
	tx: mpsc::UnboundedSender<Value>,
}

impl<S> WebSocketTransport<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	pub fn new(stream: WebSocketStream<S>) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { stream, tx }, rx)
	}

	pub fn into_parts(self) -> (WebSocketTransportSender<S>, WebSocketTransportReceiver<S>) {
		let (sink, stream) = self.stream.split();
		(
			WebSocketTransportSender { sink },
			WebSocketTransportReceiver {
				stream,
				tx: self.tx,
			},
		)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

pub struct WebSocketTransportSender<S> {
	sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

impl<S> Transport for WebSocketTransportSender<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(format!("WebSocket send failed: {e}")))
		})
	}
}

pub struct WebSocketTransportReceiver<S> {
	stream: SplitStream<WebSocketStream<S>>,
	tx: mpsc::UnboundedSender<Value>,
}

impl<S> TransportReceiver for WebSocketTransportReceiver<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let mut this = *self;
			while let Some(msg) = this.stream.next().await {
				let msg = msg
					.map_err(|e| Error::TransportError(format!("WebSocket read failed: {e}")))?;
				match msg {
					WsMessage::Text(text) => {
						let value: Value = serde_json::from_str(&text).map_err(|e| {
							Error::TransportError(format!("Failed to parse message: {e}"))
						})?;
						if this.tx.send(value).is_err() {
							return Ok(());
						}
					}
					WsMessage::Binary(bytes) => {
						let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
							Error::TransportError(format!("Failed to parse message: {e}"))
						})?;
						if this.tx.send(value).is_err() {
							return Ok(());
						}
					}
					WsMessage::Close(_) => return Ok(()),
					_ => {}
				}
			}
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests;
