//! Playwright runtime: driver lifecycle, connection, and object registry.
//!
//! This crate provides the low-level runtime infrastructure for communicating
//! with the Playwright Node.js server:
//!
//! - **Driver management**: locating and launching the Playwright driver
//! - **Transport**: bidirectional communication over stdio pipes or WebSocket
//! - **Connection**: JSON-RPC request/response correlation and event dispatch
//! - **Object registry**: managing protocol objects by GUID
//!
//! # Decoupling via ObjectFactory
//!
//! [`connection::Connection`] uses an `ObjectFactory` trait to create protocol
//! objects without depending on their concrete types, so this crate stays
//! independent of the higher-level protocol object crate.

pub mod channel;
pub mod channel_owner;
pub mod connection;
pub mod driver;
pub mod error;
pub mod playwright_server;
pub mod transport;

pub use channel::Channel;
pub use channel_owner::{ChannelOwner, ChannelOwnerImpl, DisposeReason, ParentOrConnection};
pub use connection::{
	AsyncChannelOwnerResult, Connection, ConnectionLike, Event, Message, Metadata, ObjectFactory,
	Request, Response,
};
pub use connection::object_store::ObjectStore;
pub use driver::get_driver_executable;
pub use error::{Error, Result};
pub use playwright_server::PlaywrightServer;
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
	TransportReceiver, WebSocketTransport, WebSocketTransportReceiver, WebSocketTransportSender,
};
