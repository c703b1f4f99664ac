//! [`Request`] protocol object representing a network request.

use std::sync::Arc;

use pw_runtime::channel::Channel;
use pw_runtime::channel_owner::{ChannelOwner, ChannelOwnerImpl, ParentOrConnection};
use pw_runtime::Result;
use serde_json::Value;

/// A network request made by the page.
///
/// See <https://playwright.dev/docs/api/class-request>
#[derive(Clone)]
pub struct Request {
	base: ChannelOwnerImpl,
}

impl Request {
	pub fn new(parent: Arc<dyn ChannelOwner>, type_name: String, guid: Arc<str>, initializer: Value) -> Self {
		Self {
			base: ChannelOwnerImpl::new(ParentOrConnection::Parent(parent), type_name, guid, initializer),
		}
	}

	/// Returns the request URL.
	pub fn url(&self) -> &str {
		self.base.initializer()["url"].as_str().unwrap_or_default()
	}

	/// Returns the HTTP method (GET, POST, ...).
	pub fn method(&self) -> &str {
		self.base.initializer()["method"].as_str().unwrap_or("GET")
	}
}

impl pw_runtime::channel_owner::private::Sealed for Request {}

impl ChannelOwner for Request {
	fn guid(&self) -> &str {
		self.base.guid()
	}

	fn type_name(&self) -> &str {
		self.base.type_name()
	}

	fn parent(&self) -> Option<Arc<dyn ChannelOwner>> {
		self.base.parent()
	}

	fn connection(&self) -> Arc<dyn pw_runtime::connection::ConnectionLike> {
		self.base.connection()
	}

	fn initializer(&self) -> &Value {
		self.base.initializer()
	}

	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn dispose(&self, reason: pw_runtime::channel_owner::DisposeReason) {
		self.base.dispose(reason)
	}

	fn adopt(&self, child: Arc<dyn ChannelOwner>) {
		self.base.adopt(child)
	}

	fn add_child(&self, guid: Arc<str>, child: Arc<dyn ChannelOwner>) {
		self.base.add_child(guid, child)
	}

	fn remove_child(&self, guid: &str) {
		self.base.remove_child(guid)
	}

	fn on_event(&self, _method: &str, _params: Value) {}

	fn was_collected(&self) -> bool {
		self.base.was_collected()
	}
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Request").field("url", &self.url()).finish()
	}
}
