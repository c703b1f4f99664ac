//! [`Route`] protocol object for network interception.

use std::sync::Arc;

use pw_runtime::channel::Channel;
use pw_runtime::channel_owner::{ChannelOwner, ChannelOwnerImpl, ParentOrConnection};
use pw_runtime::Result;
use serde_json::Value;

use crate::Request;

/// A network request intercepted by a [`Page::route`](crate::Page::route) handler.
///
/// Exactly one of [`abort`](Self::abort), [`continue_`](Self::continue_), or
/// [`fulfill`](Self::fulfill) must be called, otherwise the underlying request hangs.
///
/// See <https://playwright.dev/docs/api/class-route>
#[derive(Clone)]
pub struct Route {
	base: ChannelOwnerImpl,
}

impl Route {
	pub fn new(parent: Arc<dyn ChannelOwner>, type_name: String, guid: Arc<str>, initializer: Value) -> Self {
		Self {
			base: ChannelOwnerImpl::new(ParentOrConnection::Parent(parent), type_name, guid, initializer),
		}
	}

	/// Returns the intercepted request.
	pub fn request(&self) -> Request {
		let request_guid = self.base.initializer()["request"]["guid"]
			.as_str()
			.unwrap_or_default();
		self.base
			.children()
			.into_iter()
			.find(|child| child.guid() == request_guid)
			.and_then(|child| child.downcast_ref::<Request>().cloned())
			.unwrap_or_else(|| {
				Request::new(
					Arc::new(self.clone()),
					"Request".to_string(),
					Arc::from(request_guid),
					self.base.initializer()["request"].clone(),
				)
			})
	}

	/// Aborts the route, optionally with a given error code (defaults to `"failed"`).
	///
	/// See <https://playwright.dev/docs/api/class-route#route-abort>
	pub async fn abort(&self, error_code: Option<&str>) -> Result<()> {
		self.channel()
			.send_no_result(
				"abort",
				serde_json::json!({ "errorCode": error_code.unwrap_or("failed") }),
			)
			.await
	}

	/// Continues the request, optionally overriding url/method/headers/post data.
	///
	/// See <https://playwright.dev/docs/api/class-route#route-continue>
	pub async fn continue_(&self) -> Result<()> {
		self.channel().send_no_result("continue", serde_json::json!({})).await
	}

	/// Fulfills the request with a fabricated response.
	///
	/// See <https://playwright.dev/docs/api/class-route#route-fulfill>
	pub async fn fulfill(&self, status: u16, body: &str) -> Result<()> {
		self.channel()
			.send_no_result(
				"fulfill",
				serde_json::json!({ "status": status, "body": body, "isBase64": false }),
			)
			.await
	}
}

impl pw_runtime::channel_owner::private::Sealed for Route {}

impl ChannelOwner for Route {
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

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route").field("guid", &self.guid()).finish()
	}
}
