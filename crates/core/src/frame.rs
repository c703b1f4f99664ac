//! [`Frame`] protocol object: a document within a [`Page`](crate::Page).

use std::sync::Arc;

use pw_runtime::channel::Channel;
use pw_runtime::channel_owner::{ChannelOwner, ChannelOwnerImpl, ParentOrConnection};
use pw_runtime::connection::deserialize_arc_str;
use pw_runtime::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::page::{GotoOptions, Response};
use crate::ElementHandle;

/// A frame within a page: the main frame, or an `<iframe>`.
///
/// See <https://playwright.dev/docs/api/class-frame>
#[derive(Clone)]
pub struct Frame {
	base: ChannelOwnerImpl,
}

#[derive(Deserialize)]
struct GotoResponse {
	response: Option<ResponseReference>,
}

#[derive(Deserialize)]
struct ResponseReference {
	#[serde(deserialize_with = "deserialize_arc_str")]
	guid: Arc<str>,
}

#[derive(Deserialize)]
struct QuerySelectorResponse {
	element: Option<ElementReference>,
}

#[derive(Deserialize)]
struct QuerySelectorAllResponse {
	elements: Vec<ElementReference>,
}

#[derive(Deserialize)]
struct ElementReference {
	#[serde(deserialize_with = "deserialize_arc_str")]
	guid: Arc<str>,
}

impl Frame {
	pub fn new(parent: Arc<dyn ChannelOwner>, type_name: String, guid: Arc<str>, initializer: Value) -> Self {
		Self {
			base: ChannelOwnerImpl::new(ParentOrConnection::Parent(parent), type_name, guid, initializer),
		}
	}

	pub(crate) fn channel(&self) -> &Channel {
		self.base.channel()
	}

	/// Returns the frame's current URL.
	pub fn url(&self) -> &str {
		self.base.initializer()["url"].as_str().unwrap_or_default()
	}

	/// Navigates the frame to `url`.
	///
	/// See <https://playwright.dev/docs/api/class-frame#frame-goto>
	pub async fn goto(&self, url: &str, options: Option<GotoOptions>) -> Result<Option<Response>> {
		let mut params = serde_json::json!({ "url": url });

		if let Some(opts) = options {
			if let Some(timeout) = opts.timeout {
				params["timeout"] = serde_json::json!(timeout.as_millis() as u64);
			} else {
				params["timeout"] = serde_json::json!(pw_protocol::options::DEFAULT_TIMEOUT_MS);
			}
			if let Some(wait_until) = opts.wait_until {
				params["waitUntil"] = serde_json::json!(wait_until.as_str());
			}
		} else {
			params["timeout"] = serde_json::json!(pw_protocol::options::DEFAULT_TIMEOUT_MS);
		}

		let goto_result: GotoResponse = self.channel().send("goto", params).await.map_err(|e| match e {
			Error::Timeout(msg) => Error::NavigationTimeout {
				url: url.to_string(),
				duration_ms: 0,
			}
			.and_log(msg),
			other => other,
		})?;

		let Some(response_ref) = goto_result.response else {
			return Ok(None);
		};

		let response_arc = self
			.connection()
			.wait_for_object(&response_ref.guid, std::time::Duration::from_secs(1))
			.await?;
		let initializer = response_arc.initializer();

		let status = initializer["status"]
			.as_u64()
			.ok_or_else(|| Error::ProtocolError("Response missing status".to_string()))? as u16;

		let headers = initializer["headers"]
			.as_array()
			.ok_or_else(|| Error::ProtocolError("Response missing headers".to_string()))?
			.iter()
			.filter_map(|h| {
				let name = h["name"].as_str()?;
				let value = h["value"].as_str()?;
				Some((name.to_string(), value.to_string()))
			})
			.collect();

		Ok(Some(Response {
			url: initializer["url"]
				.as_str()
				.ok_or_else(|| Error::ProtocolError("Response missing url".to_string()))?
				.to_string(),
			status,
			status_text: initializer["statusText"].as_str().unwrap_or("").to_string(),
			ok: (200..300).contains(&status),
			headers,
		}))
	}

	/// Returns the document's title.
	///
	/// See <https://playwright.dev/docs/api/class-frame#frame-title>
	pub async fn title(&self) -> Result<String> {
		#[derive(Deserialize)]
		struct TitleResponse {
			value: String,
		}
		let resp: TitleResponse = self.channel().send("title", serde_json::json!({})).await?;
		Ok(resp.value)
	}

	/// Evaluates an expression, discarding the result.
	pub async fn frame_evaluate_expression(&self, expression: &str) -> Result<()> {
		self.channel()
			.send_no_result(
				"evaluateExpression",
				serde_json::json!({ "expression": expression, "isFunction": false }),
			)
			.await
	}

	/// Evaluates an expression and returns the result rendered as a string.
	pub async fn frame_evaluate_expression_value(&self, expression: &str) -> Result<String> {
		let value = self.frame_evaluate_expression_json(expression).await?;
		Ok(match value {
			Value::String(s) => s,
			other => other.to_string(),
		})
	}

	/// Evaluates an expression and returns the raw JSON result.
	pub async fn frame_evaluate_expression_json(&self, expression: &str) -> Result<Value> {
		#[derive(Deserialize)]
		struct EvalResponse {
			value: Value,
		}
		let resp: EvalResponse = self
			.channel()
			.send(
				"evaluateExpression",
				serde_json::json!({ "expression": expression, "isFunction": false }),
			)
			.await?;
		Ok(resp.value)
	}

	/// Evaluates an expression and deserializes the result to `T`.
	pub async fn frame_evaluate_expression_typed<T: serde::de::DeserializeOwned>(&self, expression: &str) -> Result<T> {
		let value = self.frame_evaluate_expression_json(expression).await?;
		serde_json::from_value(value).map_err(Error::Json)
	}

	/// Returns the first element matching `selector`, or `None`.
	pub async fn query_selector(&self, selector: &str) -> Result<Option<Arc<ElementHandle>>> {
		let resp: QuerySelectorResponse = self
			.channel()
			.send("querySelector", serde_json::json!({ "selector": selector, "strict": false }))
			.await?;

		let Some(element_ref) = resp.element else {
			return Ok(None);
		};

		let element_arc = self.connection().wait_for_object(&element_ref.guid, std::time::Duration::from_secs(1)).await?;

		let element = element_arc
			.downcast_arc::<ElementHandle>()
			.map_err(|_| Error::ProtocolError(format!("Expected ElementHandle, got {}", element_arc.type_name())))?;

		Ok(Some(element))
	}

	/// Returns all elements matching `selector`.
	pub async fn query_selector_all(&self, selector: &str) -> Result<Vec<Arc<ElementHandle>>> {
		let resp: QuerySelectorAllResponse = self
			.channel()
			.send("querySelectorAll", serde_json::json!({ "selector": selector }))
			.await?;

		let mut elements = Vec::with_capacity(resp.elements.len());
		for element_ref in resp.elements {
			let element_arc = self.connection().wait_for_object(&element_ref.guid, std::time::Duration::from_secs(1)).await?;
			let element = element_arc
				.downcast_arc::<ElementHandle>()
				.map_err(|_| Error::ProtocolError(format!("Expected ElementHandle, got {}", element_arc.type_name())))?;
			elements.push(element);
		}

		Ok(elements)
	}
}

impl pw_runtime::channel_owner::private::Sealed for Frame {}

impl ChannelOwner for Frame {
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

impl std::fmt::Debug for Frame {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Frame").field("guid", &self.guid()).field("url", &self.url()).finish()
	}
}
