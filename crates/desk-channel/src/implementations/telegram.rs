//! Telegram Bot API channel transport.
//!
//! Posts and edits announcement messages in a Telegram channel through
//! the HTTP Bot API. Timeouts, connection failures, throttling and
//! server-side errors are reported as transient so the service layer can
//! retry them; everything else is a permanent API error.

use crate::{ChannelError, ChannelInterface};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram Bot API transport for a single channel.
pub struct TelegramChannel {
	client: reqwest::Client,
	api_url: String,
	bot_token: String,
	chat_id: i64,
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
	ok: bool,
	#[serde(default)]
	result: Option<MessageRef>,
	#[serde(default)]
	description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
	message_id: i64,
}

impl TelegramChannel {
	/// Creates a new transport for the given bot and channel.
	pub fn new(api_url: String, bot_token: String, chat_id: i64) -> Result<Self, ChannelError> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| ChannelError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			api_url,
			bot_token,
			chat_id,
		})
	}

	fn method_url(&self, method: &str) -> String {
		format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
	}

	/// Sends one Bot API call and decodes the response envelope.
	async fn call(&self, method: &str, body: serde_json::Value) -> Result<ApiResponse, ChannelError> {
		let response = self
			.client
			.post(self.method_url(method))
			.json(&body)
			.send()
			.await
			.map_err(|e| ChannelError::Network(e.to_string()))?;

		let status = response.status();
		if status.as_u16() == 429 || status.is_server_error() {
			return Err(ChannelError::Network(format!("{} returned {}", method, status)));
		}

		let api: ApiResponse = response
			.json()
			.await
			.map_err(|e| ChannelError::Api(format!("{} returned invalid body: {}", method, e)))?;

		if !api.ok {
			let description = api.description.unwrap_or_else(|| status.to_string());
			return Err(ChannelError::Api(format!("{}: {}", method, description)));
		}
		Ok(api)
	}
}

#[async_trait]
impl ChannelInterface for TelegramChannel {
	async fn post(&self, text: &str) -> Result<i64, ChannelError> {
		let api = self
			.call(
				"sendMessage",
				json!({ "chat_id": self.chat_id, "text": text }),
			)
			.await?;
		api.result
			.map(|m| m.message_id)
			.ok_or_else(|| ChannelError::Api("sendMessage returned no message".into()))
	}

	async fn edit(&self, message_id: i64, text: &str) -> Result<(), ChannelError> {
		let result = self
			.call(
				"editMessageText",
				json!({ "chat_id": self.chat_id, "message_id": message_id, "text": text }),
			)
			.await;
		match result {
			Ok(_) => Ok(()),
			// Re-rendering identical text is not a failure.
			Err(ChannelError::Api(description))
				if description.contains("message is not modified") =>
			{
				Ok(())
			}
			Err(e) => Err(e),
		}
	}
}

/// Factory function to create a Telegram channel transport from configuration.
///
/// Configuration parameters:
/// - `bot_token`: Bot API token (required)
/// - `chat_id`: Target channel id (required)
/// - `api_url`: Bot API base url (default: "https://api.telegram.org")
pub fn create_channel(config: &toml::Value) -> Result<Box<dyn ChannelInterface>, ChannelError> {
	let bot_token = config
		.get("bot_token")
		.and_then(|v| v.as_str())
		.filter(|t| !t.is_empty())
		.ok_or_else(|| ChannelError::Configuration("bot_token is required".into()))?
		.to_string();

	let chat_id = config
		.get("chat_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| ChannelError::Configuration("chat_id is required".into()))?;

	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL)
		.trim_end_matches('/')
		.to_string();

	Ok(Box::new(TelegramChannel::new(api_url, bot_token, chat_id)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_factory_requires_token_and_chat() {
		let missing_token: toml::Value = toml::from_str("chat_id = -100").unwrap();
		assert!(matches!(
			create_channel(&missing_token),
			Err(ChannelError::Configuration(_))
		));

		let missing_chat: toml::Value = toml::from_str("bot_token = \"t\"").unwrap();
		assert!(matches!(
			create_channel(&missing_chat),
			Err(ChannelError::Configuration(_))
		));

		let complete: toml::Value =
			toml::from_str("bot_token = \"t\"\nchat_id = -100").unwrap();
		assert!(create_channel(&complete).is_ok());
	}
}
