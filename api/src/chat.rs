use crate::client::{ApiError, ApiResult, GuildApi};
use crate::{ChatContext, ChatMessage};
use reqwest::Url;

/// Seconds between keep-alive `ping` frames on an open chat socket.
pub const KEEPALIVE_SECS: u64 = 30;
/// Text frame sent as keep-alive. The protocol defines no structured pong.
pub const PING_FRAME: &str = "ping";

pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone, Copy)]
pub struct Chat<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn chat(&self) -> Chat<'_> {
        Chat { api: self }
    }
}

impl Chat<'_> {
    pub async fn history(&self, ctx: ChatContext) -> ApiResult<Vec<ChatMessage>> {
        self.api
            .get(&format!("/chat/{}/{}/messages", ctx.kind.as_str(), ctx.id))
            .await
    }

    pub async fn send(&self, ctx: ChatContext, content: &str) -> ApiResult<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Invalid("message is empty".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(ApiError::Invalid(format!(
                "message is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }
        self.api
            .post(
                &format!("/chat/{}/{}/messages", ctx.kind.as_str(), ctx.id),
                &serde_json::json!({ "content": content }),
            )
            .await
    }
}

/// WebSocket URL for a chat stream; the session token travels as `?token=`.
pub fn socket_url(ws_base: &str, ctx: ChatContext, token: &str) -> ApiResult<String> {
    let base = ws_base.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/ws/chat/{}/{}", ctx.kind.as_str(), ctx.id))
        .map_err(|e| ApiError::Invalid(format!("invalid websocket url {base}: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

/// Parse one inbound text frame. Anything that is not a chat message
/// (e.g. a bare `pong`) yields `None`.
pub fn parse_frame(text: &str) -> Option<ChatMessage> {
    serde_json::from_str(text).ok()
}
