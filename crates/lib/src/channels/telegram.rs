//! Telegram channel: long-poll getUpdates and send/edit messages via the Bot API.

use crate::channels::inbound::{ChatKind, Entity, EntityKind, EntityUser, InboundMessage};
use crate::channels::transport::{ChatAction, ParseMode, Transport};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_POLL_TIMEOUT: u64 = 60;
const POLL_ERROR_BACKOFF_SECS: u64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("telegram {method} failed: {status} {body}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("telegram {method} returned ok: false: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<TelegramEntity>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub typ: String,
}

/// Entity as sent by Telegram: offset and length count UTF-16 code units.
#[derive(Debug, Deserialize)]
pub struct TelegramEntity {
    #[serde(rename = "type")]
    pub typ: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub user: Option<TelegramUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramMessage {
    /// Convert to the dispatcher's message. Messages without text are dropped.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let text = self.text?;
        let entities = self
            .entities
            .iter()
            .map(|e| {
                let (offset, length) = utf16_span_to_bytes(&text, e.offset, e.length);
                Entity {
                    kind: EntityKind::from_api(&e.typ),
                    offset,
                    length,
                    user: e.user.as_ref().map(|u| EntityUser {
                        id: u.id,
                        username: u.username.clone(),
                    }),
                }
            })
            .collect();
        Some(InboundMessage {
            chat_id: self.chat.id,
            message_id: self.message_id,
            chat_kind: ChatKind::from_api(&self.chat.typ),
            text,
            entities,
        })
    }
}

/// Byte index of a UTF-16 position, or None if it is past the end or inside a surrogate pair.
fn utf16_to_byte(text: &str, pos: usize) -> Option<usize> {
    let mut units = 0;
    for (i, c) in text.char_indices() {
        if units == pos {
            return Some(i);
        }
        if units > pos {
            return None;
        }
        units += c.len_utf16();
    }
    (units == pos).then_some(text.len())
}

/// Convert a UTF-16 (offset, length) span to bytes. A span that does not map onto the
/// text is returned starting past the end, so slicing it still fails.
pub fn utf16_span_to_bytes(text: &str, offset: usize, length: usize) -> (usize, usize) {
    let start = utf16_to_byte(text, offset);
    let end = offset
        .checked_add(length)
        .and_then(|end| utf16_to_byte(text, end));
    match (start, end) {
        (Some(start), Some(end)) => (start, end - start),
        _ => (text.len() + 1, length),
    }
}

/// Telegram channel connector: long-polls for updates and implements [`Transport`].
pub struct TelegramChannel {
    token: String,
    api_base: String,
    poll_timeout: u64,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, api_base: Option<String>, poll_timeout: u64) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            token: token.into(),
            api_base,
            poll_timeout,
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the long-poll loop after the current poll returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Unwrap a Bot API response: non-2xx and `ok: false` become errors.
    async fn read_response<T: DeserializeOwned>(
        method: &'static str,
        res: reqwest::Response,
    ) -> Result<T, ChannelError> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                method,
                status,
                body,
            });
        }
        let data: ApiResponse<T> = res.json().await.map_err(|e| e.without_url())?;
        match data {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(ChannelError::Api {
                method,
                description: description.unwrap_or_default(),
            }),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        Self::read_response(method, res).await
    }

    /// Call getMe; verifies the token and returns the bot's own user.
    pub async fn get_me(&self) -> Result<TelegramUser, ChannelError> {
        let res = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| e.without_url())?;
        Self::read_response("getMe", res).await
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), ChannelError> {
        let mut query = vec![("timeout", self.poll_timeout.to_string())];
        if let Some(off) = offset {
            query.push(("offset", off.to_string()));
        }
        let res = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&query)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        let updates: Vec<TelegramUpdate> = Self::read_response("getUpdates", res).await?;
        let next_offset = updates
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1)
            .or(offset);
        Ok((updates, next_offset))
    }

    /// Start the getUpdates long-poll loop and forward text messages. Returns a handle to await on shutdown.
    pub fn start_inbound(self: Arc<Self>, inbound_tx: mpsc::Sender<InboundMessage>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, inbound_tx: mpsc::Sender<InboundMessage>) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                offset = next;
                for u in updates {
                    let Some(inbound) = u.message.and_then(TelegramMessage::into_inbound) else {
                        continue;
                    };
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(POLL_ERROR_BACKOFF_SECS)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl Transport for TelegramChannel {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to: Option<i64>,
    ) -> Result<i64, ChannelError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = mode.as_api_str().into();
        }
        if let Some(id) = reply_to {
            body["reply_parameters"] = json!({
                "message_id": id,
                "allow_sending_without_reply": true
            });
        }
        let sent: SentMessage = self.post("sendMessage", &body).await?;
        Ok(sent.message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = mode.as_api_str().into();
        }
        // result is the edited Message, or `true` for inline messages
        let _: serde_json::Value = self.post("editMessageText", &body).await?;
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<(), ChannelError> {
        let body = json!({ "chat_id": chat_id, "action": action.as_api_str() });
        let _: bool = self.post("sendChatAction", &body).await?;
        Ok(())
    }
}
