//! Outbound side of a channel: the calls the dispatcher makes back to the chat platform.

use async_trait::async_trait;

use super::telegram::ChannelError;

/// How the platform renders message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram's legacy lightweight markup.
    Markdown,
    /// Telegram's HTML subset.
    Html,
}

impl ParseMode {
    pub fn as_api_str(self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
            ParseMode::Html => "HTML",
        }
    }
}

/// Presence indicator shown in the chat while a reply is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

impl ChatAction {
    pub fn as_api_str(self) -> &'static str {
        match self {
            ChatAction::Typing => "typing",
        }
    }
}

/// Send/edit/presence calls used by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message; returns the id of the sent message.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to: Option<i64>,
    ) -> Result<i64, ChannelError>;

    /// Replace the text of a message the bot sent earlier.
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError>;

    async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<(), ChannelError>;
}
