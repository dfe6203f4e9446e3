//! Telegram channel: inbound message model, the outbound [`Transport`] seam,
//! and the Bot API connector that implements it.

mod inbound;
mod telegram;
mod transport;

pub use inbound::{ChatKind, Entity, EntityKind, EntityUser, InboundMessage};
pub use telegram::{
    utf16_span_to_bytes, ChannelError, TelegramChannel, TelegramMessage, TelegramUpdate,
    TelegramUser, DEFAULT_POLL_TIMEOUT, TELEGRAM_API_BASE,
};
pub use transport::{ChatAction, ParseMode, Transport};
