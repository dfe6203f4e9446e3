//! Inbound message from the Telegram channel, delivered to the dispatcher.
//!
//! Entity offsets and lengths are byte offsets into `text`; the channel converts
//! Telegram's UTF-16 offsets before building these.

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Parse Telegram's `chat.type`. Unknown values are treated as private.
    pub fn from_api(s: &str) -> Self {
        match s {
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Private,
        }
    }

    /// True for conversations where the bot must be mentioned before it answers.
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// Entity type of interest to the relay. Everything else is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Mention,
    BotCommand,
    Other(String),
}

impl EntityKind {
    pub fn from_api(s: &str) -> Self {
        match s {
            "mention" => EntityKind::Mention,
            "bot_command" => EntityKind::BotCommand,
            other => EntityKind::Other(other.to_string()),
        }
    }
}

/// User referenced by an entity (text mentions carry one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUser {
    pub id: i64,
    pub username: Option<String>,
}

/// Annotation over `text[offset..offset + length]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
    pub user: Option<EntityUser>,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            user: None,
        }
    }

    pub fn mention(offset: usize, length: usize) -> Self {
        Self::new(EntityKind::Mention, offset, length)
    }

    pub fn is_mention(&self) -> bool {
        self.kind == EntityKind::Mention
    }

    /// Covered substring, or None when the span is out of range or splits a character.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let end = self.offset.checked_add(self.length)?;
        text.get(self.offset..end)
    }
}

/// A text message as seen by the dispatcher. Immutable once received.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub chat_kind: ChatKind,
    pub text: String,
    pub entities: Vec<Entity>,
}

impl InboundMessage {
    /// The leading `bot_command` entity, if the message starts with one.
    fn command_entity(&self) -> Option<&Entity> {
        self.entities
            .first()
            .filter(|e| e.kind == EntityKind::BotCommand && e.offset == 0)
    }

    /// Command name without the leading `/` or an `@botname` suffix.
    pub fn command(&self) -> Option<&str> {
        let raw = self.command_entity()?.slice(&self.text)?;
        let name = raw.strip_prefix('/').unwrap_or(raw);
        Some(name.split('@').next().unwrap_or(name))
    }

    /// Text after the command, with the single separating character dropped.
    /// Empty when the message is not a command.
    pub fn command_arguments(&self) -> &str {
        let Some(entity) = self.command_entity() else {
            return "";
        };
        let Some(rest) = self.text.get(entity.length..) else {
            return "";
        };
        let mut chars = rest.chars();
        chars.next();
        chars.as_str()
    }
}
