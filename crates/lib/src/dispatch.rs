//! Command dispatch: classify one inbound message and run exactly one behavior.
//!
//! `/start` sends the configured greeting, `/info <arg>` echoes the argument as HTML,
//! and anything else is forwarded to the Q&A backend; the translated answer replaces a
//! "thinking" placeholder in place.

use crate::channels::{ChannelError, ChatAction, InboundMessage, ParseMode, Transport};
use crate::config::Settings;
use crate::markup::MarkupTranslator;
use crate::mention::{strip_first_mention, BoundsError};
use crate::qa::{QaBackend, QaError};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key of the answer text in the Q&A response object.
pub const ANSWER_FIELD: &str = "assistant";

/// Per-message failure. Logged by [`Dispatcher::process`]; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Transport(#[from] ChannelError),
    #[error(transparent)]
    Remote(#[from] QaError),
    #[error("unexpected API response format: {0}")]
    ResponseFormat(String),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

/// Which behavior a message triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Greeting,
    Lookup { argument: String },
    Ask { question: String },
}

impl Route {
    /// Pure classification: `start` and `info` are commands, everything else is a question.
    pub fn classify(msg: &InboundMessage) -> Self {
        match msg.command() {
            Some("start") => Route::Greeting,
            Some("info") => Route::Lookup {
                argument: msg.command_arguments().to_string(),
            },
            _ => Route::Ask {
                question: msg.text.clone(),
            },
        }
    }
}

/// What a successfully handled message led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Greeted,
    LookedUp,
    Answered,
    /// Group message that did not mention the bot; nothing was sent.
    Ignored,
}

/// True if a mention entity names `@username` (case-insensitive), by text or attached user.
pub fn mentions_bot(msg: &InboundMessage, username: &str) -> bool {
    msg.entities.iter().filter(|e| e.is_mention()).any(|e| {
        let by_text = e
            .slice(&msg.text)
            .and_then(|s| s.strip_prefix('@'))
            .is_some_and(|name| name.eq_ignore_ascii_case(username));
        let by_user = e
            .user
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .is_some_and(|name| name.eq_ignore_ascii_case(username));
        by_text || by_user
    })
}

/// The `assistant` string of a Q&A response.
pub fn extract_answer(response: &Map<String, Value>) -> Result<&str, RelayError> {
    match response.get(ANSWER_FIELD) {
        Some(Value::String(answer)) => Ok(answer),
        Some(_) => Err(RelayError::ResponseFormat(format!(
            "field \"{}\" is not a string",
            ANSWER_FIELD
        ))),
        None => Err(RelayError::ResponseFormat(format!(
            "missing field \"{}\"",
            ANSWER_FIELD
        ))),
    }
}

/// Routes messages to the greeting, lookup and question-answering behaviors.
pub struct Dispatcher<B: QaBackend> {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
    backend: B,
    translator: &'static MarkupTranslator,
}

impl<B: QaBackend> Dispatcher<B> {
    pub fn new(settings: Arc<Settings>, transport: Arc<dyn Transport>, backend: B) -> Self {
        Self {
            settings,
            transport,
            backend,
            translator: MarkupTranslator::shared(),
        }
    }

    /// Handle one message and log any failure with the command that caused it.
    pub async fn process(&self, msg: &InboundMessage) {
        if let Err(e) = self.handle(msg).await {
            log::warn!(
                "error handling command '{}': {}",
                msg.command().unwrap_or(""),
                e
            );
        }
    }

    /// Handle one message; errors are returned to the caller.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<Outcome, RelayError> {
        let route = Route::classify(msg);
        log::debug!("dispatch: chat {} -> {:?}", msg.chat_id, route);
        match route {
            Route::Greeting => self.greet(msg).await,
            Route::Lookup { argument } => self.lookup(msg, &argument).await,
            Route::Ask { question } => self.ask(msg, &question).await,
        }
    }

    async fn greet(&self, msg: &InboundMessage) -> Result<Outcome, RelayError> {
        self.transport
            .send_message(
                msg.chat_id,
                &self.settings.greeting,
                Some(ParseMode::Markdown),
                None,
            )
            .await?;
        Ok(Outcome::Greeted)
    }

    /// The argument is the reply body; no lookup source exists yet.
    async fn lookup(&self, msg: &InboundMessage, argument: &str) -> Result<Outcome, RelayError> {
        log::info!("info: {}", argument);
        self.transport
            .send_message(msg.chat_id, argument, Some(ParseMode::Html), None)
            .await?;
        Ok(Outcome::LookedUp)
    }

    async fn ask(&self, msg: &InboundMessage, question: &str) -> Result<Outcome, RelayError> {
        if msg.chat_kind.is_group() && !mentions_bot(msg, self.settings.bot_username()) {
            log::debug!("dispatch: group chat {} without bot mention, ignoring", msg.chat_id);
            return Ok(Outcome::Ignored);
        }

        if let Err(e) = self
            .transport
            .send_chat_action(msg.chat_id, ChatAction::Typing)
            .await
        {
            log::debug!("typing indicator failed: {}", e);
        }

        let placeholder_id = self
            .transport
            .send_message(
                msg.chat_id,
                &self.settings.thinking_text,
                None,
                Some(msg.message_id),
            )
            .await?;

        let question = strip_first_mention(question, &msg.entities)?;
        let response = self.backend.ask(&question).await?;
        let answer = self.translator.translate(extract_answer(&response)?);

        self.transport
            .edit_message_text(msg.chat_id, placeholder_id, &answer, Some(ParseMode::Html))
            .await?;
        Ok(Outcome::Answered)
    }
}
