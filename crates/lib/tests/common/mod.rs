//! Test doubles for the dispatcher: a recording transport and a canned Q&A backend.

#![allow(dead_code)]

use async_trait::async_trait;
use psyai::channels::{ChannelError, ChatAction, ParseMode, Transport};
use psyai::config::Settings;
use psyai::qa::{QaBackend, QaError, QaSettings};
use serde_json::{Map, Value};
use std::sync::Mutex;

/// Id returned for every message the recording transport "sends".
pub const PLACEHOLDER_ID: i64 = 77;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        chat_id: i64,
        text: String,
        parse_mode: Option<ParseMode>,
        reply_to: Option<i64>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        parse_mode: Option<ParseMode>,
    },
    Action {
        chat_id: i64,
        action: ChatAction,
    },
}

/// Transport that records every call. Sends and actions can be made to fail.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    fail_sends: bool,
    fail_actions: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn failing_actions() -> Self {
        Self {
            fail_actions: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Edit { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn refused(method: &'static str) -> ChannelError {
    ChannelError::Api {
        method,
        description: "Bad Request: refused by test transport".to_string(),
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to: Option<i64>,
    ) -> Result<i64, ChannelError> {
        if self.fail_sends {
            return Err(refused("sendMessage"));
        }
        self.record(Call::Send {
            chat_id,
            text: text.to_string(),
            parse_mode,
            reply_to,
        });
        Ok(PLACEHOLDER_ID)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), ChannelError> {
        self.record(Call::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            parse_mode,
        });
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<(), ChannelError> {
        if self.fail_actions {
            return Err(refused("sendChatAction"));
        }
        self.record(Call::Action { chat_id, action });
        Ok(())
    }
}

/// Backend that answers every question with the same JSON value, or fails.
pub struct StubBackend {
    response: Option<Value>,
    questions: Mutex<Vec<String>>,
}

impl StubBackend {
    pub fn answering(response: Value) -> Self {
        Self {
            response: Some(response),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QaBackend for StubBackend {
    async fn ask(&self, question: &str) -> Result<Map<String, Value>, QaError> {
        self.questions.lock().unwrap().push(question.to_string());
        match &self.response {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(QaError::Decode("expected a JSON object".to_string())),
            None => Err(QaError::Api("503 Service Unavailable".to_string())),
        }
    }
}

pub fn test_settings() -> Settings {
    Settings {
        bot_token: "test_bot_token_12345".to_string(),
        telegram_api_base: "http://127.0.0.1:1".to_string(),
        bot_username: Some("doseslog_bot".to_string()),
        greeting: "Welcome to *PsyAI*".to_string(),
        thinking_text: "PsyAI is thinking...".to_string(),
        poll_timeout_secs: 1,
        qa: QaSettings::new("http://127.0.0.1:1"),
    }
}
