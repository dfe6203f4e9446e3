//! Remote question-answering service: backend trait and HTTP client.

mod client;

pub use client::{
    QaBackend, QaClient, QaError, QaSettings, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOKENS,
};
