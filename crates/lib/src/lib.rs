//! PsyAI relay library: the Telegram channel, command dispatch, the Q&A client and
//! the Markdown-to-Telegram-HTML translator used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod markup;
pub mod mention;
pub mod qa;
pub mod relay;
