//! Tgcast - rate-limited mass messaging for Telegram
//!
//! This library sends one message to a list of Telegram usernames, one at a
//! time, backing off when Telegram applies flood control, and writes the
//! handles that could not be reached to retry files.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handles;
pub mod interactive;
pub mod logging;
pub mod messenger;
pub mod report;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use client::MessagingClient;
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{ClientError, ConfigError, Result, TgcastError};
pub use messenger::Messenger;
pub use report::{FailureCategory, RunReport};
pub use service::{RunOutcome, SendingService};
pub use types::SendResult;
