//! Messaging client abstraction and implementations
//!
//! The dispatch loop only needs three capabilities from the protocol client:
//! connect, disconnect and send one text message. Everything else
//! (authentication handshake, session serialization, transport) stays inside
//! the implementation.
//!
//! # Examples
//!
//! ```no_run
//! use libtgcast::client::{MessagingClient, telegram::TelegramClient};
//! use libtgcast::Config;
//!
//! # async fn example() -> libtgcast::error::Result<()> {
//! let config = Config::load()?;
//! let mut client = TelegramClient::new(&config, None);
//!
//! client.connect().await?;
//! client.send("durov", "Hello!").await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;

pub mod telegram;

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Minimal capability interface over the delegated protocol client
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Establish a session with the service
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Authentication` when the session is missing or no
    /// longer authorized, `ClientError::Connection` for transport failures.
    async fn connect(&mut self) -> Result<()>;

    /// Close the session
    async fn disconnect(&mut self) -> Result<()>;

    /// Send `text` to a normalized recipient (no leading `@`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` carrying the service's error text when
    /// the service refuses the message.
    async fn send(&self, recipient: &str, text: &str) -> Result<()>;

    /// Serialized session token, if a session is established
    fn session_string(&self) -> Option<String>;

    /// Short lowercase name of the service (e.g. "telegram")
    fn name(&self) -> &str;
}
