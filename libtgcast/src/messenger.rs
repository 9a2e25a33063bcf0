//! Messenger adapter around a [`MessagingClient`]
//!
//! Tracks the connection state and applies the only retry policy in the
//! system: a handle whose send fails with a flood-control error is retried at
//! most [`FLOOD_MAX_RETRIES`] times, waiting `60s * 2^retry` before each
//! retry. The wait blocks the whole run; no other handle is processed
//! meanwhile.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::client::MessagingClient;
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, Result};
use crate::handles::normalize_handle;
use crate::report::FailureCategory;
use crate::types::SendResult;

/// Retries allowed after the first flood-controlled attempt
pub const FLOOD_MAX_RETRIES: u32 = 2;

/// Backoff before the first retry; doubles for each further retry
pub const FLOOD_BASE_DELAY: Duration = Duration::from_secs(60);

/// Wait before retry number `retry` (0-based): 60s, 120s
pub fn flood_backoff(retry: u32) -> Duration {
    FLOOD_BASE_DELAY * 2u32.pow(retry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

pub struct Messenger<C> {
    client: C,
    state: ConnectionState,
}

impl<C: MessagingClient> Messenger<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Connect; a no-op when already connected
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match self.client.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("Connected to {}", self.client.name());
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                error!("Failed to connect to {}: {}", self.client.name(), e);
                Err(e)
            }
        }
    }

    /// Disconnect; a no-op when already disconnected
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Disconnected {
            return Ok(());
        }

        self.state = ConnectionState::Disconnecting;
        let result = self.client.disconnect().await;
        self.state = ConnectionState::Disconnected;

        if result.is_ok() {
            info!("Disconnected from {}", self.client.name());
        }
        result
    }

    /// Send `message` to one handle, retrying on flood control
    ///
    /// The returned result is the handle's only result, whatever number of
    /// attempts it took.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotConnected` when called before [`connect`].
    /// Every failure reported by the client becomes a failed [`SendResult`].
    ///
    /// [`connect`]: Messenger::connect
    pub async fn send_message(&self, handle: &str, message: &str) -> Result<SendResult> {
        if self.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected.into());
        }

        let recipient = normalize_handle(handle);
        let mut retries = 0;

        loop {
            debug!("Sending to {} (retry {})", recipient, retries);

            let error = match self.client.send(recipient, message).await {
                Ok(()) => return Ok(SendResult::success(handle)),
                Err(e) => e.delivery_text(),
            };

            if FailureCategory::classify(&error) == FailureCategory::FloodControl
                && retries < FLOOD_MAX_RETRIES
            {
                let delay = flood_backoff(retries);
                warn!(
                    "PEER_FLOOD for {}, retrying in {}s... (attempt {}/{})",
                    handle,
                    delay.as_secs(),
                    retries + 1,
                    FLOOD_MAX_RETRIES
                );
                sleep(delay).await;
                retries += 1;
                continue;
            }

            return Ok(SendResult::failure(handle, error));
        }
    }

    /// Send `message` to every handle at `rate_limit` messages per second
    ///
    /// See [`Dispatcher::send_to_all`].
    pub async fn send_to_multiple<F>(
        &self,
        handles: &[String],
        message: &str,
        rate_limit: u32,
        on_progress: F,
    ) -> Vec<SendResult>
    where
        F: FnMut(&SendResult, usize, usize),
    {
        Dispatcher::new(rate_limit)
            .send_to_all(self, handles, message, on_progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use tokio::time::Instant;

    fn assert_about(actual: Duration, expected: Duration) {
        let slack = Duration::from_millis(10);
        assert!(
            actual >= expected && actual <= expected + slack,
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(flood_backoff(0), Duration::from_secs(60));
        assert_eq!(flood_backoff(1), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let mut messenger = Messenger::new(MockClient::success());
        assert_eq!(messenger.state(), ConnectionState::Disconnected);

        messenger.connect().await.unwrap();
        messenger.connect().await.unwrap();

        assert_eq!(messenger.state(), ConnectionState::Connected);
        assert_eq!(messenger.client().connect_call_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut messenger = Messenger::new(MockClient::success());

        messenger.disconnect().await.unwrap();
        assert_eq!(messenger.client().disconnect_call_count(), 0);

        messenger.connect().await.unwrap();
        messenger.disconnect().await.unwrap();
        messenger.disconnect().await.unwrap();

        assert_eq!(messenger.state(), ConnectionState::Disconnected);
        assert_eq!(messenger.client().disconnect_call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_returns_to_disconnected() {
        let mut messenger = Messenger::new(MockClient::connect_failure("timeout"));

        assert!(messenger.connect().await.is_err());
        assert_eq!(messenger.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let messenger = Messenger::new(MockClient::success());

        let err = messenger.send_message("alice", "hi").await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn test_at_prefix_is_stripped_before_delivery() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let with_at = messenger.send_message("@bob", "hi").await.unwrap();
        let without_at = messenger.send_message("bob", "hi").await.unwrap();

        assert_eq!(with_at.handle, "@bob");
        assert_eq!(without_at.handle, "bob");

        let attempts = messenger.client().attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.recipient == "bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_twice_then_success() {
        let client = MockClient::success().fail_times("bob", "PEER_FLOOD", 2);
        let mut messenger = Messenger::new(client);
        messenger.connect().await.unwrap();

        let result = messenger.send_message("bob", "hi").await.unwrap();
        assert_eq!(result, SendResult::success("bob"));

        let attempts = messenger.client().attempts_for("bob");
        assert_eq!(attempts.len(), 3);
        assert_about(attempts[1].at - attempts[0].at, Duration::from_secs(60));
        assert_about(attempts[2].at - attempts[1].at, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_three_times_gives_up_after_two_retries() {
        let client = MockClient::success().always_fail("bob", "420: PEER_FLOOD");
        let mut messenger = Messenger::new(client);
        messenger.connect().await.unwrap();

        let start = Instant::now();
        let result = messenger.send_message("bob", "hi").await.unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("420: PEER_FLOOD"));
        assert_eq!(messenger.client().attempts_for("bob").len(), 3);
        assert_about(start.elapsed(), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let client = MockClient::success().always_fail("ghost", "USERNAME_INVALID");
        let mut messenger = Messenger::new(client);
        messenger.connect().await.unwrap();

        let start = Instant::now();
        let result = messenger.send_message("@ghost", "hi").await.unwrap();

        assert_eq!(result, SendResult::failure("@ghost", "USERNAME_INVALID"));
        assert_eq!(messenger.client().attempts().len(), 1);
        assert_about(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_then_other_error_stops_retrying() {
        let client = MockClient::success().script(
            "bob",
            vec![
                crate::client::mock::MockOutcome::Reject("PEER_FLOOD".to_string()),
                crate::client::mock::MockOutcome::Reject("USER_IS_BLOCKED".to_string()),
            ],
        );
        let mut messenger = Messenger::new(client);
        messenger.connect().await.unwrap();

        let result = messenger.send_message("bob", "hi").await.unwrap();

        assert_eq!(result.error.as_deref(), Some("USER_IS_BLOCKED"));
        assert_eq!(messenger.client().attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_multiple_paces_by_rate() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let handles = vec!["a".to_string(), "@b".to_string()];
        let mut seen = 0;
        let results = messenger
            .send_to_multiple(&handles, "hi", 4, |_, _, _| seen += 1)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(seen, 2);

        let attempts = messenger.client().attempts();
        assert_about(attempts[1].at - attempts[0].at, Duration::from_millis(250));
    }
}
