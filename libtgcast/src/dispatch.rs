//! Sequential, rate-limited dispatch over a list of handles

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::client::MessagingClient;
use crate::config::Config;
use crate::messenger::Messenger;
use crate::types::SendResult;

/// Sends one message to many handles, strictly one at a time
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    rate_limit: u32,
    delay: Duration,
}

impl Dispatcher {
    /// Create a dispatcher for `rate_limit` messages per second
    ///
    /// A zero rate is treated as one message per second.
    pub fn new(rate_limit: u32) -> Self {
        let rate_limit = rate_limit.max(1);
        Self {
            rate_limit,
            delay: Duration::from_secs(1) / rate_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit)
    }

    /// Pause applied after every send except the last
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Send `message` to every handle in order
    ///
    /// Produces exactly one result per handle, in input order. `on_progress`
    /// receives each result with its 1-based index and the total. A handle
    /// whose send errors unexpectedly is recorded as a failure and the loop
    /// moves on.
    pub async fn send_to_all<C, F>(
        &self,
        messenger: &Messenger<C>,
        handles: &[String],
        message: &str,
        mut on_progress: F,
    ) -> Vec<SendResult>
    where
        C: MessagingClient,
        F: FnMut(&SendResult, usize, usize),
    {
        let total = handles.len();
        let mut results = Vec::with_capacity(total);

        info!("Sending message to {} handles", total);
        info!("Rate limit: {} messages/second", self.rate_limit);

        for (i, handle) in handles.iter().enumerate() {
            let result = match messenger.send_message(handle, message).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Unexpected error sending to {}: {}", handle, e);
                    SendResult::failure(handle.as_str(), e.delivery_text())
                }
            };

            on_progress(&result, i + 1, total);
            results.push(result);

            if i + 1 < total {
                sleep(self.delay).await;
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use tokio::time::Instant;

    fn handles(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_delay_from_rate_limit() {
        assert_eq!(Dispatcher::new(1).delay(), Duration::from_secs(1));
        assert_eq!(Dispatcher::new(2).delay(), Duration::from_millis(500));
        assert_eq!(Dispatcher::new(4).delay(), Duration::from_millis(250));
        assert_eq!(Dispatcher::new(0).delay(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_in_order_with_progress() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let mut progress = Vec::new();
        let results = Dispatcher::new(10)
            .send_to_all(&messenger, &handles(&["a", "b", "c"]), "hi", |r, i, n| {
                progress.push((r.handle.clone(), i, n))
            })
            .await;

        let sent: Vec<&str> = results.iter().map(|r| r.handle.as_str()).collect();
        assert_eq!(sent, vec!["a", "b", "c"]);
        assert_eq!(
            progress,
            vec![
                ("a".to_string(), 1, 3),
                ("b".to_string(), 2, 3),
                ("c".to_string(), 3, 3)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_last_send() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let start = Instant::now();
        Dispatcher::new(1)
            .send_to_all(&messenger, &handles(&["a", "b", "c"]), "hi", |_, _, _| {})
            .await;

        // Two gaps between three sends
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unexpected_error_does_not_abort() {
        // Never connected: every send errors before reaching the client
        let messenger = Messenger::new(MockClient::success());

        let results = Dispatcher::new(1000)
            .send_to_all(&messenger, &handles(&["a", "b"]), "hi", |_, _, _| {})
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        assert!(results[0].error_text().contains("not connected"));
    }

    #[tokio::test]
    async fn test_empty_handle_list() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let results = Dispatcher::new(1)
            .send_to_all(&messenger, &[], "hi", |_, _, _| panic!("no progress expected"))
            .await;

        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_are_sent_twice() {
        let mut messenger = Messenger::new(MockClient::success());
        messenger.connect().await.unwrap();

        let results = Dispatcher::new(5)
            .send_to_all(&messenger, &handles(&["@a", "a"]), "hi", |_, _, _| {})
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(messenger.client().attempts_for("a").len(), 2);
    }
}
