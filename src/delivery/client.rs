//! Delivery client: retry, backoff and pacing around the transport
//!
//! Retries are an explicit loop with an attempt counter and an injectable
//! sleep, so tests can exercise every outcome without real delays. Only
//! transport-level failures are retried; a reply that arrives intact is
//! returned to the caller even if it carries an application rejection.
//! A minimum inter-request delay is kept between deliveries so a batch
//! does not hammer the external service.

use crate::config::RetryPolicy;
use crate::delivery::transport::Transport;
use crate::types::{AttemptOutcome, DeliveryAttempt};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Minimum gap between two consecutive deliveries, successful or not
pub const MIN_REQUEST_GAP: Duration = Duration::from_millis(250);

/// Injectable sleep, so backoff is testable without waiting
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test sleeper: records requested delays, never actually waits
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Everything one delivery produced: the attempts and, if any exchange got
/// through, the raw reply
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    pub attempts: Vec<DeliveryAttempt>,
    /// Raw reply from the first successful exchange; `None` when every
    /// attempt failed at the transport level
    pub reply: Option<String>,
}

impl DeliveryRecord {
    /// Message of the last transport error, for result reporting
    pub fn last_transport_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            AttemptOutcome::TransportError { message } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Relabel the final attempt as an application-level rejection
    pub fn mark_rejected(&mut self) {
        if let Some(last) = self.attempts.last_mut() {
            last.outcome = AttemptOutcome::Rejected;
        }
    }

    /// Attach the external identifier to the successful attempt
    pub fn set_external_id(&mut self, external_id: &str) {
        if let Some(last) = self.attempts.last_mut() {
            if let AttemptOutcome::Success { external_id: slot } = &mut last.outcome {
                *slot = Some(external_id.to_string());
            }
        }
    }
}

/// Delivery client wrapping a transport with the retry policy
pub struct DeliveryClient<T: Transport, S: Sleeper> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
    request_gap: Duration,
    last_request: Option<Instant>,
}

impl<T: Transport, S: Sleeper> DeliveryClient<T, S> {
    pub fn new(transport: T, sleeper: S, retry: RetryPolicy) -> Self {
        DeliveryClient {
            transport,
            sleeper,
            retry,
            request_gap: MIN_REQUEST_GAP,
            last_request: None,
        }
    }

    /// Deliver one payload, retrying transport failures per the policy
    ///
    /// The attempt sequence ends at the first intact reply or when the
    /// retry budget is exhausted; there is never a fourth attempt with the
    /// default policy.
    pub async fn deliver(&mut self, payload: &str) -> DeliveryRecord {
        self.pace().await;

        let mut attempts = Vec::new();
        for attempt in 1..=self.retry.max_attempts {
            let started_at = Utc::now();
            match self.transport.exchange(payload).await {
                Ok(reply) => {
                    attempts.push(DeliveryAttempt {
                        attempt,
                        started_at,
                        outcome: AttemptOutcome::Success { external_id: None },
                    });
                    self.last_request = Some(Instant::now());
                    return DeliveryRecord {
                        attempts,
                        reply: Some(reply),
                    };
                }
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "delivery attempt failed");
                    attempts.push(DeliveryAttempt {
                        attempt,
                        started_at,
                        outcome: AttemptOutcome::TransportError {
                            message: error.to_string(),
                        },
                    });
                    if attempt < self.retry.max_attempts {
                        self.sleeper.sleep(self.retry.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        self.last_request = Some(Instant::now());
        DeliveryRecord {
            attempts,
            reply: None,
        }
    }

    /// Enforce the minimum inter-request delay between deliveries
    async fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.request_gap {
                self.sleeper.sleep(self.request_gap - elapsed).await;
            }
        }
    }

    /// Override the inter-request gap, e.g. for local endpoints
    pub fn with_request_gap(mut self, gap: Duration) -> Self {
        self.request_gap = gap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::transport::{MockTransport, TransportError};

    fn client(mock: &MockTransport) -> DeliveryClient<MockTransport, RecordingSleeper> {
        DeliveryClient::new(mock.clone(), RecordingSleeper::new(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_first_attempt_success_makes_one_attempt() {
        let mock = MockTransport::new();
        mock.push_ok("<ENVELOPE><CREATED>1</CREATED></ENVELOPE>");
        let mut client = client(&mock);

        let record = client.deliver("payload").await;
        assert_eq!(record.attempts.len(), 1);
        assert!(record.reply.is_some());
        assert!(matches!(
            record.attempts[0].outcome,
            AttemptOutcome::Success { .. }
        ));
    }

    #[tokio::test]
    async fn test_two_failures_then_success_makes_three_attempts() {
        let mock = MockTransport::new();
        mock.push_reply(Err(TransportError::Connect("refused".to_string())));
        mock.push_reply(Err(TransportError::Timeout("slow".to_string())));
        mock.push_ok("<ENVELOPE><CREATED>1</CREATED></ENVELOPE>");
        let sleeper = RecordingSleeper::new();
        let mut client =
            DeliveryClient::new(mock.clone(), sleeper.clone(), RetryPolicy::default());

        let record = client.deliver("payload").await;
        assert_eq!(record.attempts.len(), 3);
        assert!(record.reply.is_some());
        assert_eq!(record.attempts[2].attempt, 3);
        // Backoff between attempts: 2s then 4s
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_make_exactly_three_attempts() {
        let mock = MockTransport::new();
        for _ in 0..5 {
            mock.push_reply(Err(TransportError::Connect("refused".to_string())));
        }
        let sleeper = RecordingSleeper::new();
        let mut client =
            DeliveryClient::new(mock.clone(), sleeper.clone(), RetryPolicy::default());

        let record = client.deliver("payload").await;
        assert_eq!(record.attempts.len(), 3);
        assert!(record.reply.is_none());
        assert_eq!(mock.requests().len(), 3);
        assert_eq!(record.last_transport_error(), Some("connection failed: refused"));
        // No sleep after the final attempt
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_pacing_sleeps_between_back_to_back_deliveries() {
        let mock = MockTransport::new();
        mock.push_ok("ok");
        mock.push_ok("ok");
        let sleeper = RecordingSleeper::new();
        let mut client =
            DeliveryClient::new(mock.clone(), sleeper.clone(), RetryPolicy::default());

        client.deliver("first").await;
        client.deliver("second").await;

        let slept = sleeper.slept();
        assert_eq!(slept.len(), 1);
        assert!(slept[0] <= MIN_REQUEST_GAP);
    }

    #[tokio::test]
    async fn test_mark_rejected_relabels_final_attempt() {
        let mock = MockTransport::new();
        mock.push_ok("<ENVELOPE><ERRORS>1</ERRORS></ENVELOPE>");
        let mut client = client(&mock);

        let mut record = client.deliver("payload").await;
        record.mark_rejected();
        assert!(matches!(
            record.attempts.last().unwrap().outcome,
            AttemptOutcome::Rejected
        ));
    }

    #[tokio::test]
    async fn test_set_external_id_fills_success_outcome() {
        let mock = MockTransport::new();
        mock.push_ok("ok");
        let mut client = client(&mock);

        let mut record = client.deliver("payload").await;
        record.set_external_id("12345");
        assert_eq!(
            record.attempts.last().unwrap().outcome,
            AttemptOutcome::Success {
                external_id: Some("12345".to_string())
            }
        );
    }
}
