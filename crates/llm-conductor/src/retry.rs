//! Retry with exponential backoff and failover across backends.
//!
//! [`FailoverProvider`] wraps a primary backend and an ordered list of
//! fallbacks. It implements [`Provider`] itself, so it slots in anywhere a
//! single backend would:
//!
//! ```text
//!   primary ── attempt 0 ─ backoff ─ attempt 1 ─ ... ─ attempt max_retries
//!      │ exhausted or permanent failure
//!   fallback[0] ── attempt 0 ─ ...
//!      │
//!   fallback[n] ── ...
//!      │
//!   LlmError::BackendExhausted { backends, last_error }
//! ```
//!
//! Only [`LlmError::Backend`] failures are handled here. Transient ones
//! (see [`LlmError::is_retryable`]) are retried on the same backend while
//! budget remains; permanent ones move straight to the next backend. Any
//! other error kind propagates unchanged.
//!
//! Backoff delays go through the [`Sleeper`] seam so tests can run without
//! waiting on the wall clock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::chat::ChatResponse;
use crate::error::LlmError;
use crate::provider::{ChatRequest, DynProvider, Provider};

/// Default number of retries per backend (not counting the first try).
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Retry budget and backoff curve for one backend.
///
/// The delay before retry `n` (0-indexed) is
/// `min(base_delay * 2^n, max_delay)`:
///
/// ```rust
/// use llm_conductor::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy {
///     max_retries: 3,
///     base_delay: Duration::from_millis(200),
///     max_delay: Duration::from_millis(500),
/// };
/// assert_eq!(policy.backoff(0), Duration::from_millis(200));
/// assert_eq!(policy.backoff(1), Duration::from_millis(400));
/// assert_eq!(policy.backoff(2), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retry attempts per backend (not counting the initial try).
    /// Default: 2.
    pub max_retries: u32,
    /// Delay before the first retry. Default: 500ms.
    pub base_delay: Duration,
    /// Upper bound on any single delay. Default: 30 seconds.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// The delay to wait after failed attempt `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Pauses between retries.
///
/// The default [`TokioSleeper`] waits on the tokio timer. Tests substitute
/// an implementation that records the requested delays and returns
/// immediately.
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// A [`Sleeper`] backed by [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A backend that retries transient failures and fails over through an
/// ordered list of alternates.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use llm_conductor::retry::{FailoverProvider, RetryPolicy};
/// use llm_conductor::{ChatMessage, ChatRequest, DynProvider, Provider};
///
/// # async fn example(
/// #     primary: Arc<dyn DynProvider>,
/// #     backup: Arc<dyn DynProvider>,
/// # ) -> Result<(), llm_conductor::LlmError> {
/// let backend = FailoverProvider::new(primary)
///     .with_fallbacks(vec![backup])
///     .with_policy(RetryPolicy { max_retries: 1, ..Default::default() });
///
/// let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")])?;
/// let response = backend.chat(&request).await?;
/// # Ok(())
/// # }
/// ```
pub struct FailoverProvider {
    backends: Vec<Arc<dyn DynProvider>>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for FailoverProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverProvider")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FailoverProvider {
    /// Wraps `primary` with the default [`RetryPolicy`], no fallbacks, and
    /// the tokio sleeper.
    pub fn new(primary: Arc<dyn DynProvider>) -> Self {
        Self {
            backends: vec![primary],
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Sets the fallback backends, tried in order after the primary.
    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: Vec<Arc<dyn DynProvider>>) -> Self {
        self.backends.truncate(1);
        self.backends.extend(fallbacks);
        self
    }

    /// Sets the retry policy applied to every backend.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The primary followed by the fallbacks.
    pub fn backends(&self) -> &[Arc<dyn DynProvider>] {
        &self.backends
    }

    /// Runs up to `max_retries + 1` attempts against one backend.
    ///
    /// Returns `Ok(Err(last_backend_error))` when the backend should be
    /// abandoned, and `Err` for errors that must propagate unchanged.
    async fn attempt_backend(
        &self,
        backend: &dyn DynProvider,
        request: &ChatRequest,
    ) -> Result<Result<ChatResponse, LlmError>, LlmError> {
        let mut attempt = 0;
        loop {
            match backend.chat_boxed(request).await {
                Ok(response) => return Ok(Ok(response)),
                Err(err @ LlmError::Backend { .. }) => {
                    if !err.is_retryable() {
                        tracing::warn!(
                            backend = backend.name(),
                            error = %err,
                            "permanent backend failure, moving to next backend"
                        );
                        return Ok(Err(err));
                    }
                    if attempt >= self.policy.max_retries {
                        tracing::warn!(
                            backend = backend.name(),
                            attempts = attempt + 1,
                            error = %err,
                            "retry budget exhausted, moving to next backend"
                        );
                        return Ok(Err(err));
                    }
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        backend = backend.name(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient backend failure, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

impl Provider for FailoverProvider {
    #[instrument(skip_all, fields(model = %request.model(), backends = self.backends.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut attempted = Vec::with_capacity(self.backends.len());
        let mut last_error = None;

        for backend in &self.backends {
            attempted.push(backend.name().to_owned());
            match self.attempt_backend(backend.as_ref(), request).await? {
                Ok(response) => return Ok(response),
                Err(err) => last_error = Some(err),
            }
        }

        let last_error = last_error.unwrap_or_else(|| {
            LlmError::Configuration("failover strategy has no backends".into())
        });
        Err(LlmError::BackendExhausted {
            backends: attempted,
            last_error: Box::new(last_error),
        })
    }

    fn name(&self) -> &str {
        self.backends.first().map_or("failover", |b| b.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use crate::mock::MockError;
    use crate::test_helpers::{RecordingSleeper, mock_for, text_response};

    fn request() -> ChatRequest {
        ChatRequest::new("test-model", vec![ChatMessage::user("hi")]).unwrap()
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_backoff_sequence_is_capped() {
        let policy = fast_policy(3);
        let delays: Vec<_> = (0..4).map(|n| policy.backoff(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let policy = RetryPolicy {
            max_retries: 100,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(63), Duration::from_secs(30));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let primary = Arc::new(mock_for("primary"));
        primary.queue_response(text_response("ok"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let failover = FailoverProvider::new(primary.clone())
            .with_policy(fast_policy(2))
            .with_sleeper(sleeper.clone());
        let response = failover.chat(&request()).await.unwrap();

        assert_eq!(response.text(), "ok");
        assert_eq!(primary.call_count(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retries_same_backend() {
        let primary = Arc::new(mock_for("primary"));
        primary
            .queue_error(MockError::backend(503, "busy"))
            .queue_error(MockError::backend(429, "slow down"))
            .queue_response(text_response("recovered"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let failover = FailoverProvider::new(primary.clone())
            .with_policy(fast_policy(2))
            .with_sleeper(sleeper.clone());
        let response = failover.chat(&request()).await.unwrap();

        assert_eq!(response.text(), "recovered");
        assert_eq!(primary.call_count(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test]
    async fn test_retry_budget_is_exactly_max_retries_plus_one() {
        for max_retries in 0..4 {
            let primary = Arc::new(mock_for("primary"));
            primary.always_fail(MockError::backend(500, "boom"));
            let sleeper = Arc::new(RecordingSleeper::default());

            let failover = FailoverProvider::new(primary.clone())
                .with_policy(fast_policy(max_retries))
                .with_sleeper(sleeper.clone());
            let err = failover.chat(&request()).await.unwrap_err();

            assert!(matches!(err, LlmError::BackendExhausted { .. }));
            assert_eq!(primary.call_count(), max_retries as usize + 1);
            assert_eq!(sleeper.delays().len(), max_retries as usize);
        }
    }

    #[tokio::test]
    async fn test_permanent_failure_skips_to_next_backend() {
        for status in [400, 401, 403, 404, 422] {
            let primary = Arc::new(mock_for("primary"));
            primary.always_fail(MockError::backend(status, "rejected"));
            let backup = Arc::new(mock_for("backup"));
            backup.queue_response(text_response("from backup"));
            let sleeper = Arc::new(RecordingSleeper::default());

            let failover = FailoverProvider::new(primary.clone())
                .with_fallbacks(vec![backup.clone()])
                .with_policy(fast_policy(3))
                .with_sleeper(sleeper.clone());
            let response = failover.chat(&request()).await.unwrap();

            assert_eq!(response.text(), "from backup");
            assert_eq!(primary.call_count(), 1, "status {status} must not be retried");
            assert!(sleeper.delays().is_empty());
        }
    }

    #[tokio::test]
    async fn test_no_response_is_transient() {
        let primary = Arc::new(mock_for("primary"));
        primary
            .queue_error(MockError::Backend {
                status: None,
                message: "connection reset".into(),
            })
            .queue_error(MockError::backend(0, "no response"))
            .queue_response(text_response("ok"));

        let failover = FailoverProvider::new(primary.clone())
            .with_policy(fast_policy(2))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        assert!(failover.chat(&request()).await.is_ok());
        assert_eq!(primary.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_names_every_backend_and_chains_last_error() {
        let primary = Arc::new(mock_for("primary"));
        primary.always_fail(MockError::backend(500, "primary down"));
        let backup = Arc::new(mock_for("backup"));
        backup.always_fail(MockError::backend(401, "backup rejected"));

        let failover = FailoverProvider::new(primary.clone())
            .with_fallbacks(vec![backup.clone()])
            .with_policy(fast_policy(1))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let err = failover.chat(&request()).await.unwrap_err();

        match err {
            LlmError::BackendExhausted {
                backends,
                last_error,
            } => {
                assert_eq!(backends, vec!["primary", "backup"]);
                assert_eq!(last_error.status(), Some(401));
            }
            other => panic!("expected BackendExhausted, got {other:?}"),
        }
        assert_eq!(primary.call_count(), 2);
        assert_eq!(backup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_backend_errors_propagate_unchanged() {
        let primary = Arc::new(mock_for("primary"));
        primary.queue_error(MockError::Configuration("bad request shape".into()));
        let backup = Arc::new(mock_for("backup"));
        backup.queue_response(text_response("unused"));

        let failover = FailoverProvider::new(primary.clone())
            .with_fallbacks(vec![backup.clone()])
            .with_policy(fast_policy(3))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let err = failover.chat(&request()).await.unwrap_err();

        assert!(matches!(err, LlmError::Configuration(_)));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(backup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallbacks_tried_in_order() {
        let primary = Arc::new(mock_for("primary"));
        primary.always_fail(MockError::backend(502, "bad gateway"));
        let second = Arc::new(mock_for("second"));
        second.always_fail(MockError::backend(404, "no such model"));
        let third = Arc::new(mock_for("third"));
        third.queue_response(text_response("third wins"));

        let failover = FailoverProvider::new(primary.clone())
            .with_fallbacks(vec![second.clone(), third.clone()])
            .with_policy(fast_policy(0))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let response = failover.chat(&request()).await.unwrap();

        assert_eq!(response.text(), "third wins");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(second.call_count(), 1);
        assert_eq!(third.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_waits_for_duration() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(5)).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn test_name_is_primary_name() {
        let failover = FailoverProvider::new(Arc::new(mock_for("primary")));
        assert_eq!(Provider::name(&failover), "primary");
        assert!(format!("{failover:?}").contains("primary"));
    }
}
