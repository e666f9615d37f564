//! Timing policy for one solve call and the cancellable waits it drives.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::error::CaptchaError;
use super::reqwest_client::ReqwestTaskHttpClient;
use super::transport::TaskHttpClient;

const DEFAULT_INITIAL_WAIT_SECS: u64 = 5;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_MAX_RETRIES: usize = 30;

/// Immutable timing policy plus the transport used for a solve call.
#[derive(Clone)]
pub struct Settings {
    initial_wait: Duration,
    poll_interval: Duration,
    poll_jitter: Duration,
    max_retries: usize,
    http: Arc<dyn TaskHttpClient>,
}

impl Settings {
    /// Default policy: 5s initial wait, 2s poll interval, 30 polls.
    pub fn new(http: Arc<dyn TaskHttpClient>) -> Self {
        Self {
            initial_wait: Duration::from_secs(DEFAULT_INITIAL_WAIT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_jitter: Duration::ZERO,
            max_retries: DEFAULT_MAX_RETRIES,
            http,
        }
    }

    /// Default policy backed by a fresh reqwest connection pool.
    pub fn reqwest() -> Result<Self, CaptchaError> {
        Ok(Self::new(Arc::new(ReqwestTaskHttpClient::new()?)))
    }

    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Adds up to `jitter` of random delay on top of every poll interval.
    pub fn with_poll_jitter(mut self, jitter: Duration) -> Self {
        self.poll_jitter = jitter;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn TaskHttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll_jitter(&self) -> Duration {
        self.poll_jitter
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn http(&self) -> &Arc<dyn TaskHttpClient> {
        &self.http
    }

    /// Delay before the next poll, including jitter when configured.
    pub fn next_poll_delay(&self) -> Duration {
        if self.poll_jitter.is_zero() {
            return self.poll_interval;
        }
        let jitter_ms = u64::try_from(self.poll_jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        // saturates at Duration::MAX rather than panicking
        self.poll_interval.saturating_add(Duration::from_millis(extra))
    }

    /// Turns `timeout` into a deadline by cancelling `token` once it elapses.
    ///
    /// The timer stops early if the token is cancelled by someone else.
    pub fn cancel_after(token: &CancellationToken, timeout: Duration) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(timeout) => token.cancel(),
                _ = token.cancelled() => {}
            }
        });
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("initial_wait", &self.initial_wait)
            .field("poll_interval", &self.poll_interval)
            .field("poll_jitter", &self.poll_jitter)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn sleep_with_cancel(
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), CaptchaError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CaptchaError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}
