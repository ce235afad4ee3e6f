//! Circuit breaker for protecting external service calls (Trakt, the indexer,
//! the downloader) against cascading failures.
//!
//! States: Closed (normal), Open (rejecting), HalfOpen (testing recovery).

use crate::error::{MomenarrError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitBreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub success_threshold: u32,
    pub request_timeout: Duration,
    pub service_name: String,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 1,
            request_timeout: Duration::from_secs(10),
            service_name: "unknown".to_string(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitBreakerState,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rejected_requests: u64,
    pub consecutive_failures: u32,
    pub service_name: String,
}

#[derive(Debug)]
struct Inner {
    state: CircuitBreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    circuit_opened_time: Option<Instant>,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<RwLock<Inner>>,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    rejected_requests: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(Inner {
                state: CircuitBreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                circuit_opened_time: None,
            })),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    /// Execute `operation` protected by the circuit breaker and a per-request timeout.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, E>>,
        E: Into<MomenarrError>,
    {
        if !self.can_proceed().await {
            self.rejected_requests.fetch_add(1, Ordering::Relaxed);
            return Err(MomenarrError::CircuitBreakerOpen {
                service: self.config.service_name.clone(),
            });
        }

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        match tokio::time::timeout(self.config.request_timeout, operation).await {
            Ok(Ok(result)) => {
                self.on_success().await;
                debug!(
                    service = %self.config.service_name,
                    duration_ms = start.elapsed().as_millis(),
                    "circuit breaker: operation succeeded"
                );
                Ok(result)
            }
            Ok(Err(error)) => {
                let error = error.into();
                self.on_failure().await;
                error!(service = %self.config.service_name, %error, "circuit breaker: operation failed");
                Err(error)
            }
            Err(_) => {
                let error = MomenarrError::Timeout {
                    operation: format!("{} request", self.config.service_name),
                };
                self.on_failure().await;
                error!(service = %self.config.service_name, "circuit breaker: operation timed out");
                Err(error)
            }
        }
    }

    async fn can_proceed(&self) -> bool {
        let state = self.state.read().await;
        match state.state {
            CircuitBreakerState::Closed | CircuitBreakerState::HalfOpen => true,
            CircuitBreakerState::Open => match state.circuit_opened_time {
                Some(opened) if opened.elapsed() >= self.config.timeout => {
                    drop(state);
                    self.transition_to_half_open().await;
                    true
                }
                Some(_) => false,
                None => true,
            },
        }
    }

    async fn on_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write().await;
        state.consecutive_failures = 0;
        if state.state == CircuitBreakerState::HalfOpen {
            state.consecutive_successes += 1;
            if state.consecutive_successes >= self.config.success_threshold {
                info!(service = %self.config.service_name, "circuit breaker: transitioning to CLOSED");
                state.state = CircuitBreakerState::Closed;
                state.consecutive_successes = 0;
                state.circuit_opened_time = None;
            }
        }
    }

    async fn on_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write().await;
        state.consecutive_successes = 0;
        match state.state {
            CircuitBreakerState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    warn!(service = %self.config.service_name, "circuit breaker: transitioning to OPEN");
                    state.state = CircuitBreakerState::Open;
                    state.circuit_opened_time = Some(Instant::now());
                }
            }
            CircuitBreakerState::HalfOpen => {
                warn!(service = %self.config.service_name, "circuit breaker: test failed, back to OPEN");
                state.state = CircuitBreakerState::Open;
                state.circuit_opened_time = Some(Instant::now());
                state.consecutive_failures += 1;
            }
            CircuitBreakerState::Open => {
                state.consecutive_failures += 1;
            }
        }
    }

    async fn transition_to_half_open(&self) {
        let mut state = self.state.write().await;
        if state.state == CircuitBreakerState::Open {
            info!(service = %self.config.service_name, "circuit breaker: transitioning to HALF_OPEN");
            state.state = CircuitBreakerState::HalfOpen;
            state.consecutive_successes = 0;
        }
    }

    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        let state = self.state.read().await;
        CircuitBreakerMetrics {
            state: state.state,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            consecutive_failures: state.consecutive_failures,
            service_name: self.config.service_name.clone(),
        }
    }

    pub async fn state(&self) -> CircuitBreakerState {
        self.state.read().await.state
    }
}
