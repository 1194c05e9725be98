// Retry & health - transient failure classification, exponential backoff,
// a pre-call TCP reachability probe, and a per-address circuit breaker.

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tonic::Code;

/// Backoff tuning for a single runner, derived from `--retry`/`--retry-delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first. 1 means "no retries".
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(retries: u32, initial_delay_secs: f64) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            initial_delay: Duration::from_secs_f64(initial_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff, doubling each attempt and capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

/// True if a gRPC status code represents a transient, retry-worthy failure.
pub fn is_transient_status(code: Code) -> bool {
    matches!(
        code,
        Code::DeadlineExceeded | Code::ResourceExhausted | Code::Internal | Code::Unavailable
    )
}

/// True if a connection-level error (before any `tonic::Status` exists, e.g.
/// a failed `connect()`) looks transient.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    if let Some(status) = err.downcast_ref::<tonic::Status>() {
        return is_transient_status(status.code());
    }

    let msg = err.to_string().to_lowercase();
    msg.contains("connection refused")
        || msg.contains("connection reset")
        || msg.contains("timed out")
        || msg.contains("timeout")
        || msg.contains("broken pipe")
        || msg.contains("network is unreachable")
        || msg.contains("temporary failure")
        || msg.contains("service unavailable")
        || msg.contains("internal server error")
        || msg.contains("bad gateway")
        || msg.contains("gateway timeout")
}

fn strip_scheme(address: &str) -> &str {
    address
        .strip_prefix("https://")
        .or_else(|| address.strip_prefix("http://"))
        .unwrap_or(address)
}

/// Quick pre-call reachability check: can we open a TCP socket to the target
/// before paying for a full channel handshake and descriptor load?
pub async fn probe_reachable(address: &str, timeout: Duration) -> bool {
    let host_port = strip_scheme(address).to_string();
    let addr = match tokio::task::spawn_blocking(move || {
        host_port.to_socket_addrs().ok().and_then(|mut it| it.next())
    })
    .await
    {
        Ok(Some(addr)) => addr,
        _ => return false,
    };

    tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
struct AddressState {
    consecutive_failures: u32,
    window_start: Instant,
    opened_at: Option<Instant>,
}

/// Per-address circuit breaker. Opens after `failure_threshold` consecutive
/// failures observed inside `window`; a single success, or the window
/// elapsing while open, resets it.
pub struct CircuitBreaker {
    failure_threshold: u32,
    window: Duration,
    state: Mutex<HashMap<String, AddressState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, window: Duration) -> Self {
        Self {
            failure_threshold,
            window,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_policy() -> Self {
        Self::new(5, Duration::from_secs(300))
    }

    /// True if calls to `address` should currently be short-circuited.
    pub fn is_open(&self, address: &str) -> bool {
        let mut map = self.state.lock().unwrap();
        let Some(entry) = map.get_mut(address) else {
            return false;
        };
        let Some(opened_at) = entry.opened_at else {
            return false;
        };

        if opened_at.elapsed() >= self.window {
            entry.opened_at = None;
            entry.consecutive_failures = 0;
            false
        } else {
            true
        }
    }

    pub fn record_success(&self, address: &str) {
        self.state.lock().unwrap().remove(address);
    }

    pub fn record_failure(&self, address: &str) {
        let mut map = self.state.lock().unwrap();
        let now = Instant::now();
        let entry = map.entry(address.to_string()).or_insert_with(|| AddressState {
            consecutive_failures: 0,
            window_start: now,
            opened_at: None,
        });

        if now.duration_since(entry.window_start) > self.window {
            entry.consecutive_failures = 0;
            entry.window_start = now;
            entry.opened_at = None;
        }

        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.failure_threshold {
            entry.opened_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_status_codes() {
        assert!(is_transient_status(Code::Unavailable));
        assert!(is_transient_status(Code::DeadlineExceeded));
        assert!(is_transient_status(Code::ResourceExhausted));
        assert!(is_transient_status(Code::Internal));
        assert!(!is_transient_status(Code::Aborted));
        assert!(!is_transient_status(Code::InvalidArgument));
        assert!(!is_transient_status(Code::NotFound));
    }

    #[test]
    fn transient_error_messages() {
        let err = anyhow::anyhow!("connection refused (os error 111)");
        assert!(is_transient_error(&err));
        let err = anyhow::anyhow!("invalid argument: bad field");
        assert!(!is_transient_error(&err));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = RetryConfig::new(5, 1.0);
        assert_eq!(cfg.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(cfg.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(cfg.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(cfg.delay_for_attempt(10), cfg.max_delay);
    }

    #[test]
    fn disabled_retry_means_one_attempt() {
        let cfg = RetryConfig::disabled();
        assert_eq!(cfg.max_attempts, 1);
    }

    #[test]
    fn circuit_breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(!breaker.is_open("svc:1"));
        breaker.record_failure("svc:1");
        breaker.record_failure("svc:1");
        assert!(!breaker.is_open("svc:1"));
        breaker.record_failure("svc:1");
        assert!(breaker.is_open("svc:1"));
    }

    #[test]
    fn circuit_breaker_resets_on_success() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure("svc:2");
        breaker.record_failure("svc:2");
        assert!(breaker.is_open("svc:2"));
        breaker.record_success("svc:2");
        assert!(!breaker.is_open("svc:2"));
    }
}
