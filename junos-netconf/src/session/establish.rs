//! Connection establishment with bounded retry.
//!
//! Each attempt is a full dial + SSH handshake + NETCONF hello; a failed
//! attempt tears the raw connection down before the next one. Backoff grows
//! by one second per failure (1 s, 2 s, ...), and the caller's cancellation
//! token is consulted between attempts only; a connect already in flight is
//! never interrupted.

use std::time::Duration;

use log::{debug, warn};

use super::{Session, SessionTuning};
use crate::cancel::CancelToken;
use crate::error::{Result, SessionError};
use crate::logger::TraceLog;
use crate::netconf::NetconfSession;
use crate::transport::{SshConfig, SshTransport};

/// Connection attempt budget bounds.
const MIN_RETRIES: u32 = 1;
const MAX_RETRIES: u32 = 10;

/// Clamp the configured retry count to the supported budget.
pub(crate) fn clamp_retries(retries: u32) -> u32 {
    retries.clamp(MIN_RETRIES, MAX_RETRIES)
}

/// Backoff slept after the given 1-based failed attempt.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt))
}

/// Establish a NETCONF session, retrying transport and handshake failures
/// up to the configured budget.
///
/// The returned session has not gathered device facts yet; callers run
/// [`Session::gather_facts`] next and own the close decision if the device
/// turns out to be incompatible.
pub async fn establish(
    config: &SshConfig,
    tuning: SessionTuning,
    trace: Option<TraceLog>,
    cancel: &mut CancelToken,
) -> Result<Session> {
    let attempts = clamp_retries(config.retries);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(
            "connecting to {} (attempt {}/{})",
            config.socket_addr(),
            attempt,
            attempts
        );

        let error = match connect_once(config).await {
            Ok(netconf) => {
                if let Some(trace) = &trace {
                    trace.record(&format!(
                        "connected to {} on attempt {}",
                        config.socket_addr(),
                        attempt
                    ));
                }
                return Ok(Session::new(netconf, tuning, trace));
            }
            Err(e) => e,
        };

        warn!("connect to {} failed: {}", config.socket_addr(), error);

        if cancel.is_cancelled() {
            return Err(SessionError::ConnectAborted {
                host: config.host.clone(),
                source: Box::new(error),
            }
            .into());
        }

        if attempt >= attempts {
            return Err(SessionError::RetriesExhausted {
                host: config.host.clone(),
                attempts,
                source: Box::new(error),
            }
            .into());
        }

        if !cancel.sleep(backoff_delay(attempt)).await {
            return Err(SessionError::ConnectAborted {
                host: config.host.clone(),
                source: Box::new(error),
            }
            .into());
        }
    }
}

/// One full dial + handshake attempt.
async fn connect_once(config: &SshConfig) -> Result<NetconfSession> {
    let transport = SshTransport::connect(config.clone()).await?;
    NetconfSession::open(transport).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_clamp() {
        assert_eq!(clamp_retries(0), 1);
        assert_eq!(clamp_retries(1), 1);
        assert_eq!(clamp_retries(3), 3);
        assert_eq!(clamp_retries(10), 10);
        assert_eq!(clamp_retries(250), 10);
    }

    #[test]
    fn test_backoff_grows_by_one_second() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(9), Duration::from_secs(9));
    }

    #[test]
    fn test_total_backoff_for_full_budget() {
        // R attempts sleep after every failure but the last:
        // 1 + 2 + ... + (R-1) seconds.
        for retries in 1..=10u32 {
            let total: Duration = (1..retries).map(backoff_delay).sum();
            assert_eq!(
                total,
                Duration::from_secs(u64::from(retries * (retries - 1) / 2))
            );
        }
    }
}
