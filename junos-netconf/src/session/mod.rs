//! Device session: one NETCONF transport plus facts and policy.
//!
//! A [`Session`] is created by the connection establisher, gathers device
//! facts immediately after the hello exchange, and exposes the operational
//! and transactional command surface. It owns its transport exclusively;
//! callers serialize access (see [`CandidateGate`](crate::CandidateGate)).

mod command;
mod config;
mod establish;

pub use establish::establish;

use std::time::Duration;

use log::debug;

use crate::device::{DeviceFacts, ReplyShape, SystemInformationReply};
use crate::error::{Result, SessionError};
use crate::logger::TraceLog;
use crate::netconf::NetconfSession;

/// Sleep intervals copied from the client at session creation.
#[derive(Debug, Clone)]
pub struct SessionTuning {
    /// Settle pause after lock acquisition and candidate operations.
    pub sleep_short: Duration,

    /// Poll interval while waiting out candidate-lock contention.
    pub sleep_lock: Duration,

    /// Pause after closing the SSH transport, for devices that refuse a
    /// reconnect while the previous session lingers in teardown.
    pub sleep_ssh_closed: Duration,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            sleep_short: Duration::from_millis(100),
            sleep_lock: Duration::from_secs(10),
            sleep_ssh_closed: Duration::ZERO,
        }
    }
}

/// Confirmed-commit policy.
///
/// With a non-zero timeout, commits are issued as confirmed commits: the
/// device reverts on its own unless a finalizing commit lands inside the
/// window. See [`Session::commit`].
#[derive(Debug, Clone)]
pub struct CommitPolicy {
    /// Device-side revert timeout in seconds; 0 disables confirmed commits.
    pub confirm_timeout_secs: u16,

    /// Percentage of the timeout to wait before the finalizing commit
    /// (0-99, default 90). Deliberately below 100 so the finalize always
    /// races ahead of the device's revert timer.
    pub confirm_wait_percent: u8,
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: 0,
            confirm_wait_percent: 90,
        }
    }
}

impl CommitPolicy {
    /// Whether commits run in confirmed mode.
    pub fn confirmed(&self) -> bool {
        self.confirm_timeout_secs > 0
    }

    /// Check the wait percentage range.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.confirm_wait_percent > 99 {
            return Err(format!(
                "commit confirm wait percent must be 0-99, got {}",
                self.confirm_wait_percent
            ));
        }
        Ok(())
    }

    /// Idle time before the finalizing commit: `floor(timeout * percent / 100)`.
    pub fn confirm_wait(&self) -> Duration {
        let secs =
            u64::from(self.confirm_timeout_secs) * u64::from(self.confirm_wait_percent) / 100;
        Duration::from_secs(secs)
    }
}

/// An authenticated NETCONF session to one Junos device.
pub struct Session {
    netconf: NetconfSession,
    facts: DeviceFacts,
    tuning: SessionTuning,
    trace: Option<TraceLog>,
}

impl Session {
    pub(crate) fn new(
        netconf: NetconfSession,
        tuning: SessionTuning,
        trace: Option<TraceLog>,
    ) -> Self {
        Self {
            netconf,
            facts: DeviceFacts::default(),
            tuning,
            trace,
        }
    }

    /// Device facts gathered at session establishment.
    pub fn facts(&self) -> &DeviceFacts {
        &self.facts
    }

    /// Host this session is connected to.
    pub fn host(&self) -> &str {
        self.netconf.host()
    }

    /// Capabilities the device advertised at hello time.
    pub fn capabilities(&self) -> &[String] {
        self.netconf.capabilities()
    }

    /// Fetch and store the device-facts snapshot.
    ///
    /// A device that answers the handshake but reports no hardware model
    /// cannot be classified, and nothing meaningful can be configured on it:
    /// the facts are recorded as-is and an incompatibility error is
    /// returned. The caller keeps the live session and decides whether to
    /// close it.
    pub async fn gather_facts(&mut self) -> Result<()> {
        let reply: SystemInformationReply = self.fetch().await?;
        self.facts = DeviceFacts::from(reply.system_information);

        if self.facts.hardware_model.is_empty() {
            return Err(SessionError::Incompatible {
                host: self.host().to_string(),
            }
            .into());
        }

        debug!("facts for {}: {}", self.host(), self.facts.summary());
        self.trace(&format!("facts gathered: {}", self.facts.summary()));
        Ok(())
    }

    /// Send `<close-session/>` and tear down the transport, then observe the
    /// post-close settle interval.
    pub async fn close(self) -> Result<()> {
        let host = self.host().to_string();
        self.trace("session close");

        let result = self.netconf.close().await;
        if self.tuning.sleep_ssh_closed > Duration::ZERO {
            tokio::time::sleep(self.tuning.sleep_ssh_closed).await;
        }

        debug!("session to {} closed", host);
        result
    }

    pub(crate) async fn fetch<T: ReplyShape>(&mut self) -> Result<T> {
        let reply = self.netconf.execute(T::OPERATION, T::RPC).await?;
        reply.check(T::OPERATION)?;
        crate::device::decode_reply(&reply.raw)
    }

    pub(crate) fn netconf(&mut self) -> &mut NetconfSession {
        &mut self.netconf
    }

    pub(crate) fn tuning(&self) -> &SessionTuning {
        &self.tuning
    }

    pub(crate) fn trace(&self, event: &str) {
        if let Some(trace) = &self.trace {
            trace.record(&format!("[{}] {}", self.host(), event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_policy_disabled_by_default() {
        let policy = CommitPolicy::default();
        assert!(!policy.confirmed());
        assert_eq!(policy.confirm_wait_percent, 90);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_confirm_wait_is_floor_of_fraction() {
        let policy = CommitPolicy {
            confirm_timeout_secs: 60,
            confirm_wait_percent: 90,
        };
        assert_eq!(policy.confirm_wait(), Duration::from_secs(54));

        // 7 * 33 / 100 = 2.31 -> floor to 2
        let policy = CommitPolicy {
            confirm_timeout_secs: 7,
            confirm_wait_percent: 33,
        };
        assert_eq!(policy.confirm_wait(), Duration::from_secs(2));

        // Zero percent waits not at all but still finalizes
        let policy = CommitPolicy {
            confirm_timeout_secs: 300,
            confirm_wait_percent: 0,
        };
        assert_eq!(policy.confirm_wait(), Duration::ZERO);
    }

    #[test]
    fn test_confirm_wait_max_range_does_not_overflow() {
        let policy = CommitPolicy {
            confirm_timeout_secs: u16::MAX,
            confirm_wait_percent: 99,
        };
        assert_eq!(policy.confirm_wait(), Duration::from_secs(64879));
    }

    #[test]
    fn test_policy_validation_rejects_percent_over_99() {
        let policy = CommitPolicy {
            confirm_timeout_secs: 10,
            confirm_wait_percent: 100,
        };
        assert!(policy.validate().is_err());
    }
}
