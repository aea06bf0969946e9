//! Candidate-configuration transaction operations.
//!
//! Protocol: lock -> load set/delete lines -> commit -> clear + unlock.
//! The clear + unlock pair runs on every exit from a locked transaction,
//! success or failure, and both RPCs are attempted even when the first
//! fails so the device ends up unlocked whenever possible.

use log::{debug, warn};

use super::{CommitPolicy, Session};
use crate::cancel::CancelToken;
use crate::error::{ClientError, Error, Result, SessionError};
use crate::netconf::escape_text;

const LOCK_RPC: &str = "<lock><target><candidate/></target></lock>";
const UNLOCK_RPC: &str = "<unlock><target><candidate/></target></unlock>";
const DELETE_CANDIDATE_RPC: &str =
    "<delete-config><target><candidate/></target></delete-config>";

impl Session {
    /// Acquire the candidate-configuration lock, polling through contention.
    ///
    /// A refused lock (another session holds it) is not an error: the loop
    /// sleeps the lock-poll interval and tries again until either the lock
    /// RPC succeeds or `cancel` fires, which abandons the attempt with
    /// [`SessionError::LockAborted`]. The device-side lock state is
    /// untouched on abort since this side never acquired it.
    pub async fn lock_candidate(&mut self, cancel: &mut CancelToken) -> Result<()> {
        let poll = self.tuning().sleep_lock;
        let host = self.host().to_string();

        let acquired = poll_candidate_lock(
            async || {
                let reply = self.netconf().execute("lock-configuration", LOCK_RPC).await?;
                if reply.has_errors() {
                    debug!("candidate on {} is locked elsewhere, waiting", host);
                    Ok(false)
                } else {
                    Ok(true)
                }
            },
            poll,
            cancel,
        )
        .await?;

        match acquired {
            Some(attempts) => {
                debug!(
                    "candidate lock acquired on {} (attempt {})",
                    self.host(),
                    attempts
                );
                self.trace("candidate lock acquired");
                self.settle().await;
                Ok(())
            }
            None => Err(self.lock_aborted()),
        }
    }

    /// Load an ordered batch of `set`/`delete` lines into the candidate.
    ///
    /// All lines travel newline-joined in a single
    /// `<load-configuration action="set">` RPC, so the device applies them
    /// in submission order. Device-reported diagnostics do not fail the
    /// call: a line can be individually rejected without aborting the rest
    /// of the batch, so the device's message is returned for the caller to
    /// surface and the candidate left for inspection.
    pub async fn load_set(&mut self, lines: &[String]) -> Result<Option<String>> {
        if lines.is_empty() {
            return Ok(None);
        }

        debug!("loading {} config lines on {}", lines.len(), self.host());
        for line in lines {
            self.trace(&format!("config: {}", line));
        }

        let joined = lines
            .iter()
            .map(|line| escape_text(line))
            .collect::<Vec<_>>()
            .join("\n");
        let body = format!(
            "<load-configuration action=\"set\" format=\"text\">\
             <configuration-set>{}</configuration-set>\
             </load-configuration>",
            joined
        );

        let reply = self.netconf().execute("load-configuration", &body).await?;
        let message = reply
            .diagnostics
            .iter()
            .map(|d| d.render())
            .collect::<Vec<_>>()
            .join("; ");

        self.settle().await;

        if message.is_empty() {
            Ok(None)
        } else {
            warn!("load-configuration on {}: {}", self.host(), message);
            Ok(Some(message))
        }
    }

    /// Commit the candidate configuration.
    ///
    /// With a disabled policy this is one plain commit. With a confirmed
    /// policy the sequence is: confirmed commit carrying the device-side
    /// revert timeout, an idle wait of `floor(timeout * percent / 100)`
    /// seconds, then a plain finalizing commit. If the finalize cannot be
    /// delivered, the device's own timer reverts the configuration; nothing
    /// here races or suppresses that timer.
    ///
    /// Returns the advisory warnings from all commit RPCs involved.
    pub async fn commit(
        &mut self,
        log_message: &str,
        policy: &CommitPolicy,
    ) -> Result<Vec<String>> {
        policy
            .validate()
            .map_err(|message| ClientError::InvalidConfig { message })?;

        if !policy.confirmed() {
            return self.commit_rpc(log_message, None).await;
        }

        let mut warnings = self
            .commit_rpc(log_message, Some(policy.confirm_timeout_secs))
            .await?;

        let wait = policy.confirm_wait();
        debug!(
            "confirmed commit on {} active, finalizing in {:?}",
            self.host(),
            wait
        );
        self.trace(&format!(
            "confirmed commit accepted, finalize in {}s",
            wait.as_secs()
        ));
        tokio::time::sleep(wait).await;

        // Finalize is a plain commit; the confirmed-commit window it closes
        // was opened by the RPC above. Its diagnostics are classified the
        // same way. (Behavior on finalize-time device errors is assumed
        // equivalent to a plain commit failure; verify against real
        // devices.)
        warnings.extend(self.commit_rpc(log_message, None).await?);
        Ok(warnings)
    }

    /// Delete the candidate configuration and release the lock.
    ///
    /// Both RPCs are always attempted; every distinct failure is collected
    /// rather than short-circuiting, maximizing the chance the device ends
    /// up unlocked.
    pub async fn clear_candidate(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();

        match self
            .netconf()
            .execute("delete-candidate-configuration", DELETE_CANDIDATE_RPC)
            .await
        {
            Ok(reply) => {
                if let Err(e) = reply.check("delete-candidate-configuration") {
                    failures.push(e);
                }
            }
            Err(e) => failures.push(e),
        }

        match self.netconf().execute("unlock-configuration", UNLOCK_RPC).await {
            Ok(reply) => {
                if let Err(e) = reply.check("unlock-configuration") {
                    failures.push(e);
                }
            }
            Err(e) => failures.push(e),
        }

        if failures.is_empty() {
            debug!("candidate cleared and unlocked on {}", self.host());
            self.trace("candidate cleared and unlocked");
        } else {
            warn!(
                "clear/unlock on {} reported {} failure(s)",
                self.host(),
                failures.len()
            );
            self.trace(&format!(
                "candidate clear/unlock failures: {}",
                failures.len()
            ));
        }

        self.settle().await;
        failures
    }

    async fn commit_rpc(
        &mut self,
        log_message: &str,
        confirm_timeout_secs: Option<u16>,
    ) -> Result<Vec<String>> {
        let confirm = match confirm_timeout_secs {
            Some(secs) => format!("<confirmed/><confirm-timeout>{}</confirm-timeout>", secs),
            None => String::new(),
        };
        let body = format!(
            "<commit-configuration>{}<log>{}</log></commit-configuration>",
            confirm,
            escape_text(log_message)
        );

        let operation = if confirm_timeout_secs.is_some() {
            "commit-configuration confirmed"
        } else {
            "commit-configuration"
        };
        self.trace(operation);

        let reply = self.netconf().execute(operation, &body).await?;
        let warnings = reply.check(operation)?;
        for warning in &warnings {
            warn!("{} on {}: {}", operation, self.host(), warning);
        }
        Ok(warnings)
    }

    fn lock_aborted(&self) -> Error {
        self.trace("candidate lock attempt aborted");
        SessionError::LockAborted {
            host: self.host().to_string(),
        }
        .into()
    }

    async fn settle(&self) {
        let pause = self.tuning().sleep_short;
        if pause > std::time::Duration::ZERO {
            tokio::time::sleep(pause).await;
        }
    }
}

/// Drive `try_lock` until it reports the lock acquired, sleeping `poll`
/// between refused attempts.
///
/// Returns `Ok(Some(attempts))` on acquisition, `Ok(None)` when `cancel`
/// fired first (in which case no further lock attempts are made), and
/// propagates transport errors from `try_lock` immediately.
async fn poll_candidate_lock<F>(
    mut try_lock: F,
    poll: std::time::Duration,
    cancel: &mut CancelToken,
) -> Result<Option<u32>>
where
    F: AsyncFnMut() -> Result<bool>,
{
    let mut attempts = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        attempts += 1;
        if try_lock().await? {
            return Ok(Some(attempts));
        }

        if !cancel.sleep(poll).await {
            return Ok(None);
        }
    }
}
