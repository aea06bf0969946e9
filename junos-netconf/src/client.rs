//! Transaction engine above one device session.
//!
//! The [`Client`] owns connection parameters and policy, drives the full
//! apply protocol (lock -> set -> commit -> clear/unlock -> close), and
//! holds the process-wide candidate gate for the whole transaction span.
//! With no live session and a configured capture file it degrades to fake
//! mode: configuration lines are appended to the file instead of being sent
//! to a device.

use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::device::DeviceFacts;
use crate::error::{ClientError, Error, Result};
use crate::gate::{CandidateGate, CandidateGuard};
use crate::logger::TraceLog;
use crate::session::{CommitPolicy, Session, SessionTuning, establish};
use crate::transport::{ConnectSettings, SshConfig};

/// Directory permission for capture-file parents.
const CAPTURE_DIR_MODE: u32 = 0o755;

/// Default permission for the capture file itself.
const DEFAULT_CAPTURE_FILE_MODE: u32 = 0o644;

/// Everything a [`Client`] needs: connection parameters plus policy.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport parameters.
    pub connect: SshConfig,

    /// Sleep tunables copied into the session.
    pub tuning: SessionTuning,

    /// Confirmed-commit policy.
    pub commit: CommitPolicy,

    /// Fake-mode capture file; config lines are appended here when no live
    /// session exists.
    pub capture_file: Option<PathBuf>,

    /// Permission bits for a freshly created capture file.
    pub capture_file_mode: u32,

    /// Optional RPC trace file.
    pub trace_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Configuration for the given host with defaults everywhere else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            connect: SshConfig::new(host),
            tuning: SessionTuning::default(),
            commit: CommitPolicy::default(),
            capture_file: None,
            capture_file_mode: DEFAULT_CAPTURE_FILE_MODE,
            trace_file: None,
        }
    }
}

/// External-facing settings shape for the CLI/provider configuration layer.
///
/// Mirrors [`ClientConfig`] with plain serde-friendly fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    #[serde(flatten)]
    pub connect: ConnectSettings,

    pub sleep_short_ms: Option<u64>,
    pub sleep_lock_secs: Option<u64>,
    pub sleep_ssh_closed_secs: Option<u64>,

    pub commit_confirm_timeout_secs: Option<u16>,
    pub commit_confirm_wait_percent: Option<u8>,

    pub capture_file: Option<PathBuf>,
    pub capture_file_mode: Option<u32>,

    /// Whether resource updates should also be captured in fake mode.
    /// Interpreted by the resource lifecycle layer, passed through here.
    pub capture_update: bool,

    /// Whether resource deletions should also be captured in fake mode.
    /// Interpreted by the resource lifecycle layer, passed through here.
    pub capture_delete: bool,

    pub trace_file: Option<PathBuf>,
}

impl From<ClientSettings> for ClientConfig {
    fn from(s: ClientSettings) -> Self {
        let mut config = ClientConfig::new(String::new());
        config.connect = SshConfig::from(s.connect);

        let tuning = &mut config.tuning;
        if let Some(ms) = s.sleep_short_ms {
            tuning.sleep_short = std::time::Duration::from_millis(ms);
        }
        if let Some(secs) = s.sleep_lock_secs {
            tuning.sleep_lock = std::time::Duration::from_secs(secs);
        }
        if let Some(secs) = s.sleep_ssh_closed_secs {
            tuning.sleep_ssh_closed = std::time::Duration::from_secs(secs);
        }

        if let Some(secs) = s.commit_confirm_timeout_secs {
            config.commit.confirm_timeout_secs = secs;
        }
        if let Some(percent) = s.commit_confirm_wait_percent {
            config.commit.confirm_wait_percent = percent;
        }

        config.capture_file = s.capture_file;
        if let Some(mode) = s.capture_file_mode {
            config.capture_file_mode = mode;
        }
        config.trace_file = s.trace_file;
        config
    }
}

/// Transactional configuration client for one Junos device.
///
/// Manages at most one live [`Session`]. All transaction entry points are
/// `&mut self`: one configuration transaction at a time per client, and the
/// candidate gate extends that exclusion process-wide.
pub struct Client {
    config: ClientConfig,
    trace: Option<TraceLog>,
    session: Option<Session>,
    gate: CandidateGate,
    gate_guard: Option<CandidateGuard>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("trace", &self.trace)
            .field("session_open", &self.session.is_some())
            .field("gate", &self.gate)
            .field("gate_guard", &self.gate_guard)
            .finish()
    }
}

impl Client {
    /// Build a client, validating policy values.
    ///
    /// Uses the process-wide [`CandidateGate::global`]; see
    /// [`with_gate`](Self::with_gate) for a narrower scope.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config
            .commit
            .validate()
            .map_err(|message| ClientError::InvalidConfig { message })?;

        let trace = config.trace_file.as_ref().map(TraceLog::new);

        Ok(Self {
            config,
            trace,
            session: None,
            gate: CandidateGate::global(),
            gate_guard: None,
        })
    }

    /// Replace the candidate gate, e.g. with a per-device instance.
    pub fn with_gate(mut self, gate: CandidateGate) -> Self {
        self.gate = gate;
        self
    }

    /// Whether a live session exists.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Facts of the connected device.
    pub fn facts(&self) -> Option<&DeviceFacts> {
        self.session.as_ref().map(Session::facts)
    }

    /// Establish the session and gather device facts.
    ///
    /// A device that answers but reports no hardware model is closed again
    /// and the incompatibility error returned.
    pub async fn open(&mut self, cancel: &mut CancelToken) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut session = establish(
            &self.config.connect,
            self.config.tuning.clone(),
            self.trace.clone(),
            cancel,
        )
        .await?;

        if let Err(e) = session.gather_facts().await {
            warn!(
                "closing unusable session to {}: {}",
                self.config.connect.host, e
            );
            if let Err(close_err) = session.close().await {
                warn!("close after failed fact gather: {}", close_err);
            }
            return Err(e);
        }

        self.session = Some(session);
        Ok(())
    }

    /// Run an operational command; requires an open session.
    pub async fn command(&mut self, command: &str) -> Result<String> {
        self.live_session()?.command(command).await
    }

    /// Run a raw XML RPC; requires an open session.
    pub async fn command_xml(&mut self, rpc: &str) -> Result<String> {
        self.live_session()?.command_xml(rpc).await
    }

    /// Begin a configuration transaction: acquire the process-wide gate,
    /// then the device's candidate lock.
    ///
    /// The gate guard is held until [`config_clear`](Self::config_clear).
    /// In fake mode (no session, capture file configured) there is nothing
    /// to lock and this is a no-op.
    pub async fn config_lock(&mut self, cancel: &mut CancelToken) -> Result<()> {
        if self.session.is_none() {
            if self.config.capture_file.is_some() {
                debug!("fake mode: skipping candidate lock");
                return Ok(());
            }
            return Err(ClientError::NotConnected.into());
        }

        let guard = self.gate.acquire().await;

        let session = self.live_session()?;
        match session.lock_candidate(cancel).await {
            Ok(()) => {
                self.gate_guard = Some(guard);
                Ok(())
            }
            Err(e) => {
                // Gate released by drop; the device was never locked.
                drop(guard);
                Err(e)
            }
        }
    }

    /// Apply an ordered batch of set/delete lines.
    ///
    /// Live session: one `load-configuration` RPC, returning the device's
    /// message when it rejected lines. Fake mode: lines are appended to the
    /// capture file. Neither configured is a calling-contract violation.
    pub async fn config_set(&mut self, lines: &[String]) -> Result<Option<String>> {
        if let Some(session) = self.session.as_mut() {
            return session.load_set(lines).await;
        }

        match self.config.capture_file.clone() {
            Some(path) => {
                self.append_capture(&path, lines)?;
                Ok(None)
            }
            None => Err(ClientError::NoConfigSink.into()),
        }
    }

    /// Commit the candidate per the configured policy.
    ///
    /// Returns advisory warnings. A no-op in fake mode.
    pub async fn commit(&mut self, log_message: &str) -> Result<Vec<String>> {
        if self.session.is_none() {
            if self.config.capture_file.is_some() {
                debug!("fake mode: skipping commit");
                return Ok(Vec::new());
            }
            return Err(ClientError::NotConnected.into());
        }

        let policy = self.config.commit.clone();
        self.live_session()?.commit(log_message, &policy).await
    }

    /// End the transaction: delete the candidate, unlock, release the gate.
    ///
    /// Called on every exit from a locked transaction, success or failure.
    /// Both device RPCs are attempted and all distinct failures returned.
    pub async fn config_clear(&mut self) -> Vec<Error> {
        let failures = match self.session.as_mut() {
            Some(session) => session.clear_candidate().await,
            None => Vec::new(),
        };

        self.gate_guard = None;
        failures
    }

    /// Close the session, if any.
    pub async fn close(&mut self) -> Result<()> {
        if self.gate_guard.take().is_some() {
            warn!("closing with the candidate gate still held; releasing it");
        }

        match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    fn live_session(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| ClientError::NotConnected.into())
    }

    /// Fake-mode sink: append each line to the capture file, creating the
    /// parent directory as needed.
    fn append_capture(&self, path: &Path, lines: &[String]) -> Result<()> {
        debug!(
            "fake mode: appending {} lines to {}",
            lines.len(),
            path.display()
        );

        let io_err = |source: std::io::Error| ClientError::CaptureFile {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                DirBuilder::new()
                    .recursive(true)
                    .mode(CAPTURE_DIR_MODE)
                    .create(parent)
                    .map_err(io_err)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(self.config.capture_file_mode)
            .open(path)
            .map_err(io_err)?;

        for line in lines {
            file.write_all(line.as_bytes()).map_err(io_err)?;
            file.write_all(b"\n").map_err(io_err)?;
        }

        if let Some(trace) = &self.trace {
            trace.record(&format!(
                "fake mode: {} lines appended to {}",
                lines.len(),
                path.display()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_client(capture: Option<PathBuf>) -> Client {
        let mut config = ClientConfig::new("192.0.2.1");
        config.capture_file = capture;
        Client::new(config).unwrap()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fake_mode_writes_one_line_per_config_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.conf");
        let mut client = fake_client(Some(path.clone()));

        client
            .config_set(&lines(&["set foo", "set bar"]))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "set foo\nset bar\n"
        );

        client.config_set(&lines(&["set baz"])).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "set foo\nset bar\nset baz\n"
        );
    }

    #[tokio::test]
    async fn test_fake_mode_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/capture.conf");
        let mut client = fake_client(Some(path.clone()));

        client.config_set(&lines(&["set foo"])).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "set foo\n");
    }

    #[tokio::test]
    async fn test_config_set_without_any_sink_is_internal_error() {
        let mut client = fake_client(None);
        let err = client.config_set(&lines(&["set foo"])).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Client(ClientError::NoConfigSink)
        ));
        assert!(err.to_string().contains("internal error"));
    }

    #[tokio::test]
    async fn test_fake_mode_lock_commit_clear_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.conf");
        let mut client = fake_client(Some(path));

        let mut cancel = CancelToken::never();
        client.config_lock(&mut cancel).await.unwrap();
        assert!(client.commit("noop").await.unwrap().is_empty());
        assert!(client.config_clear().await.is_empty());
    }

    #[tokio::test]
    async fn test_lock_without_session_or_capture_requires_connection() {
        let mut client = fake_client(None);
        let mut cancel = CancelToken::never();
        let err = client.config_lock(&mut cancel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Client(ClientError::NotConnected)
        ));
    }

    #[test]
    fn test_new_rejects_invalid_commit_policy() {
        let mut config = ClientConfig::new("192.0.2.1");
        config.commit.confirm_wait_percent = 100;
        let err = Client::new(config).unwrap_err();
        assert!(matches!(
            err,
            Error::Client(ClientError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_settings_map_onto_config() {
        let settings = ClientSettings {
            sleep_lock_secs: Some(2),
            commit_confirm_timeout_secs: Some(120),
            capture_file: Some(PathBuf::from("/tmp/capture.conf")),
            ..Default::default()
        };
        let config = ClientConfig::from(settings);
        assert_eq!(config.tuning.sleep_lock, std::time::Duration::from_secs(2));
        assert_eq!(config.commit.confirm_timeout_secs, 120);
        assert_eq!(
            config.capture_file.as_deref(),
            Some(Path::new("/tmp/capture.conf"))
        );
        assert_eq!(config.capture_file_mode, 0o644);
    }
}
