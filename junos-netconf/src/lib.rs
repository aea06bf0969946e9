//! # junos-netconf
//!
//! Transactional NETCONF-over-SSH configuration client for Junos devices.
//!
//! The crate drives the full candidate-configuration protocol against one
//! device: connect with bounded retry, lock the candidate, load `set`/
//! `delete` lines, commit (plain or confirmed with the device's automatic
//! rollback window), and always clear + unlock on the way out, including
//! every error path.
//!
//! ## Features
//!
//! - Async SSH transport via russh, NETCONF subsystem framing
//! - Merged credential sources: password, PEM key, key file, SSH agent
//! - Candidate lock acquisition with contention polling and cancellation
//! - Confirmed commits: the device reverts on its own if the finalizing
//!   commit never arrives
//! - Process-wide transaction gate serializing independent clients
//! - Fake mode: capture generated configuration lines to a local file
//!   without touching a device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use junos_netconf::{CancelToken, Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), junos_netconf::Error> {
//!     let mut config = ClientConfig::new("fw0.example.net");
//!     config.connect.username = "automation".to_string();
//!     config.connect.auth.use_agent = true;
//!
//!     let mut client = Client::new(config)?;
//!     let mut cancel = CancelToken::never();
//!     client.open(&mut cancel).await?;
//!
//!     client.config_lock(&mut cancel).await?;
//!     let result = async {
//!         client
//!             .config_set(&["set system host-name fw0".to_string()])
//!             .await?;
//!         client.commit("update host name").await
//!     }
//!     .await;
//!
//!     // Clear + unlock runs on success and failure alike.
//!     for failure in client.config_clear().await {
//!         eprintln!("cleanup: {failure}");
//!     }
//!     client.close().await?;
//!
//!     result.map(|_warnings| ())
//! }
//! ```
//!
//! ## Security note
//!
//! SSH host keys are **not** verified (any server key is accepted), matching
//! the management-network tooling this crate replaces. See
//! [`transport::SshConfig`] before deploying outside a trusted network.

pub mod cancel;
pub mod client;
pub mod device;
pub mod error;
pub mod gate;
pub mod logger;
pub mod netconf;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use client::{Client, ClientConfig, ClientSettings};
pub use device::DeviceFacts;
pub use error::Error;
pub use gate::{CandidateGate, CandidateGuard};
pub use logger::TraceLog;
pub use session::{CommitPolicy, Session, SessionTuning};
pub use transport::{AuthOptions, SshConfig};
