//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management,
//! handling connection setup, authentication, and the NETCONF
//! subsystem channel.

pub mod config;
mod ssh;

pub use config::{AuthOptions, ConnectSettings, SshConfig};
pub use ssh::SshTransport;
