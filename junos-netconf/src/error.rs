//! Error types for junos-netconf.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for junos-netconf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// NETCONF protocol errors
    #[error("NETCONF error: {0}")]
    Netconf(#[from] NetconfError),

    /// Session-level errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Client-level errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Transport layer errors (TCP dial, SSH handshake, authentication).
///
/// These are the retryable class: the connection establisher retries them
/// up to the configured budget before giving up.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}' on {host}")]
    AuthenticationFailed { host: String, user: String },

    /// No usable credential source was configured
    #[error("No authentication method available for user '{user}'")]
    NoAuthMethod { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection was closed unexpectedly
    #[error("Connection to {host} disconnected")]
    Disconnected { host: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// NETCONF protocol errors (framing, reply decoding, device diagnostics).
#[derive(Error, Debug)]
pub enum NetconfError {
    /// The device reported one or more RPC diagnostics of severity "error".
    ///
    /// Warnings never produce this variant; they are collected and returned
    /// alongside success.
    #[error("RPC '{operation}' failed on device: {message}")]
    Rpc { operation: String, message: String },

    /// Reply could not be decoded; carries the raw payload for diagnosis.
    #[error("Malformed reply to '{operation}': {message}\nraw reply: {raw}")]
    MalformedReply {
        operation: String,
        message: String,
        raw: String,
    },

    /// The device answered but gave no usable output where content was
    /// expected (typically a mistyped operational command).
    #[error("No output for command '{command}' - check the command syntax")]
    EmptyOutput { command: String },

    /// The hello exchange with the device failed
    #[error("NETCONF hello exchange failed: {message}")]
    Hello { message: String },
}

/// Session layer errors (establishment, locking, transaction discipline).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Connection retry budget exhausted
    #[error("Giving up connecting to {host} after {attempts} attempts: {source}")]
    RetriesExhausted {
        host: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The caller's cancellation signal fired before the candidate lock
    /// could be acquired. The device-side lock state is untouched.
    #[error("Candidate lock attempt on {host} aborted by caller")]
    LockAborted { host: String },

    /// Connection establishment was aborted by the caller's cancellation
    /// signal before the retry budget was spent.
    #[error("Connection to {host} aborted by caller: {source}")]
    ConnectAborted {
        host: String,
        #[source]
        source: Box<Error>,
    },

    /// The device answered the handshake but reported no hardware model,
    /// so no compatibility decision can be made.
    #[error("Device {host} returned no hardware model - incompatible or unreachable platform")]
    Incompatible { host: String },

    /// Session not connected
    #[error("Session to {host} is closed")]
    Closed { host: String },
}

/// Client layer errors (configuration policy, calling discipline, fake mode).
#[derive(Error, Debug)]
pub enum ClientError {
    /// Config apply was called with neither a live session nor a fake-mode
    /// capture path. This is a calling-contract violation, not a device or
    /// network condition.
    #[error("internal error: config apply without live session or capture file")]
    NoConfigSink,

    /// A policy value is outside its valid range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Writing to the fake-mode capture file failed
    #[error("Capture file {path}: {source}")]
    CaptureFile {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Operation requires an open session
    #[error("Client is not connected - call open() first")]
    NotConnected,
}

/// Result type alias using junos-netconf's Error.
pub type Result<T> = std::result::Result<T, Error>;
