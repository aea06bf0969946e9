//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Default NETCONF-over-SSH port.
pub const DEFAULT_PORT: u16 = 830;

/// Default management username.
pub const DEFAULT_USERNAME: &str = "netconf";

/// Default cipher allow-list offered to the device.
///
/// Embedded Junos platforms often run old SSH stacks; the list leads with
/// the CTR modes they all support.
pub const DEFAULT_CIPHERS: &[&str] = &[
    "aes128-ctr",
    "aes192-ctr",
    "aes256-ctr",
    "aes256-gcm@openssh.com",
    "chacha20-poly1305@openssh.com",
];

/// SSH connection configuration.
///
/// Immutable for the lifetime of a [`Client`](crate::Client); every value is
/// copied into the transport at connect time.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// NETCONF SSH port (default: 830).
    pub port: u16,

    /// Username for authentication (default: "netconf").
    pub username: String,

    /// Credential sources; see [`AuthOptions`].
    pub auth: AuthOptions,

    /// Cipher allow-list. Unrecognized names are skipped with a warning.
    pub ciphers: Vec<String>,

    /// TCP dial + SSH handshake timeout.
    pub timeout: Duration,

    /// Connection attempt budget, clamped to `1..=10` by the establisher.
    pub retries: u32,
}

impl SshConfig {
    /// Create a configuration for the given host with defaults everywhere
    /// else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            auth: AuthOptions::default(),
            ciphers: DEFAULT_CIPHERS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(30),
            retries: 1,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Credential sources for SSH authentication.
///
/// Unlike a single-method enum, every configured source contributes one
/// candidate and all candidates are offered to the server in order until one
/// is accepted: PEM key, key file, agent, password. Which candidate the
/// server accepts is a server-side detail; callers must not rely on the
/// ordering beyond "at least one is tried".
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Password for password authentication.
    pub password: Option<SecretString>,

    /// PEM-encoded private key material supplied in memory.
    pub pem_key: Option<SecretString>,

    /// Passphrase for `pem_key` if the key is encrypted.
    pub pem_passphrase: Option<SecretString>,

    /// Path to a private key file on disk.
    pub key_file: Option<PathBuf>,

    /// Passphrase for `key_file` if the key is encrypted.
    pub key_file_passphrase: Option<SecretString>,

    /// Try keys held by the ambient SSH agent (`SSH_AUTH_SOCK`).
    ///
    /// Best-effort: an unreachable or empty agent is logged and skipped,
    /// never fatal.
    pub use_agent: bool,
}

impl AuthOptions {
    /// True when no credential source is configured at all.
    ///
    /// The transport refuses to connect in this state; an agent-only
    /// configuration is allowed and fails later only if the agent yields
    /// nothing.
    pub fn is_empty(&self) -> bool {
        self.password.is_none()
            && self.pem_key.is_none()
            && self.key_file.is_none()
            && !self.use_agent
    }
}

/// Serializable connection settings as consumed from an external
/// configuration source (environment, CLI flags, provider config).
///
/// This is the wire-format counterpart of [`SshConfig`]: plain strings,
/// no secrecy wrappers, all fields optional with crate defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectSettings {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pem_key: Option<String>,
    pub pem_passphrase: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_file_passphrase: Option<String>,
    pub use_agent: bool,
    pub ciphers: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

impl From<ConnectSettings> for SshConfig {
    fn from(s: ConnectSettings) -> Self {
        let mut cfg = SshConfig::new(s.host);
        if let Some(port) = s.port {
            cfg.port = port;
        }
        if let Some(username) = s.username {
            cfg.username = username;
        }
        cfg.auth = AuthOptions {
            password: s.password.map(SecretString::from),
            pem_key: s.pem_key.map(SecretString::from),
            pem_passphrase: s.pem_passphrase.map(SecretString::from),
            key_file: s.key_file,
            key_file_passphrase: s.key_file_passphrase.map(SecretString::from),
            use_agent: s.use_agent,
        };
        if let Some(ciphers) = s.ciphers {
            cfg.ciphers = ciphers;
        }
        if let Some(secs) = s.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = s.retries {
            cfg.retries = retries;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SshConfig::new("192.0.2.1");
        assert_eq!(cfg.port, 830);
        assert_eq!(cfg.username, "netconf");
        assert_eq!(cfg.socket_addr(), "192.0.2.1:830");
        assert!(cfg.auth.is_empty());
    }

    #[test]
    fn test_auth_options_empty() {
        let mut auth = AuthOptions::default();
        assert!(auth.is_empty());

        auth.use_agent = true;
        assert!(!auth.is_empty());

        auth.use_agent = false;
        auth.password = Some(SecretString::from("secret"));
        assert!(!auth.is_empty());
    }

    #[test]
    fn test_settings_conversion() {
        let settings = ConnectSettings {
            host: "fw0.example.net".to_string(),
            port: Some(2830),
            username: Some("automation".to_string()),
            password: Some("secret".to_string()),
            timeout_secs: Some(5),
            retries: Some(3),
            ..Default::default()
        };
        let cfg = SshConfig::from(settings);
        assert_eq!(cfg.socket_addr(), "fw0.example.net:2830");
        assert_eq!(cfg.username, "automation");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.retries, 3);
        assert!(!cfg.auth.is_empty());
    }
}
