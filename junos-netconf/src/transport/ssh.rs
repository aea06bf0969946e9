//! SSH transport implementation using russh.

use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::agent::client::AgentClient;
use russh::keys::{
    PrivateKey, PrivateKeyWithHashAlg, PublicKey, decode_secret_key, load_secret_key,
};
use russh::{Channel, Preferred, cipher};
use secrecy::{ExposeSecret, SecretString};

use super::config::{AuthOptions, SshConfig};
use crate::error::{Result, TransportError};

/// SSH transport wrapping russh client.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

/// One authentication attempt offered to the server.
///
/// Built from [`AuthOptions`] in a fixed provider order; the server accepts
/// the first candidate it likes.
#[derive(Debug)]
enum AuthCandidate {
    Key(PrivateKey),
    Agent,
    Password(SecretString),
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            preferred: Preferred {
                cipher: Cow::Owned(cipher_allow_list(&config.ciphers)),
                ..Preferred::DEFAULT
            },
            ..Default::default()
        });

        let handler = SshHandler;

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(TransportError::Ssh)?;

        Self::authenticate(&mut session, &config).await?;

        Ok(Self { session, config })
    }

    /// Open a channel running the `netconf` SSH subsystem.
    pub async fn open_netconf_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_subsystem(true, "netconf")
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Authenticate with the server, offering every configured credential
    /// source until one is accepted.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        if config.auth.is_empty() {
            return Err(TransportError::NoAuthMethod {
                user: config.username.clone(),
            }
            .into());
        }

        for candidate in build_candidates(&config.auth)? {
            let accepted = match candidate {
                AuthCandidate::Key(key) => {
                    let hash_alg = session
                        .best_supported_rsa_hash()
                        .await
                        .map_err(TransportError::Ssh)?
                        .flatten();

                    session
                        .authenticate_publickey(
                            &config.username,
                            PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                        )
                        .await
                        .map_err(TransportError::Ssh)?
                        .success()
                }
                AuthCandidate::Agent => {
                    Self::authenticate_agent(session, &config.username).await?
                }
                AuthCandidate::Password(password) => session
                    .authenticate_password(&config.username, password.expose_secret())
                    .await
                    .map_err(TransportError::Ssh)?
                    .success(),
            };

            if accepted {
                return Ok(());
            }
        }

        Err(TransportError::AuthenticationFailed {
            host: config.host.clone(),
            user: config.username.clone(),
        }
        .into())
    }

    /// Offer every identity held by the ambient SSH agent.
    ///
    /// Agent trouble is never fatal: an unreachable socket or an empty
    /// keyring is logged and treated as "candidate rejected".
    async fn authenticate_agent(session: &mut Handle<SshHandler>, username: &str) -> Result<bool> {
        let mut agent = match AgentClient::connect_env().await {
            Ok(agent) => agent,
            Err(e) => {
                warn!("SSH agent unreachable, skipping agent auth: {}", e);
                return Ok(false);
            }
        };

        let identities = match agent.request_identities().await {
            Ok(identities) => identities,
            Err(e) => {
                warn!("SSH agent refused identity listing: {}", e);
                return Ok(false);
            }
        };

        if identities.is_empty() {
            debug!("SSH agent holds no identities");
            return Ok(false);
        }

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .map_err(TransportError::Ssh)?
            .flatten();

        for identity in identities {
            let accepted = session
                .authenticate_publickey_with(username, identity, hash_alg, &mut agent)
                .await
                .map_err(|e| TransportError::Key(e.to_string()))?
                .success();
            if accepted {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    /// Host this transport is connected to.
    pub fn host(&self) -> &str {
        &self.config.host
    }
}

/// Build the ordered candidate list from the configured sources.
///
/// Key material is decoded up front so a bad key or passphrase fails the
/// connect with a key error instead of a generic auth rejection.
fn build_candidates(auth: &AuthOptions) -> Result<Vec<AuthCandidate>> {
    let mut candidates = Vec::new();

    if let Some(pem) = &auth.pem_key {
        let key = decode_secret_key(
            pem.expose_secret(),
            auth.pem_passphrase.as_ref().map(|p| p.expose_secret()),
        )
        .map_err(|e| TransportError::Key(e.to_string()))?;
        candidates.push(AuthCandidate::Key(key));
    }

    if let Some(path) = &auth.key_file {
        let key = load_secret_key(
            path,
            auth.key_file_passphrase.as_ref().map(|p| p.expose_secret()),
        )
        .map_err(|e| TransportError::Key(e.to_string()))?;
        candidates.push(AuthCandidate::Key(key));
    }

    if auth.use_agent {
        candidates.push(AuthCandidate::Agent);
    }

    if let Some(password) = &auth.password {
        candidates.push(AuthCandidate::Password(password.clone()));
    }

    Ok(candidates)
}

/// Translate the configured cipher allow-list into russh cipher names.
///
/// Unknown names are skipped with a warning; an empty result falls back to
/// russh defaults so a typo-ridden list cannot brick the connection.
fn cipher_allow_list(names: &[String]) -> Vec<cipher::Name> {
    let mut allowed = Vec::with_capacity(names.len());
    for name in names {
        match cipher_name(name) {
            Some(cipher) => allowed.push(cipher),
            None => warn!("Unsupported cipher '{}' in allow-list, skipping", name),
        }
    }

    if allowed.is_empty() {
        Preferred::DEFAULT.cipher.to_vec()
    } else {
        allowed
    }
}

fn cipher_name(name: &str) -> Option<cipher::Name> {
    match name {
        "aes128-ctr" => Some(cipher::AES_128_CTR),
        "aes192-ctr" => Some(cipher::AES_192_CTR),
        "aes256-ctr" => Some(cipher::AES_256_CTR),
        "aes256-gcm@openssh.com" | "aes256-gcm" => Some(cipher::AES_256_GCM),
        "chacha20-poly1305@openssh.com" | "chacha20-poly1305" => {
            Some(cipher::CHACHA20_POLY1305)
        }
        _ => None,
    }
}

/// SSH client handler for russh.
///
/// Host keys are NOT verified: every server key is accepted. Junos
/// management networks routinely re-image devices and regenerate host keys,
/// and the upstream tooling this client replaces behaves the same way.
/// Deployments that need host-key pinning must front this client with a
/// known-hosts-enforcing bastion. Flagged for security review.
struct SshHandler;

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}
