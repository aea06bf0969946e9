//! NETCONF session over an SSH subsystem channel.

use log::{debug, trace};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::frame::{FrameBuffer, frame_outgoing};
use super::rpc::{RpcReply, ServerHello, client_hello, wrap_rpc};
use crate::error::{NetconfError, Result, TransportError};
use crate::transport::SshTransport;

/// A NETCONF session bound to one SSH subsystem channel.
///
/// Owns the transport exclusively. Not safe for concurrent use: every RPC is
/// a strict request/reply round trip through `&mut self`.
pub struct NetconfSession {
    transport: SshTransport,
    channel: Channel<Msg>,
    frames: FrameBuffer,
    hello: ServerHello,
    message_id: u64,
}

impl NetconfSession {
    /// Run the hello exchange on a freshly opened transport.
    ///
    /// Both peers send their `<hello>` eagerly; ours goes out first, then the
    /// server's is read and decoded. On any failure the raw connection is
    /// closed before returning, so a retrying caller always starts from a
    /// fresh dial.
    pub async fn open(transport: SshTransport) -> Result<Self> {
        let channel = match transport.open_netconf_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };

        let mut session = Self {
            transport,
            channel,
            frames: FrameBuffer::new(),
            hello: ServerHello::default(),
            message_id: 0,
        };

        match session.handshake().await {
            Ok(()) => Ok(session),
            Err(e) => {
                let _ = session.abort().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<()> {
        self.send(client_hello()).await?;
        let raw = self.read_message().await?;
        self.hello = ServerHello::parse(&raw)?;

        debug!(
            "NETCONF hello from {}: session-id {:?}, {} capabilities",
            self.transport.host(),
            self.hello.session_id,
            self.hello.capabilities.len()
        );
        Ok(())
    }

    /// Execute an RPC and return the raw reply document.
    pub async fn execute_raw(&mut self, body: &str) -> Result<String> {
        self.message_id += 1;
        let rpc = wrap_rpc(self.message_id, body);
        trace!("rpc out to {}: {}", self.transport.host(), rpc);

        self.send(&rpc).await?;
        let raw = self.read_message().await?;
        trace!("rpc in from {}: {}", self.transport.host(), raw);
        Ok(raw)
    }

    /// Execute an RPC and parse the reply's diagnostics.
    ///
    /// A transport failure always fails the call; device-side diagnostics are
    /// returned inside the reply for the caller to classify.
    pub async fn execute(&mut self, operation: &str, body: &str) -> Result<RpcReply> {
        let raw = self.execute_raw(body).await?;
        RpcReply::parse(operation, raw)
    }

    /// Server capabilities advertised at hello time.
    pub fn capabilities(&self) -> &[String] {
        &self.hello.capabilities
    }

    /// NETCONF session id assigned by the device, when reported.
    pub fn session_id(&self) -> Option<u64> {
        self.hello.session_id
    }

    /// Host this session is connected to.
    pub fn host(&self) -> &str {
        self.transport.host()
    }

    /// Send `<close-session/>`, then tear the transport down regardless of
    /// the RPC outcome.
    pub async fn close(mut self) -> Result<()> {
        let rpc_result = self.execute("close-session", "<close-session/>").await;
        if let Err(e) = &rpc_result {
            debug!(
                "close-session RPC to {} failed, closing transport anyway: {}",
                self.transport.host(),
                e
            );
        }

        let _ = self.channel.eof().await;
        self.transport.close().await?;
        rpc_result.map(|_| ())
    }

    /// Abandon the session without the close-session RPC.
    ///
    /// Used when the device never completed the handshake and an RPC would
    /// just hang.
    pub async fn abort(self) -> Result<()> {
        let _ = self.channel.eof().await;
        self.transport.close().await
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        self.channel
            .data(&frame_outgoing(message)[..])
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    /// Read channel data until one complete `]]>]]>`-delimited message is
    /// buffered.
    ///
    /// Once an RPC is in flight it is never cancelled mid-read; a dead peer
    /// surfaces as the transport's inactivity disconnect.
    async fn read_message(&mut self) -> Result<String> {
        loop {
            if let Some(message) = self.frames.next_message() {
                if message.is_empty() {
                    continue;
                }
                return Ok(message);
            }

            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => {
                    self.frames.extend(data);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransportError::Disconnected {
                        host: self.transport.host().to_string(),
                    }
                    .into());
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    debug!(
                        "netconf subsystem on {} exited with status {}",
                        self.transport.host(),
                        exit_status
                    );
                }
                Some(_) => {}
            }
        }
    }
}

/// Shape check for replies that must carry an `<ok/>` or data payload.
///
/// Some buggy Junos builds answer a malformed RPC with a bare newline before
/// the delimiter; an empty reply body is a protocol error, not success.
pub fn require_nonempty(operation: &str, raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(NetconfError::MalformedReply {
            operation: operation.to_string(),
            message: "empty reply body".to_string(),
            raw: raw.to_string(),
        }
        .into());
    }
    Ok(())
}
