//! NETCONF protocol layer: framing, RPC envelopes, reply diagnostics,
//! and the session bound to the SSH subsystem channel.

mod frame;
mod rpc;
mod session;

pub use frame::{EOM, FrameBuffer};
pub use rpc::{
    RpcDiagnostic, RpcReply, Severity, escape_text, extract_output, wrap_rpc,
};
pub use session::{NetconfSession, require_nonempty};
