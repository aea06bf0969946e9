//! NETCONF 1.0 end-of-message framing.
//!
//! Messages on the wire are delimited by the `]]>]]>` marker. The receive
//! buffer accumulates channel data and yields complete messages, tolerating
//! markers split across arbitrary read boundaries.

use bytes::{Buf, BytesMut};
use memchr::memmem;

/// The NETCONF 1.0 end-of-message delimiter.
pub const EOM: &[u8] = b"]]>]]>";

/// Buffer for accumulating channel output and splitting complete messages.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Extend the buffer with new channel data.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pop the next complete message, without its trailing delimiter.
    ///
    /// Returns `None` until a full `]]>]]>`-terminated message has been
    /// accumulated. Leading whitespace between messages is trimmed.
    pub fn next_message(&mut self) -> Option<String> {
        let end = memmem::find(&self.buffer, EOM)?;

        let message = self.buffer.split_to(end);
        self.buffer.advance(EOM.len());

        Some(String::from_utf8_lossy(&message).trim().to_string())
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Append the end-of-message delimiter to an outgoing message.
pub fn frame_outgoing(message: &str) -> Vec<u8> {
    let mut framed = Vec::with_capacity(message.len() + EOM.len() + 1);
    framed.extend_from_slice(message.as_bytes());
    framed.extend_from_slice(EOM);
    framed.push(b'\n');
    framed
}
