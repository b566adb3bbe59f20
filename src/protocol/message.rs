//! Assembled application messages.

use bytes::Bytes;

/// A complete application message, reconstructed from one method + header +
/// N body frames.
///
/// Immutable after construction: the reassembly engine is the only producer
/// and guarantees that the body length equals the size declared by the
/// content header.
#[derive(Debug, Clone)]
pub struct Message {
    routing_key: String,
    reply_to: Option<String>,
    correlation_id: Option<String>,
    delivery_tag: u64,
    channel: u16,
    body: Bytes,
}

impl Message {
    pub(crate) fn new(
        routing_key: String,
        reply_to: Option<String>,
        correlation_id: Option<String>,
        delivery_tag: u64,
        channel: u16,
        body: Bytes,
    ) -> Self {
        Self {
            routing_key,
            reply_to,
            correlation_id,
            delivery_tag,
            channel,
            body,
        }
    }

    /// Routing key the message was published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Queue designated to receive a response, if the sender asked for one.
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    /// Correlation id, if the sender attached one.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Tag to acknowledge exactly this delivery.
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Channel the message was delivered on.
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Cheap zero-copy clone of the body.
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

const BYTES_PER_LINE: usize = 16;

/// Render a buffer as an offset/hex/ASCII dump, 16 bytes per line.
///
/// Used for trace-level payload logging.
pub fn hexdump(data: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::new();

    for (i, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        let _ = write!(out, "{:04x}  ", i * BYTES_PER_LINE);

        for j in 0..BYTES_PER_LINE {
            match chunk.get(j) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
        }

        out.push_str("  |");

        for &b in chunk {
            out.push(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            });
        }

        out.push_str("|\n");
    }

    out
}
