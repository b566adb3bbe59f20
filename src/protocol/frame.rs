//! Frame data model.
//!
//! A [`Frame`] is the transport-level unit handed over by the connection:
//! a method, a content header, a body fragment, or a heartbeat, tagged with
//! the channel it arrived on. Frames are transient - the reassembly engine
//! consumes them one at a time and never stores them.

use bytes::Bytes;

/// Channel the crate operates on when the caller does not say otherwise.
pub const DEFAULT_CHANNEL: u16 = 1;

/// A transport-level frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Channel identifier the frame arrived on (or is sent on).
    pub channel: u16,
    /// Type-specific payload.
    pub payload: FramePayload,
}

impl Frame {
    /// Create a frame on the given channel.
    pub fn new(channel: u16, payload: FramePayload) -> Self {
        Self { channel, payload }
    }

    /// Create a heartbeat frame.
    pub fn heartbeat(channel: u16) -> Self {
        Self::new(channel, FramePayload::Heartbeat)
    }

    /// Whether this is a heartbeat frame.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self.payload, FramePayload::Heartbeat)
    }
}

/// The type-specific content of a [`Frame`].
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// A protocol method.
    Method(Method),
    /// A content header announcing an incoming body.
    Header(ContentHeader),
    /// One body fragment.
    Body(Bytes),
    /// A connection heartbeat.
    Heartbeat,
}

impl FramePayload {
    /// Short name used in protocol-violation diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FramePayload::Method(_) => "method",
            FramePayload::Header(_) => "header",
            FramePayload::Body(_) => "body",
            FramePayload::Heartbeat => "heartbeat",
        }
    }
}

/// Protocol methods the engine cares about. Anything else arrives as
/// [`Method::Other`] and is skipped while waiting for a delivery.
#[derive(Debug, Clone)]
pub enum Method {
    /// A pushed delivery for a consumer.
    Deliver(Deliver),
    /// Reply to a polling get when a message was available.
    GetOk(GetOk),
    /// Reply to a polling get on an empty queue.
    GetEmpty,
    /// Any other method, identified by its wire id.
    Other(u32),
}

/// Delivery information from the broker.
#[derive(Debug, Clone)]
pub struct Deliver {
    /// Tag to acknowledge exactly this delivery.
    pub delivery_tag: u64,
    /// Exchange the message was published to.
    pub exchange: String,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Whether the broker redelivered this message.
    pub redelivered: bool,
}

/// Get-ok information from the broker.
#[derive(Debug, Clone)]
pub struct GetOk {
    /// Tag to acknowledge exactly this delivery.
    pub delivery_tag: u64,
    /// Exchange the message was published to.
    pub exchange: String,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Messages remaining on the queue after this one.
    pub message_count: u32,
}

/// Content header following a delivery or get-ok method.
#[derive(Debug, Clone)]
pub struct ContentHeader {
    /// Declared total body size in bytes. The body fragments that follow
    /// must sum to exactly this.
    pub body_size: u64,
    /// Message properties.
    pub properties: Properties,
}

/// Message properties carried on the content header.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// Queue designated to receive the response, if any.
    pub reply_to: Option<String>,
    /// Token linking a request to its response, if any.
    pub correlation_id: Option<String>,
}
