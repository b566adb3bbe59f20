//! Transport seam - the narrow interface this core consumes.
//!
//! Everything below the frame level (sockets, TLS, wire codecs, login and
//! channel negotiation) lives behind [`Transport`]. The engine only pulls
//! decoded frames, pushes frames back (heartbeat echo), and issues broker
//! operations. Connecting and opening channels are the collaborator's
//! constructors and happen before a `Transport` reaches this crate.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Frame, Method, Properties};

/// Queue declaration flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Survive broker restarts.
    pub durable: bool,
    /// Restrict the queue to this connection.
    pub exclusive: bool,
    /// Delete the queue once the last consumer goes away.
    pub auto_delete: bool,
}

impl QueueOptions {
    /// Options for an RPC reply queue: exclusive and auto-delete.
    pub fn reply_queue() -> Self {
        Self {
            durable: false,
            exclusive: true,
            auto_delete: true,
        }
    }
}

/// One open channel on a broker connection.
///
/// Implementations are owned exclusively by a single serve loop or RPC
/// client (`&mut self` throughout); no two loops ever share a transport.
#[async_trait]
pub trait Transport: Send {
    /// Block until the next frame arrives. Fails with a transport error if
    /// the connection is no longer usable.
    async fn next_frame(&mut self) -> Result<Frame>;

    /// Report whether a frame can be pulled without blocking longer than
    /// `timeout`. Must return `true` immediately when frames are already
    /// buffered; `Ok(false)` means the timeout elapsed with no activity.
    async fn ready(&mut self, timeout: Duration) -> Result<bool>;

    /// Send a frame back over the connection (heartbeat echo).
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;

    /// Acknowledge a single delivery by tag. Fire-and-forget.
    async fn ack(&mut self, channel: u16, delivery_tag: u64) -> Result<()>;

    /// Publish a message. An empty `exchange` addresses the default
    /// exchange, where the routing key names the destination queue.
    async fn publish(
        &mut self,
        channel: u16,
        exchange: &str,
        routing_key: &str,
        properties: &Properties,
        body: &[u8],
    ) -> Result<()>;

    /// Declare a queue; `name` of `None` asks the broker to generate one.
    /// Returns the effective queue name.
    async fn declare_queue(
        &mut self,
        channel: u16,
        name: Option<&str>,
        options: QueueOptions,
    ) -> Result<String>;

    /// Bind a queue to an exchange under a routing key.
    async fn bind_queue(
        &mut self,
        channel: u16,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<()>;

    /// Start a consumer on a queue. Returns the consumer tag.
    async fn consume(&mut self, channel: u16, queue: &str, auto_ack: bool) -> Result<String>;

    /// Poll a queue for one message. Returns [`Method::GetOk`] when a
    /// message is ready (its header and body frames follow on the
    /// connection) or [`Method::GetEmpty`] when the queue is empty.
    async fn get(&mut self, channel: u16, queue: &str, auto_ack: bool) -> Result<Method>;

    /// Close the channel and connection.
    async fn close(&mut self) -> Result<()>;
}
