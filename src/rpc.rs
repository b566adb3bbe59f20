//! RPC correlation manager.
//!
//! Turns a publish/consume pair into a synchronous call: publish the
//! request with a fresh correlation id and a private reply queue, then pull
//! one message off the reply queue and hand it back as the response.
//!
//! The reply session (queue, binding, consumer, correlation counter) is
//! created lazily on the first call and lives as long as the client. Calls
//! must be strictly sequential per connection - a second call must not be
//! issued before the first response is consumed. As a guard against
//! out-of-order replies the received correlation id is verified against the
//! one just sent; a mismatch is reported as
//! [`Error::CorrelationMismatch`] rather than trusted.

use crate::consume::{self, AckMode};
use crate::error::{Error, Result};
use crate::protocol::{Message, Properties, DEFAULT_CHANNEL};
use crate::transport::{QueueOptions, Transport};

/// Per-connection reply state, created on the first call.
struct RpcSession {
    reply_queue: String,
    next_correlation: u64,
}

/// Synchronous request/response client over an exclusively-owned transport.
///
/// # Example
///
/// ```ignore
/// use routewire::rpc::RpcClient;
///
/// let mut client = RpcClient::new(transport);
/// let reply = client.call("amq.direct", "orders.lookup", b"{\"id\":7}").await?;
/// println!("{} bytes", reply.len());
/// ```
pub struct RpcClient<T: Transport> {
    transport: T,
    channel: u16,
    session: Option<RpcSession>,
}

impl<T: Transport> RpcClient<T> {
    /// Create a client on the default channel.
    pub fn new(transport: T) -> Self {
        Self::on_channel(transport, DEFAULT_CHANNEL)
    }

    /// Create a client on an explicit channel.
    pub fn on_channel(transport: T, channel: u16) -> Self {
        Self {
            transport,
            channel,
            session: None,
        }
    }

    /// Publish a message with caller-supplied properties. Fire-and-forget.
    pub async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        properties: &Properties,
        body: &[u8],
    ) -> Result<()> {
        self.transport
            .publish(self.channel, exchange, routing_key, properties, body)
            .await
    }

    /// Issue one request and wait for its response.
    ///
    /// The first call on a connection declares the private reply queue,
    /// binds it to `exchange` under its own name, and starts an
    /// auto-acknowledge consumer on it.
    pub async fn call(&mut self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<Message> {
        if self.session.is_none() {
            self.session = Some(self.open_session(exchange).await?);
        }

        let session = self.session.as_mut().expect("session opened above");

        let correlation_id = format!("{:016x}", session.next_correlation);
        session.next_correlation += 1;

        let properties = Properties {
            reply_to: Some(session.reply_queue.clone()),
            correlation_id: Some(correlation_id.clone()),
        };

        tracing::debug!(
            "Issuing rpc request {} to \"{}\"",
            correlation_id,
            routing_key
        );

        self.transport
            .publish(self.channel, exchange, routing_key, &properties, body)
            .await?;

        // One reassembly pull on the reply queue; the consumer was opened
        // with auto-acknowledge, so nothing is acked here.
        let reply = consume::dequeue(&mut self.transport, AckMode::Auto).await?;

        let verified = reply
            .correlation_id()
            .is_some_and(|received| received == correlation_id);

        if verified {
            Ok(reply)
        } else {
            Err(Error::CorrelationMismatch {
                sent: correlation_id,
                received: reply.correlation_id().unwrap_or_default().to_string(),
            })
        }
    }

    /// Declare, bind, and consume from the server-named reply queue.
    async fn open_session(&mut self, exchange: &str) -> Result<RpcSession> {
        let reply_queue = self
            .transport
            .declare_queue(self.channel, None, QueueOptions::reply_queue())
            .await?;

        // The queue name doubles as the binding key so responses published
        // to the exchange under that name land on the reply queue.
        self.transport
            .bind_queue(self.channel, &reply_queue, exchange, &reply_queue)
            .await?;

        self.transport
            .consume(self.channel, &reply_queue, true)
            .await?;

        tracing::debug!("Reply session opened on queue \"{}\"", reply_queue);

        Ok(RpcSession {
            reply_queue,
            next_correlation: 0,
        })
    }

    /// Name of the reply queue, once the session exists.
    pub fn reply_queue(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.reply_queue.as_str())
    }

    /// Give the transport back to the owner (for closing).
    pub fn into_transport(self) -> T {
        self.transport
    }
}
