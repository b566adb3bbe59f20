//! Frame reassembly engine.
//!
//! Reconstructs one complete [`Message`] out of the frame sequence the
//! broker emits for a delivery: one method frame, one content header, then
//! body fragments until the declared size is reached.
//!
//! The per-delivery state progression is AwaitMethod -> AwaitHeader ->
//! AwaitBody -> Complete. While awaiting the method, heartbeat frames are
//! echoed back verbatim and unrelated frames are skipped; once the method
//! is captured, any out-of-place frame is a protocol violation and the
//! connection is presumed unusable.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::{FramePayload, Message, Method};
use crate::transport::Transport;

/// How the engine handles the delivery tag of an assembled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Acknowledge on the delivery's channel as soon as assembly completes.
    Immediate,
    /// Leave the delivery unacknowledged; the caller acks the tag itself.
    Deferred,
    /// The consumer was opened with broker-side auto-acknowledge; send
    /// nothing.
    Auto,
}

/// Pull frames until one pushed delivery is fully reassembled.
///
/// Heartbeats received while waiting for the delivery method are echoed
/// back and do not terminate reassembly. Frames for other methods are
/// skipped. Any protocol violation or transport failure aborts the
/// in-flight message and surfaces as an error - never a silent retry.
pub async fn dequeue<T: Transport>(transport: &mut T, ack: AckMode) -> Result<Message> {
    // AwaitMethod: spin until a delivery method shows up.
    let (channel, deliver) = loop {
        let frame = transport.next_frame().await?;

        match frame.payload {
            FramePayload::Heartbeat => {
                transport.send_frame(frame).await?;
            }
            FramePayload::Method(Method::Deliver(deliver)) => {
                break (frame.channel, deliver);
            }
            // Not the method we are waiting for; keep looking.
            _ => {}
        }
    };

    let message = read_content(
        transport,
        channel,
        deliver.routing_key,
        deliver.delivery_tag,
    )
    .await?;

    if ack == AckMode::Immediate {
        transport.ack(channel, message.delivery_tag()).await?;
    }

    Ok(message)
}

/// Poll `queue` for a single message.
///
/// Returns `None` when the queue is empty. A ready message is reassembled
/// through the same header/body machine as [`dequeue`].
pub async fn fetch<T: Transport>(
    transport: &mut T,
    channel: u16,
    queue: &str,
    ack: AckMode,
) -> Result<Option<Message>> {
    let get_ok = match transport.get(channel, queue, ack == AckMode::Auto).await? {
        Method::GetOk(get_ok) => get_ok,
        Method::GetEmpty => return Ok(None),
        other => {
            return Err(Error::Protocol(format!(
                "unexpected reply to get: {other:?}"
            )))
        }
    };

    let message = read_content(transport, channel, get_ok.routing_key, get_ok.delivery_tag).await?;

    if ack == AckMode::Immediate {
        transport.ack(channel, message.delivery_tag()).await?;
    }

    Ok(Some(message))
}

/// AwaitHeader and AwaitBody: read the content header and exactly
/// `body_size` bytes of body fragments.
async fn read_content<T: Transport>(
    transport: &mut T,
    channel: u16,
    routing_key: String,
    delivery_tag: u64,
) -> Result<Message> {
    let frame = transport.next_frame().await?;

    let header = match frame.payload {
        FramePayload::Header(header) => header,
        other => {
            return Err(Error::Protocol(format!(
                "expected header frame but found {} frame",
                other.kind()
            )))
        }
    };

    let declared = usize::try_from(header.body_size)
        .map_err(|_| Error::Protocol(format!("declared body size {} unrepresentable", header.body_size)))?;

    // The size comes off the wire; reserve fallibly instead of trusting it.
    let mut body = Vec::new();
    body.try_reserve_exact(declared)
        .map_err(|_| Error::Allocation(declared))?;

    // AwaitBody: an empty body is legal and completes immediately.
    while body.len() < declared {
        let frame = transport.next_frame().await?;

        let fragment = match frame.payload {
            FramePayload::Body(fragment) => fragment,
            other => {
                return Err(Error::Protocol(format!(
                    "expected body frame but found {} frame",
                    other.kind()
                )))
            }
        };

        if body.len() + fragment.len() > declared {
            return Err(Error::Protocol(
                "received more body data than declared".to_string(),
            ));
        }

        body.extend_from_slice(&fragment);
    }

    Ok(Message::new(
        routing_key,
        header.properties.reply_to,
        header.properties.correlation_id,
        delivery_tag,
        channel,
        Bytes::from(body),
    ))
}
