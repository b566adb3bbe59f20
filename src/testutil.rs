//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::{ContentHeader, Deliver, Frame, FramePayload, Method, Properties};
use crate::transport::{QueueOptions, Transport};

/// One recorded publish operation.
pub(crate) struct Published {
    pub channel: u16,
    pub exchange: String,
    pub routing_key: String,
    pub properties: Properties,
    pub body: Vec<u8>,
}

/// Transport fed from a scripted frame queue, recording every operation.
///
/// `next_frame` on an exhausted script reports the connection closed, so
/// loops under test terminate deterministically.
pub(crate) struct ScriptedTransport {
    pub incoming: VecDeque<Frame>,
    pub sent: Vec<Frame>,
    pub acks: Vec<(u16, u64)>,
    pub published: Vec<Published>,
    pub declared: Vec<(Option<String>, QueueOptions)>,
    pub bound: Vec<(String, String, String)>,
    pub consumers: Vec<(String, bool)>,
    pub gets: VecDeque<Method>,
    pub generated_queue: String,
    pub closed: bool,
    /// Invoked on every publish; returned frames are appended to the
    /// incoming script (simulates a peer answering an RPC).
    pub on_publish: Option<Box<dyn FnMut(&Published) -> Vec<Frame> + Send>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            sent: Vec::new(),
            acks: Vec::new(),
            published: Vec::new(),
            declared: Vec::new(),
            bound: Vec::new(),
            consumers: Vec::new(),
            gets: VecDeque::new(),
            generated_queue: "amq.gen-test".to_string(),
            closed: false,
            on_publish: None,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.incoming.push_back(frame);
    }

    /// Script a full delivery: method, header, and one body frame per
    /// fragment.
    pub fn push_delivery(
        &mut self,
        channel: u16,
        delivery_tag: u64,
        routing_key: &str,
        reply_to: Option<&str>,
        correlation_id: Option<&str>,
        fragments: &[&[u8]],
    ) {
        let frames = delivery_frames(
            channel,
            delivery_tag,
            routing_key,
            reply_to,
            correlation_id,
            fragments,
        );
        self.incoming.extend(frames);
    }
}

/// Build the frame sequence for one delivery.
pub(crate) fn delivery_frames(
    channel: u16,
    delivery_tag: u64,
    routing_key: &str,
    reply_to: Option<&str>,
    correlation_id: Option<&str>,
    fragments: &[&[u8]],
) -> Vec<Frame> {
    let body_size = fragments.iter().map(|f| f.len() as u64).sum();

    let mut frames = vec![
        Frame::new(
            channel,
            FramePayload::Method(Method::Deliver(Deliver {
                delivery_tag,
                exchange: "amq.direct".to_string(),
                routing_key: routing_key.to_string(),
                redelivered: false,
            })),
        ),
        Frame::new(
            channel,
            FramePayload::Header(ContentHeader {
                body_size,
                properties: Properties {
                    reply_to: reply_to.map(str::to_string),
                    correlation_id: correlation_id.map(str::to_string),
                },
            }),
        ),
    ];

    for fragment in fragments {
        frames.push(Frame::new(
            channel,
            FramePayload::Body(Bytes::copy_from_slice(fragment)),
        ));
    }

    frames
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn next_frame(&mut self) -> Result<Frame> {
        self.incoming.pop_front().ok_or(Error::ConnectionClosed)
    }

    async fn ready(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.incoming.is_empty())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.sent.push(frame);
        Ok(())
    }

    async fn ack(&mut self, channel: u16, delivery_tag: u64) -> Result<()> {
        self.acks.push((channel, delivery_tag));
        Ok(())
    }

    async fn publish(
        &mut self,
        channel: u16,
        exchange: &str,
        routing_key: &str,
        properties: &Properties,
        body: &[u8],
    ) -> Result<()> {
        let record = Published {
            channel,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties: properties.clone(),
            body: body.to_vec(),
        };

        if let Some(peer) = self.on_publish.as_mut() {
            let frames = peer(&record);
            self.incoming.extend(frames);
        }

        self.published.push(record);
        Ok(())
    }

    async fn declare_queue(
        &mut self,
        _channel: u16,
        name: Option<&str>,
        options: QueueOptions,
    ) -> Result<String> {
        self.declared.push((name.map(str::to_string), options));
        Ok(match name {
            Some(name) => name.to_string(),
            None => self.generated_queue.clone(),
        })
    }

    async fn bind_queue(
        &mut self,
        _channel: u16,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<()> {
        self.bound.push((
            queue.to_string(),
            exchange.to_string(),
            routing_key.to_string(),
        ));
        Ok(())
    }

    async fn consume(&mut self, _channel: u16, queue: &str, auto_ack: bool) -> Result<String> {
        self.consumers.push((queue.to_string(), auto_ack));
        Ok(format!("ctag-{}", self.consumers.len()))
    }

    async fn get(&mut self, _channel: u16, _queue: &str, _auto_ack: bool) -> Result<Method> {
        self.gets.pop_front().ok_or(Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
