//! Dispatch/serve loop.
//!
//! Repeatedly reassembles a message, looks its routing key up in the shared
//! [`Router`], invokes the bound handler, publishes the response to the
//! requested reply queue (default exchange), and acknowledges the delivery.
//!
//! One [`Dispatcher`] per connection; loops share nothing mutable - only
//! the read-only router behind an `Arc`. [`spawn`] runs a loop on a
//! dedicated task so several connections can be served concurrently.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use routewire::serve::{Dispatcher, ServeConfig};
//!
//! let mut dispatcher = Dispatcher::new(transport, Arc::new(router), ServeConfig::default());
//! // Serve until the connection drops or `stopper.stop()` is called.
//! dispatcher.serve(None).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::consume::{self, AckMode};
use crate::error::{Error, Result};
use crate::protocol::{hexdump, Message, Properties};
use crate::route::Router;
use crate::transport::Transport;

/// Outcome of a serve call that ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The idle timeout elapsed with no activity. Not an error - call
    /// `serve` again to keep going.
    TimedOut,
    /// The stop signal was raised.
    Stopped,
}

/// Serve-loop configuration. Replaces the original's process-wide
/// debug/trace flags with explicit per-dispatcher state.
#[derive(Debug, Clone, Default)]
pub struct ServeConfig {
    /// Log a summary of every received message at debug level.
    pub log_deliveries: bool,
    /// Hex-dump request and response payloads at trace level. Costly;
    /// keep off outside debugging sessions.
    pub trace_payloads: bool,
}

/// Handle for stopping a running serve loop from outside.
///
/// The flag is checked between dispatches only: an in-flight reassembly is
/// never cancelled mid-message. Tearing down the connection remains the
/// coarse-grained cancellation mechanism.
#[derive(Clone)]
pub struct Stopper(Arc<AtomicBool>);

impl Stopper {
    /// Ask the loop to return after the current dispatch.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// The serve loop for one exclusively-owned connection.
pub struct Dispatcher<T: Transport> {
    transport: T,
    router: Arc<Router>,
    config: ServeConfig,
    stop: Arc<AtomicBool>,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher over a transport and a shared routing table.
    pub fn new(transport: T, router: Arc<Router>, config: ServeConfig) -> Self {
        Self {
            transport,
            router,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for stopping this loop from another task.
    pub fn stopper(&self) -> Stopper {
        Stopper(self.stop.clone())
    }

    /// Give the transport back to the owner (for closing after a fatal
    /// error).
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Serve until the stop signal, an idle timeout, or a fatal error.
    ///
    /// With `timeout` set, each idle wait is bounded: if the transport
    /// reports no activity in time, `Ok(ServeOutcome::TimedOut)` is
    /// returned and the caller regains control. With `None` the loop
    /// serves until stopped or the connection fails.
    ///
    /// Structural errors (protocol violation, transport failure) terminate
    /// the loop; the connection is presumed unusable and reconnecting is
    /// the owner's decision.
    pub async fn serve(&mut self, timeout: Option<Duration>) -> Result<ServeOutcome> {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return Ok(ServeOutcome::Stopped);
            }

            if let Some(timeout) = timeout {
                if !self.transport.ready(timeout).await? {
                    return Ok(ServeOutcome::TimedOut);
                }
            }

            let message = consume::dequeue(&mut self.transport, AckMode::Deferred).await?;
            self.dispatch(message).await?;
        }
    }

    /// Run one message through handler, reply publication, and
    /// acknowledgment.
    async fn dispatch(&mut self, message: Message) -> Result<()> {
        if self.config.log_deliveries {
            tracing::debug!(
                "Message received: {} bytes, routing key \"{}\", reply queue \"{}\", correlation id \"{}\", delivery tag {}",
                message.len(),
                message.routing_key(),
                message.reply_to().unwrap_or(""),
                message.correlation_id().unwrap_or(""),
                message.delivery_tag()
            );
        }

        if self.config.trace_payloads {
            tracing::trace!("Request payload:\n{}", hexdump(message.body()));
        }

        let response = match self.router.lookup(message.routing_key()) {
            Some(route) => {
                if self.config.log_deliveries {
                    tracing::debug!("Calling handler \"{}\"", route.name());
                }
                route.handle(message.body_bytes()).await?
            }
            None => {
                tracing::warn!(
                    "No route registered for routing key \"{}\"",
                    message.routing_key()
                );
                Bytes::new()
            }
        };

        match message.reply_to() {
            Some(reply_to) if !reply_to.is_empty() => {
                if response.is_empty() {
                    // The sender asked for a response; having none to give
                    // is a broken deployment, not a recoverable condition.
                    return Err(Error::Configuration(
                        "reply queue specified but handler produced no response".to_string(),
                    ));
                }

                if self.config.log_deliveries {
                    tracing::debug!("Sending response ({} bytes)", response.len());
                }
                if self.config.trace_payloads {
                    tracing::trace!("Response payload:\n{}", hexdump(&response));
                }

                let properties = Properties {
                    reply_to: None,
                    correlation_id: message.correlation_id().map(str::to_string),
                };

                // Responses go back through the default exchange, addressed
                // directly to the reply queue.
                self.transport
                    .publish(message.channel(), "", reply_to, &properties, &response)
                    .await?;

                self.transport
                    .ack(message.channel(), message.delivery_tag())
                    .await?;
            }
            _ => {
                self.transport
                    .ack(message.channel(), message.delivery_tag())
                    .await?;
            }
        }

        Ok(())
    }
}

/// Run a serve loop on a dedicated task.
///
/// Each spawned loop owns its connection exclusively; any number of loops
/// may share the same `Arc<Router>`.
pub fn spawn<T>(
    mut dispatcher: Dispatcher<T>,
    timeout: Option<Duration>,
) -> JoinHandle<Result<ServeOutcome>>
where
    T: Transport + 'static,
{
    tokio::spawn(async move { dispatcher.serve(timeout).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedTransport;

    fn router_with_echo() -> Arc<Router> {
        let mut router = Router::new().unwrap();
        router
            .register("orders.created", |_body| async { Ok(Bytes::from_static(b"ok")) })
            .unwrap();
        router
            .register("orders.logged", |_body| async { Ok(Bytes::new()) })
            .unwrap();
        Arc::new(router)
    }

    fn dispatcher(transport: ScriptedTransport) -> Dispatcher<ScriptedTransport> {
        Dispatcher::new(transport, router_with_echo(), ServeConfig::default())
    }

    #[tokio::test]
    async fn test_reply_published_then_acked() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 42, "orders.created", Some("tmp-q-1"), Some("7"), &[b"{}"]);

        let mut dispatcher = dispatcher(transport);
        // One message scripted; next idle check times out.
        let outcome = dispatcher.serve(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(outcome, ServeOutcome::TimedOut);

        let transport = dispatcher.into_transport();

        assert_eq!(transport.published.len(), 1);
        let published = &transport.published[0];
        assert_eq!(published.exchange, "");
        assert_eq!(published.routing_key, "tmp-q-1");
        assert_eq!(published.body, b"ok");
        assert_eq!(published.properties.correlation_id.as_deref(), Some("7"));
        assert!(published.properties.reply_to.is_none());

        assert_eq!(transport.acks, vec![(1, 42)]);
    }

    #[tokio::test]
    async fn test_no_reply_queue_acks_without_publishing() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 5, "orders.created", None, None, &[b"{}"]);

        let mut dispatcher = dispatcher(transport);
        dispatcher.serve(Some(Duration::from_secs(1))).await.unwrap();

        let transport = dispatcher.into_transport();
        assert!(transport.published.is_empty());
        assert_eq!(transport.acks, vec![(1, 5)]);
    }

    #[tokio::test]
    async fn test_reply_queue_with_empty_response_is_configuration_error() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 6, "orders.logged", Some("tmp-q-2"), None, &[b"{}"]);

        let mut dispatcher = dispatcher(transport);
        let err = dispatcher
            .serve(Some(Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        let transport = dispatcher.into_transport();
        assert!(transport.published.is_empty());
        assert!(transport.acks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_routing_key_is_acked() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 8, "orders.unknown", None, None, &[b"{}"]);

        let mut dispatcher = dispatcher(transport);
        dispatcher.serve(Some(Duration::from_secs(1))).await.unwrap();

        let transport = dispatcher.into_transport();
        assert!(transport.published.is_empty());
        assert_eq!(transport.acks, vec![(1, 8)]);
    }

    #[tokio::test]
    async fn test_idle_timeout_returns_timed_out() {
        let transport = ScriptedTransport::new();
        let mut dispatcher = dispatcher(transport);

        let outcome = dispatcher
            .serve(Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(outcome, ServeOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_stop_signal() {
        let transport = ScriptedTransport::new();
        let mut dispatcher = dispatcher(transport);

        let stopper = dispatcher.stopper();
        stopper.stop();

        let outcome = dispatcher.serve(None).await.unwrap();
        assert_eq!(outcome, ServeOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_connection_failure_terminates_loop() {
        // No timeout and an exhausted script: the frame pull fails and the
        // loop surfaces the transport error.
        let transport = ScriptedTransport::new();
        let mut dispatcher = dispatcher(transport);

        let err = dispatcher.serve(None).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_multiple_deliveries_processed_in_order() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 1, "orders.created", None, None, &[b"a"]);
        transport.push_delivery(1, 2, "orders.created", None, None, &[b"b"]);
        transport.push_delivery(1, 3, "orders.created", None, None, &[b"c"]);

        let mut dispatcher = dispatcher(transport);
        dispatcher.serve(Some(Duration::from_secs(1))).await.unwrap();

        let transport = dispatcher.into_transport();
        assert_eq!(transport.acks, vec![(1, 1), (1, 2), (1, 3)]);
    }

    #[tokio::test]
    async fn test_spawned_loop_runs_on_its_own_task() {
        let mut transport = ScriptedTransport::new();
        transport.push_delivery(1, 4, "orders.created", None, None, &[b"{}"]);

        let dispatcher = dispatcher(transport);
        let handle = spawn(dispatcher, Some(Duration::from_secs(1)));

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, ServeOutcome::TimedOut);
    }
}
