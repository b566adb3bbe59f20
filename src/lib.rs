//! # routewire
//!
//! Client-side message-queue engine: frame reassembly, RPC correlation,
//! and routing-key dispatch over a broker connection.
//!
//! The crate reconstructs complete application messages out of the frame
//! stream an already-negotiated connection delivers, correlates
//! request/response exchanges over a private reply queue, and dispatches
//! each message to one of many registered handlers selected by routing
//! key through a generic chained hash table.
//!
//! ## Architecture
//!
//! - **Transport seam** ([`transport::Transport`]): the narrow interface to
//!   the protocol collaborator - frame pulls, publishes, queue operations.
//!   Wire codecs, sockets, and connection negotiation live on the other
//!   side of it.
//! - **Reassembly** ([`consume`]): method + header + N body frames become
//!   one immutable [`protocol::Message`]; heartbeats are echoed while
//!   waiting, out-of-place frames are protocol violations.
//! - **RPC** ([`rpc::RpcClient`]): sequential request/response calls with
//!   verified correlation ids over a lazily-created reply session.
//! - **Dispatch** ([`serve::Dispatcher`]): the serve loop - lookup by
//!   routing key, handler invocation, reply publication, acknowledgment -
//!   with an idle-timeout variant and a task-spawning variant.
//! - **Containers** ([`table`]): the chained hash table (and its backing
//!   list) the routing layer is built on.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use routewire::route::Router;
//! use routewire::serve::{Dispatcher, ServeConfig};
//!
//! let mut router = Router::new()?;
//! router.register("orders.created", |body: Bytes| async move {
//!     Ok(Bytes::from_static(b"ok"))
//! })?;
//!
//! let mut dispatcher = Dispatcher::new(transport, Arc::new(router), ServeConfig::default());
//! dispatcher.serve(None).await?;
//! ```

pub mod consume;
pub mod error;
pub mod protocol;
pub mod route;
pub mod rpc;
pub mod serve;
pub mod table;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use consume::{dequeue, fetch, AckMode};
pub use error::{Error, Result};
pub use protocol::{Frame, FramePayload, Message, Method, Properties};
pub use route::{RouteHandler, Router};
pub use rpc::RpcClient;
pub use serve::{Dispatcher, ServeConfig, ServeOutcome, Stopper};
pub use transport::{QueueOptions, Transport};
