//! Routing table - maps routing keys to handlers.
//!
//! The route set is built once at startup, wrapped in an `Arc`, and looked
//! up concurrently by every serve loop without locking. Handlers are
//! byte-in/byte-out: they receive the message body and return the response
//! body (empty = no response).
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use routewire::route::Router;
//!
//! let mut router = Router::new()?;
//! router.register("orders.created", |body: Bytes| async move {
//!     Ok(Bytes::from_static(b"ok"))
//! })?;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::table::{ChainedTable, Keyed};

/// Default number of buckets in the routing table.
pub const DEFAULT_ROUTE_BUCKETS: usize = 257;

/// Result type for handler functions: the response body, empty for none.
pub type HandlerResult = Result<Bytes>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for route handlers.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle a message body, producing the response body. An empty
    /// response means the handler has nothing to reply.
    fn call(&self, body: Bytes) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper turning an async closure into a [`RouteHandler`].
pub struct FnHandler<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Wrap a closure.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> RouteHandler for FnHandler<F, Fut>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, body: Bytes) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(body))
    }
}

/// One registered route. Immutable once inserted.
pub struct Route {
    key: String,
    name: String,
    handler: Box<dyn RouteHandler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Routing key the route is stored under.
    pub fn routing_key(&self) -> &str {
        &self.key
    }

    /// Handler name, for logging. Defaults to the routing key unless the
    /// route was registered under a separate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the bound handler.
    pub fn handle(&self, body: Bytes) -> BoxFuture<'static, HandlerResult> {
        self.handler.call(body)
    }
}

impl Keyed for Route {
    type Key = str;

    fn key(&self) -> &str {
        &self.key
    }
}

/// Multiplier-31 byte hash over the routing key.
fn route_hash(key: &str) -> u64 {
    key.bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64))
}

fn route_eq(a: &str, b: &str) -> bool {
    a == b
}

/// Routing-key -> handler table.
pub struct Router {
    table: ChainedTable<Route>,
}

impl Router {
    /// Create a router with the default bucket count.
    pub fn new() -> Result<Self> {
        Self::with_buckets(DEFAULT_ROUTE_BUCKETS)
    }

    /// Create a router with an explicit bucket count.
    pub fn with_buckets(buckets: usize) -> Result<Self> {
        let table = ChainedTable::new(buckets, route_hash, route_eq)?;
        Ok(Self { table })
    }

    /// Register an async closure under a routing key. The handler name
    /// defaults to the key.
    pub fn register<F, Fut>(&mut self, routing_key: &str, handler: F) -> Result<()>
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(routing_key, routing_key, Box::new(FnHandler::new(handler)))
    }

    /// Register a pre-built handler under a routing key with a separate
    /// handler name (the shape produced by an external handler loader).
    pub fn register_handler(
        &mut self,
        routing_key: &str,
        name: &str,
        handler: Box<dyn RouteHandler>,
    ) -> Result<()> {
        self.table
            .insert(Route {
                key: routing_key.to_string(),
                name: name.to_string(),
                handler,
            })
            .map_err(Error::from)
    }

    /// Look up the route registered under a key.
    pub fn lookup(&self, routing_key: &str) -> Option<&Route> {
        self.table.lookup(routing_key)
    }

    /// Whether a route is registered under a key.
    pub fn contains(&self, routing_key: &str) -> bool {
        self.table.contains(routing_key)
    }

    /// Unregister and return the route under a key.
    pub fn remove(&mut self, routing_key: &str) -> Result<Route> {
        self.table.remove(routing_key).map_err(Error::from)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Visit every registered route. Used at startup to create one queue
    /// binding per routing key.
    pub fn for_each<F>(&self, visitor: F)
    where
        F: FnMut(&Route),
    {
        self.table.traverse(visitor);
    }
}
