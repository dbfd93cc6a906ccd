//! HTTP connection handling module
//!
//! This module runs accepted sockets through the request/response cycle and
//! keeps track of the connections that are still alive.
//!
//! # Components
//!
//! - [`HttpConnection`]: one client, one request. Reads until the request is
//!   complete, dispatches it, writes the response and closes.
//! - [`Dispatcher`]: runs the request handler and session hook, converting
//!   handler failures into stock responses.
//! - [`ConnectionManager`]: registry of live connections with individual and
//!   bulk shutdown.
//! - [`ConnectionHandle`]: cloneable close switch shared between a connection
//!   and the registry.
//!
//! # Example
//!
//! ```no_run
//! use wisp_http::connection::{ConnectionManager, Dispatcher, HttpConnection};
//! use wisp_http::handler::handler_fn;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! let manager = ConnectionManager::new();
//! let dispatcher = Dispatcher::new(handler_fn(|_request, response, _session| {
//!     response.text("hello");
//!     Ok(true)
//! }));
//!
//! loop {
//!     let (stream, peer_addr) = listener.accept().await?;
//!     let (reader, writer) = stream.into_split();
//!     let connection = HttpConnection::accepted(reader, writer, dispatcher.clone(), manager.clone(), peer_addr);
//!     tokio::spawn(manager.register(connection));
//! }
//! # }
//! ```

mod dispatch;
mod handle;
mod http_connection;
mod manager;

pub use dispatch::DispatchMode;
pub use dispatch::Dispatcher;
pub use handle::ConnectionHandle;
pub use handle::ConnectionId;
pub use http_connection::ConnectionState;
pub use http_connection::HttpConnection;
pub use manager::ConnectionManager;
