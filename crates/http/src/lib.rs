//! The asynchronous HTTP/1.1 connection pipeline of wisp
//!
//! Each accepted socket is served by one [`connection::HttpConnection`] that
//! reads a single request, hands it to a [`handler::RequestHandler`], writes
//! the response and closes. A [`connection::ConnectionManager`] keeps track of
//! the live connections so they can be stopped one by one or all at once.
//!
//! # Example
//!
//! ```no_run
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use wisp_http::connection::{ConnectionManager, Dispatcher, HttpConnection};
//! use wisp_http::handler::handler_fn;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let manager = ConnectionManager::new();
//!     let dispatcher = Dispatcher::new(handler_fn(|request, response, _session| {
//!         info!(path = request.path(), "hello");
//!         response.text("Hello World!\r\n");
//!         Ok(true)
//!     }));
//!
//!     loop {
//!         let (tcp_stream, peer_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let (reader, writer) = tcp_stream.into_split();
//!         let connection = HttpConnection::accepted(reader, writer, dispatcher.clone(), manager.clone(), peer_addr);
//!         tokio::spawn(manager.register(connection));
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the incremental [`codec::RequestParser`], its tokio-util
//!   decoder adapter and the [`codec::ResponseSerializer`]
//! - [`protocol`]: [`protocol::Request`], [`protocol::Response`], stock replies and errors
//! - [`handler`]: the [`handler::RequestHandler`] and [`handler::SessionHook`] traits
//! - [`connection`]: per connection state machine, dispatch boundary and registry
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: the request could not be read or understood
//! - [`protocol::SendError`]: the response could not be written
//! - [`protocol::HttpError`]: either of the above, returned by `HttpConnection::process`
//!
//! Clients only ever see stock `400`, `404` and `500` responses; error details
//! go to the log.
//!
//! # Limitations
//!
//! - One request per connection, no keep-alive
//! - `Content-Length` bodies only, chunked requests are rejected
//! - No TLS
//! - Default limits: 8 KiB of headers, 64 header lines, 8 MiB of body

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
