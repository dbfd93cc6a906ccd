//! Server side of wisp: listener, worker pool, routing and sessions.
//!
//! ```no_run
//! use wisp_web::router::{get, Router};
//! use wisp_web::{handler_fn, MemorySessionStore, Server};
//!
//! let router = Router::builder()
//!     .route("/hello/{name}", get(handler_fn(|req, response, _session| {
//!         response.text(format!("hello {}", req.path_params().get("name").unwrap_or("world")));
//!         Ok(())
//!     })))
//!     .build()
//!     .unwrap();
//!
//! Server::builder()
//!     .address("127.0.0.1:8080")
//!     .handler(router)
//!     .session_hook(MemorySessionStore::new())
//!     .build()
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! ```

mod handler;
mod request;
mod server;
mod session;
mod shutdown;

pub mod router;

pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::RouteHandler;
pub use request::PathParams;
pub use request::RequestContext;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerConfig;
pub use server::ServerError;
pub use session::MemorySessionStore;
pub use session::DEFAULT_SESSION_COOKIE;
pub use shutdown::Shutdown;
