//! Request handler and session traits.
//!
//! A connection hands every decoded [`Request`] to a [`RequestHandler`] together
//! with a mutable [`Response`] and, when a [`SessionHook`] is configured, the
//! [`Session`] of the client.
//!
//! The handler's return value decides what is written back:
//!
//! - `Ok(true)`: the filled in response
//! - `Ok(false)`: the request was not handled, a stock `404 Not Found`
//! - `Err(_)` or a panic: a stock `500 Internal Server Error`
//!
//! Handlers compose: [`handler_fn`] wraps a closure, [`HandlerChain`] tries a
//! list of handlers in order until one of them handles the request.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::protocol::{Request, Response};

/// Error returned by a failing handler. It is logged, never sent to the client.
pub type HandlerError = Box<dyn Error + Send + Sync>;

pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &Request, response: &mut Response, session: Option<&mut Session>)
        -> Result<bool, HandlerError>;
}

impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    fn handle(&self, request: &Request, response: &mut Response, session: Option<&mut Session>)
        -> Result<bool, HandlerError> {
        (**self).handle(request, response, session)
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    fn handle(&self, request: &Request, response: &mut Response, session: Option<&mut Session>)
        -> Result<bool, HandlerError> {
        (**self).handle(request, response, session)
    }
}

/// A [`RequestHandler`] backed by a closure, see [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

impl<F> RequestHandler for HandlerFn<F>
where
    F: Fn(&Request, &mut Response, Option<&mut Session>) -> Result<bool, HandlerError> + Send + Sync,
{
    fn handle(&self, request: &Request, response: &mut Response, session: Option<&mut Session>)
        -> Result<bool, HandlerError> {
        (self.f)(request, response, session)
    }
}

/// Creates a handler from a closure.
///
/// ```
/// use wisp_http::handler::{handler_fn, RequestHandler};
///
/// let hello = handler_fn(|request, response, _session| {
///     if request.path() != "/hello" {
///         return Ok(false);
///     }
///     response.text("hello");
///     Ok(true)
/// });
/// # let _: &dyn RequestHandler = &hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Request, &mut Response, Option<&mut Session>) -> Result<bool, HandlerError> + Send + Sync,
{
    HandlerFn { f }
}

/// Ordered list of handlers, the first one returning `Ok(true)` wins.
///
/// An error stops the chain immediately.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn RequestHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.push(handler);
        self
    }

    pub fn push<H: RequestHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain").field("handlers", &self.handlers.len()).finish()
    }
}

impl RequestHandler for HandlerChain {
    fn handle(&self, request: &Request, response: &mut Response, mut session: Option<&mut Session>)
        -> Result<bool, HandlerError> {
        for handler in &self.handlers {
            if handler.handle(request, response, session.as_deref_mut())? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Per client state carried between requests through the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: String,
    data: HashMap<String, String>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), data: HashMap::new() }
    }

    pub fn with_data(id: impl Into<String>, data: HashMap<String, String>) -> Self {
        Self { id: id.into(), data }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub fn into_parts(self) -> (String, HashMap<String, String>) {
        (self.id, self.data)
    }
}

/// Loads a session before dispatch and persists it afterwards.
///
/// `close` is called once for every `open`, whether the handler handled the
/// request, declined it, failed or panicked. It sees the handler's response;
/// a stock `404` or `500` replaces that response afterwards.
#[cfg_attr(test, mockall::automock)]
pub trait SessionHook: Send + Sync {
    /// Looks up the session of `request`, creating a new one when the client has none.
    fn open(&self, request: &Request) -> Session;

    /// Persists `session` and records its id on `response`, typically as a `Set-Cookie` header.
    fn close(&self, response: &mut Response, session: Session);
}

impl<S: SessionHook + ?Sized> SessionHook for Arc<S> {
    fn open(&self, request: &Request) -> Session {
        (**self).open(request)
    }

    fn close(&self, response: &mut Response, session: Session) {
        (**self).close(response, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ParseStatus, RequestParser};

    fn request(path: &str) -> Request {
        let mut parser = RequestParser::new();
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert_eq!(parser.parse(raw.as_bytes()), ParseStatus::Good);
        parser.decode().unwrap()
    }

    fn prefix(prefix: &'static str, body: &'static str) -> impl RequestHandler {
        handler_fn(move |request, response, _session| {
            if !request.path().starts_with(prefix) {
                return Ok(false);
            }
            response.text(body);
            Ok(true)
        })
    }

    #[test]
    fn chain_first_match_wins() {
        let chain = HandlerChain::new().with(prefix("/api", "api")).with(prefix("/", "fallback"));

        let mut response = Response::new();
        assert!(chain.handle(&request("/api/users"), &mut response, None).unwrap());
        assert_eq!(&response.body()[..], b"api");

        let mut response = Response::new();
        assert!(chain.handle(&request("/index.html"), &mut response, None).unwrap());
        assert_eq!(&response.body()[..], b"fallback");
    }

    #[test]
    fn chain_declines_when_nothing_matches() {
        let chain = HandlerChain::new().with(prefix("/api", "api"));
        let mut response = Response::new();
        assert!(!chain.handle(&request("/other"), &mut response, None).unwrap());
        assert!(response.body().is_empty());
    }

    #[test]
    fn chain_stops_on_error() {
        let chain = HandlerChain::new()
            .with(handler_fn(|_, _, _| Err("database down".into())))
            .with(prefix("/", "unreachable"));
        let mut response = Response::new();
        let error = chain.handle(&request("/"), &mut response, None).unwrap_err();
        assert_eq!(error.to_string(), "database down");
        assert!(response.body().is_empty());
    }

    #[test]
    fn chain_passes_session_along() {
        let chain = HandlerChain::new().with(handler_fn(|_, _, session| {
            if let Some(session) = session {
                session.insert("seen", "yes");
            }
            Ok(false)
        }));

        let mut session = Session::new("abc");
        let handled = chain.handle(&request("/"), &mut Response::new(), Some(&mut session)).unwrap();
        assert!(!handled);
        assert_eq!(session.get("seen"), Some("yes"));
    }

    #[test]
    fn session_accessors() {
        let mut session = Session::new("id-1");
        assert_eq!(session.insert("user", "alice"), None);
        assert_eq!(session.insert("user", "bob"), Some("alice".to_string()));
        assert_eq!(session.get("user"), Some("bob"));
        assert_eq!(session.remove("user"), Some("bob".to_string()));
        assert!(session.data().is_empty());
        assert_eq!(session.into_parts().0, "id-1");
    }
}
