use std::fmt;

use wisp_http::handler::{HandlerError, Session};
use wisp_http::protocol::Response;

use crate::RequestContext;

/// Handler of a single route.
///
/// Once a route item has been selected the request counts as handled, so
/// unlike [`wisp_http::handler::RequestHandler`] there is no way to decline.
pub trait RouteHandler: Send + Sync {
    fn invoke(&self, req: &RequestContext, response: &mut Response, session: Option<&mut Session>)
        -> Result<(), HandlerError>;
}

/// A route handler backed by a closure, see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F> RouteHandler for FnHandler<F>
where
    F: Fn(&RequestContext, &mut Response, Option<&mut Session>) -> Result<(), HandlerError> + Send + Sync,
{
    fn invoke(&self, req: &RequestContext, response: &mut Response, session: Option<&mut Session>)
        -> Result<(), HandlerError> {
        (self.f)(req, response, session)
    }
}

/// Turns a closure into a [`RouteHandler`].
///
/// ```
/// use wisp_web::handler_fn;
///
/// let show_user = handler_fn(|req, response, _session| {
///     let id = req.path_params().get("id").unwrap_or_default();
///     response.text(format!("user {id}"));
///     Ok(())
/// });
/// # let _: &dyn wisp_web::RouteHandler = &show_user;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext, &mut Response, Option<&mut Session>) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { f }
}
