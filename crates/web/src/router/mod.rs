//! Route table.
//!
//! Paths are matched with [`matchit`] (`/users/{id}`, `/static/{*file}`). Each
//! path holds an ordered list of items; the first item whose [`Filter`]
//! accepts the request handles it. A `HEAD` request nobody accepts is retried
//! as `GET`, so every `GET` route also answers `HEAD`.
//!
//! ```
//! use wisp_web::router::{get, post, Router};
//! use wisp_web::handler_fn;
//!
//! let router = Router::builder()
//!     .route("/users/{id}", get(handler_fn(|req, response, _| {
//!         response.text(format!("user {}", req.path_params().get("id").unwrap_or_default()));
//!         Ok(())
//!     })))
//!     .route("/users", post(handler_fn(|_, response, _| {
//!         response.set_status(http::StatusCode::CREATED);
//!         Ok(())
//!     })))
//!     .build()
//!     .unwrap();
//! # let _ = router;
//! ```

pub mod filter;

use std::collections::HashMap;
use std::fmt;

use filter::{AllFilter, Filter};
use http::Method;
use thiserror::Error;
use tracing::trace;
use wisp_http::handler::{HandlerError, RequestHandler, Session};
use wisp_http::protocol::{Request, Response};

use crate::{PathParams, RequestContext, RouteHandler};

type RouterFilter = dyn Filter + Send + Sync + 'static;
type InnerRouter<T> = matchit::Router<T>;

/// Routes requests to [`RouteHandler`]s; implements [`RequestHandler`].
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
}

/// A router item containing a filter and handler
pub struct RouterItem {
    filter: Box<RouterFilter>,
    handler: Box<dyn RouteHandler>,
}

/// Result of matching a path, the candidate items and the path parameters
pub struct RouteResult<'router, 'req> {
    router_items: &'router [RouterItem],
    params: PathParams<'router, 'req>,
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route '{path}': {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches a path against the router's routes
    pub fn at<'router, 'req>(&'router self, path: &'req str) -> RouteResult<'router, 'req> {
        match self.inner_router.at(path) {
            Ok(matched) => RouteResult { router_items: matched.value.as_slice(), params: matched.params.into() },
            Err(e) => {
                trace!(path, cause = %e, "no route");
                RouteResult::empty()
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl RequestHandler for Router {
    fn handle(&self, request: &Request, response: &mut Response, session: Option<&mut Session>)
        -> Result<bool, HandlerError> {
        let route = self.at(request.path());
        if route.is_empty() {
            return Ok(false);
        }

        let context = RequestContext::new(request, route.params());
        if let Some(item) = route.select(&context) {
            item.handler().invoke(&context, response, session)?;
            return Ok(true);
        }

        if request.is_head() {
            let context = context.matched_as(Method::GET);
            if let Some(item) = route.select(&context) {
                item.handler().invoke(&context, response, session)?;
                return Ok(true);
            }
        }

        trace!(method = %request.method(), path = request.path(), "no route item accepted the request");
        Ok(false)
    }
}

impl RouterItem {
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }
}

impl<'router, 'req> RouteResult<'router, 'req> {
    fn empty() -> Self {
        Self { router_items: &[], params: PathParams::empty() }
    }

    /// Returns true if no routes were matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router_items.is_empty()
    }

    pub fn params(&self) -> &PathParams<'router, 'req> {
        &self.params
    }

    pub fn router_items(&self) -> &'router [RouterItem] {
        self.router_items
    }

    /// First item whose filter accepts `context`.
    pub fn select(&self, context: &RequestContext) -> Option<&'router RouterItem> {
        self.router_items.iter().find(|item| item.filter.matches(context))
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    data: HashMap<String, Vec<RouterItemBuilder>>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("routes", &self.data.len()).finish()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Default::default()
    }

    /// Appends an item to `route`. Items of one route are tried in insertion order.
    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.data.entry(route.into()).or_default().push(item_builder);
        self
    }

    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRoute`] for malformed or conflicting patterns.
    pub fn build(self) -> Result<Router, RouterError> {
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            let router_items = items.into_iter().map(RouterItemBuilder::build).collect::<Vec<_>>();
            inner_router
                .insert(path.clone(), router_items)
                .map_err(|source| RouterError::InvalidRoute { path, source })?;
        }

        Ok(Router { inner_router })
    }
}

macro_rules! method_router_filter {
    ($method:ident, $method_name:ident) => {
        #[doc = concat!("Route item accepting `", stringify!($method), "` requests.")]
        pub fn $method<H: RouteHandler + 'static>(handler: H) -> RouterItemBuilder {
            let mut filters = filter::all_filter();
            filters.and(filter::$method_name());
            RouterItemBuilder { filters, handler: Box::new(handler) }
        }
    };
}

method_router_filter!(get, get_method);
method_router_filter!(post, post_method);
method_router_filter!(put, put_method);
method_router_filter!(delete, delete_method);
method_router_filter!(head, head_method);
method_router_filter!(options, options_method);
method_router_filter!(patch, patch_method);

/// Route item accepting every method.
pub fn any<H: RouteHandler + 'static>(handler: H) -> RouterItemBuilder {
    RouterItemBuilder { filters: filter::all_filter(), handler: Box::new(handler) }
}

pub struct RouterItemBuilder {
    filters: AllFilter,
    handler: Box<dyn RouteHandler>,
}

impl RouterItemBuilder {
    /// Narrows the item with an additional filter.
    pub fn with<F: Filter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    fn build(self) -> RouterItem {
        RouterItem { filter: Box::new(self.filters), handler: self.handler }
    }
}
