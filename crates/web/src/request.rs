//! Request context handed to route handlers.
//!
//! - `RequestContext`: the decoded request, the method the route was matched with,
//!   and the path parameters
//! - `PathParams`: named segments captured from the route pattern, e.g. `id` in `/users/{id}`

use http::{HeaderMap, Method, Version};
use matchit::Params;
use wisp_http::protocol::{Params as QueryParams, Request};

/// Context of a routed request.
///
/// The lifetime parameters keep the context from outliving the router
/// (which owns the route patterns) or the request.
#[derive(Debug)]
pub struct RequestContext<'router: 'req, 'req> {
    request: &'req Request,
    method: Method,
    path_params: &'req PathParams<'router, 'req>,
}

impl<'router, 'req> RequestContext<'router, 'req> {
    pub fn new(request: &'req Request, path_params: &'req PathParams<'router, 'req>) -> Self {
        Self { request, method: request.method().clone(), path_params }
    }

    /// Same request, matched as if it had been sent with `method`.
    pub(crate) fn matched_as(&self, method: Method) -> Self {
        Self { request: self.request, method, path_params: self.path_params }
    }

    pub fn request(&self) -> &'req Request {
        self.request
    }

    /// Returns the method used for route matching.
    ///
    /// This is `GET` for a `HEAD` request served by a `GET` route; the original
    /// method stays available through [`request`](Self::request).
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &'req str {
        self.request.path()
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    pub fn headers(&self) -> &'req HeaderMap {
        self.request.headers()
    }

    pub fn query(&self) -> &'req QueryParams {
        self.request.query()
    }

    /// Returns a reference to the path parameters extracted from the request path
    pub fn path_params(&self) -> &PathParams<'router, 'req> {
        self.path_params
    }
}

/// Path parameters captured by the matched route.
#[derive(Debug, Clone)]
pub struct PathParams<'router, 'req> {
    kind: PathParamsKind<'router, 'req>,
}

#[derive(Debug, Clone)]
enum PathParamsKind<'router, 'req> {
    None,
    Params(Params<'router, 'req>),
}

impl<'router, 'req> PathParams<'router, 'req> {
    #[inline]
    fn new(params: Params<'router, 'req>) -> Self {
        if params.is_empty() {
            Self::empty()
        } else {
            Self { kind: PathParamsKind::Params(params) }
        }
    }

    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::Params(params) => params.get(key),
            PathParamsKind::None => None,
        }
    }
}

impl<'router, 'req> From<Params<'router, 'req>> for PathParams<'router, 'req> {
    fn from(params: Params<'router, 'req>) -> Self {
        PathParams::new(params)
    }
}
