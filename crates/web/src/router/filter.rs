//! Composable route filters.
//!
//! A route can hold several items for the same path; the first item whose
//! filter accepts the request handles it. Method filters are the common case,
//! header filters and closures cover the rest.
//!
//! ```
//! use http::header::CONTENT_TYPE;
//! use http::HeaderValue;
//! use wisp_web::router::filter::{all_filter, fn_filter, header, post_method};
//!
//! let mut form_post = all_filter();
//! form_post
//!     .and(post_method())
//!     .and(header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded")))
//!     .and(fn_filter(|req| req.path().starts_with("/forms")));
//! ```

use crate::RequestContext;
use http::{HeaderName, HeaderValue, Method};

/// Decides whether a route item accepts a request.
pub trait Filter: Send + Sync {
    fn matches(&self, req: &RequestContext) -> bool;
}

struct FnFilter<F: Fn(&RequestContext) -> bool>(F);

impl<F: Fn(&RequestContext) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &RequestContext) -> bool {
        (self.0)(req)
    }
}

/// Creates a filter from a closure.
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter { filters: vec![] }
}

/// Succeeds if any inner filter succeeds. An empty chain succeeds.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter { filters: vec![] }
}

/// Succeeds if every inner filter succeeds. An empty chain succeeds.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// A filter that matches the routing method of the request.
pub struct MethodFilter(Method);

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.0.eq(req.method())
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(patch_method, PATCH);

/// Creates a filter that matches a specific header value.
#[inline]
pub fn header(name: HeaderName, value: HeaderValue) -> HeaderFilter {
    HeaderFilter(name, value)
}

/// A filter that matches one header value.
pub struct HeaderFilter(HeaderName, HeaderValue);

impl Filter for HeaderFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        req.headers().get(&self.0).is_some_and(|value| self.1.eq(value))
    }
}
