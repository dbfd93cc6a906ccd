//! Decoded HTTP request.
//!
//! A [`Request`] is only ever produced by [`RequestParser::decode`](crate::codec::RequestParser::decode)
//! after the parser reached its terminal state, so every instance a handler sees is complete.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Version};

/// Name to value map used for query parameters, cookies and form fields.
///
/// Duplicated names keep the last value.
pub type Params = HashMap<String, String>;

/// A fully decoded HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Params,
    version: Version,
    headers: HeaderMap,
    cookies: Params,
    form: Params,
    body: Bytes,
}

/// Decoded pieces assembled by the parser before being frozen into a [`Request`].
#[derive(Debug)]
pub(crate) struct RequestParts {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Params,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: Params,
    pub(crate) form: Params,
    pub(crate) body: Bytes,
}

impl From<RequestParts> for Request {
    fn from(parts: RequestParts) -> Self {
        let RequestParts { method, path, query, version, headers, cookies, form, body } = parts;
        Self { method, path, query, version, headers, cookies, form, body }
    }
}

impl Request {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns true for `HEAD` requests, whose responses carry no body bytes.
    #[inline]
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Returns the request path without the query segment.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the decoded query parameters.
    pub fn query(&self) -> &Params {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as text, if present and visible ASCII.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the cookies sent with the request.
    pub fn cookies(&self) -> &Params {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns the fields of an `application/x-www-form-urlencoded` body.
    ///
    /// Empty for any other content type.
    pub fn form(&self) -> &Params {
        &self.form
    }

    pub fn form_param(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
