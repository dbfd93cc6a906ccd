//! HTTP response under construction.
//!
//! Handlers receive a `&mut Response` and fill in status, headers and body. The
//! connection calls [`Response::finalize`] right before serialization so that
//! `Content-Length` always matches the body that is about to be written.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};

use crate::protocol::ParseError;

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::with_status(StatusCode::OK)
    }
}

impl Response {
    /// Creates an empty `200 OK` response.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous values of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidHeader`] if the name or value is not a valid header token.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Adds a header value without removing existing ones, e.g. several `Set-Cookie` lines.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidHeader`] if the name or value is not a valid header token.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body and updates `Content-Type` and `Content-Length` accordingly.
    pub fn set_body(&mut self, body: impl Into<Bytes>, content_type: &'static str) {
        self.body = body.into();
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
    }

    /// Writes an HTML body.
    pub fn html(&mut self, body: impl Into<Bytes>) {
        self.set_body(body, mime::TEXT_HTML_UTF_8.as_ref());
    }

    /// Writes a plain text body.
    pub fn text(&mut self, body: impl Into<Bytes>) {
        self.set_body(body, mime::TEXT_PLAIN_UTF_8.as_ref());
    }

    /// Turns this response into a `302` redirect to `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidHeader`] if `location` can't be used as a header value.
    pub fn redirect(&mut self, location: &str) -> Result<(), ParseError> {
        let value = HeaderValue::from_str(location).map_err(ParseError::invalid_header)?;
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, value);
        self.body = Bytes::new();
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0usize));
        Ok(())
    }

    /// Makes `Content-Length` reflect the final body size.
    ///
    /// Handlers may have touched the body or header map directly; the
    /// connection calls this once before the response is serialized.
    pub fn finalize(&mut self) {
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ParseError> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(ParseError::invalid_header)?;
    let value = HeaderValue::from_str(value).map_err(ParseError::invalid_header)?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_body_keeps_length_in_sync() {
        let mut response = Response::new();
        response.text("hello");
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");

        response.html("<p>hello world</p>");
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "18");
    }

    #[test]
    fn finalize_overrides_stale_length() {
        let mut response = Response::new();
        response.set_header("Content-Length", "1000").unwrap();
        response.finalize();
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "0");
    }

    #[test]
    fn append_header_keeps_previous_values() {
        let mut response = Response::new();
        response.append_header("Set-Cookie", "a=1").unwrap();
        response.append_header("Set-Cookie", "b=2").unwrap();
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);

        response.set_header("set-cookie", "c=3").unwrap();
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 1);
    }

    #[test]
    fn invalid_header_is_rejected() {
        let mut response = Response::new();
        assert!(matches!(response.set_header("bad name", "x"), Err(ParseError::InvalidHeader { .. })));
        assert!(matches!(response.set_header("X-Ok", "line\nbreak"), Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn redirect_sets_location() {
        let mut response = Response::new();
        response.text("ignored");
        response.redirect("/login").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
        assert!(response.body().is_empty());
    }
}
