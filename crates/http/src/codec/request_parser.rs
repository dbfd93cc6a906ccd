//! Incremental HTTP/1.x request parser.
//!
//! [`RequestParser`] is a byte-wise state machine. Each call to [`RequestParser::parse`]
//! feeds whatever bytes the last read produced and returns a [`ParseStatus`]:
//!
//! - [`ParseStatus::Indeterminate`]: every byte was accepted, more are needed
//! - [`ParseStatus::Good`]: the request line, headers and body are complete
//! - [`ParseStatus::Bad`]: a byte violated the grammar or a limit was exceeded
//!
//! Progress is kept inside the parser, so the caller may reuse its read buffer
//! between calls. Token bytes are copied into an internal head buffer and
//! recorded as index ranges; [`RequestParser::decode`] turns those ranges into
//! a structured [`Request`] once parsing is `Good`.
//!
//! # Limits
//!
//! See [`ParseLimits`]. The head limit also bounds how long a request line or
//! header line without its CRLF terminator can grow, so malformed input always
//! ends in `Bad`.

use std::ops::Range;

use bytes::BytesMut;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, Method, Uri, Version};
use tracing::trace;

use crate::ensure;
use crate::protocol::{Params, ParseError, Request, RequestParts};

/// Default maximum size in bytes of the request line plus headers
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default maximum number of header lines
pub const DEFAULT_MAX_HEADERS: usize = 64;

/// Default maximum body size in bytes
pub const DEFAULT_MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

/// Tri-state outcome of feeding bytes to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// More bytes are needed.
    Indeterminate,
    /// The request is complete and can be decoded.
    Good,
    /// The input is invalid; the parser will not accept more bytes.
    Bad,
}

/// Size limits enforced while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_header_bytes: usize,
    pub max_headers: usize,
    pub max_body_bytes: u64,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_headers: DEFAULT_MAX_HEADERS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    MethodStart,
    Method,
    UriStart,
    Uri,
    Query,
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    VersionMajorStart,
    VersionMajor,
    VersionMinorStart,
    VersionMinor,
    ExpectingNewline1,
    HeaderLineStart,
    HeaderLws,
    HeaderName,
    SpaceBeforeHeaderValue,
    HeaderValue,
    ExpectingNewline2,
    ExpectingNewline3,
    Body,
    Done,
    Failed,
}

/// Byte ranges of one header's name and value inside the head buffer.
#[derive(Debug, Clone)]
struct HeaderIndex {
    name: Range<usize>,
    value: Range<usize>,
}

/// Incremental request parser, see the [module documentation](self).
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    limits: ParseLimits,
    head: BytesMut,
    method: Range<usize>,
    path: Range<usize>,
    query: Range<usize>,
    version: (u8, u8),
    headers: Vec<HeaderIndex>,
    content_length: Option<u64>,
    body: BytesMut,
    head_bytes: usize,
    consumed: usize,
    error: Option<ParseError>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::with_limits(ParseLimits::default())
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self {
            state: State::MethodStart,
            limits,
            head: BytesMut::with_capacity(512),
            method: 0..0,
            path: 0..0,
            query: 0..0,
            version: (0, 0),
            headers: Vec::new(),
            content_length: None,
            body: BytesMut::new(),
            head_bytes: 0,
            consumed: 0,
            error: None,
        }
    }

    /// Total number of bytes accepted over all calls to [`parse`](Self::parse).
    ///
    /// The byte that turned the parser `Bad` is not counted, and neither is
    /// anything following the end of a `Good` request.
    pub fn bytes_consumed(&self) -> usize {
        self.consumed
    }

    /// The reason the parser went `Bad`, if it did.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<ParseError> {
        self.error.take()
    }

    /// The `Content-Length` seen so far, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Number of body bytes received so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Feeds `input` to the state machine.
    ///
    /// Once `Good` or `Bad` is returned, the parser is finished: further calls
    /// consume nothing and report the same status again.
    pub fn parse(&mut self, input: &[u8]) -> ParseStatus {
        let mut offset = 0;
        while offset < input.len() {
            match self.state {
                State::Done => return ParseStatus::Good,
                State::Failed => return ParseStatus::Bad,
                State::Body => {
                    offset += self.consume_body(&input[offset..]);
                }
                _ => {
                    if let Err(e) = self.consume_head(input[offset]) {
                        trace!(cause = %e, offset = self.consumed, "request parse failed");
                        self.state = State::Failed;
                        self.error = Some(e);
                        return ParseStatus::Bad;
                    }
                    offset += 1;
                    self.consumed += 1;
                }
            }
        }

        match self.state {
            State::Done => ParseStatus::Good,
            State::Failed => ParseStatus::Bad,
            _ => ParseStatus::Indeterminate,
        }
    }

    fn consume_body(&mut self, input: &[u8]) -> usize {
        let expected = self.content_length.unwrap_or(0);
        let remaining = expected - self.body.len() as u64;
        let take = usize::try_from(remaining).map_or(input.len(), |remaining| remaining.min(input.len()));

        self.body.extend_from_slice(&input[..take]);
        self.consumed += take;
        if self.body.len() as u64 == expected {
            self.state = State::Done;
        }
        take
    }

    fn consume_head(&mut self, byte: u8) -> Result<(), ParseError> {
        self.head_bytes += 1;
        ensure!(
            self.head_bytes <= self.limits.max_header_bytes,
            ParseError::too_large_header(self.head_bytes, self.limits.max_header_bytes)
        );

        match self.state {
            State::MethodStart => {
                ensure!(is_token(byte), ParseError::malformed("invalid method"));
                self.method = self.push_token(byte)..self.head.len();
                self.state = State::Method;
            }
            State::Method => {
                if byte == b' ' {
                    self.state = State::UriStart;
                } else {
                    ensure!(is_token(byte), ParseError::malformed("invalid method"));
                    self.push(byte);
                    self.method.end = self.head.len();
                }
            }
            State::UriStart => {
                ensure!(!is_ctl(byte) && byte != b' ' && byte != b'?', ParseError::malformed("invalid uri"));
                self.path = self.push_token(byte)..self.head.len();
                self.state = State::Uri;
            }
            State::Uri => match byte {
                b' ' => self.state = State::VersionH,
                b'?' => {
                    self.query = self.head.len()..self.head.len();
                    self.state = State::Query;
                }
                _ => {
                    ensure!(!is_ctl(byte), ParseError::malformed("invalid uri"));
                    self.push(byte);
                    self.path.end = self.head.len();
                }
            },
            State::Query => {
                if byte == b' ' {
                    self.state = State::VersionH;
                } else {
                    ensure!(!is_ctl(byte), ParseError::malformed("invalid query"));
                    self.push(byte);
                    self.query.end = self.head.len();
                }
            }
            State::VersionH => self.expect(byte, b'H', State::VersionT1)?,
            State::VersionT1 => self.expect(byte, b'T', State::VersionT2)?,
            State::VersionT2 => self.expect(byte, b'T', State::VersionP)?,
            State::VersionP => self.expect(byte, b'P', State::VersionSlash)?,
            State::VersionSlash => self.expect(byte, b'/', State::VersionMajorStart)?,
            State::VersionMajorStart => {
                ensure!(byte.is_ascii_digit(), ParseError::malformed("invalid version"));
                self.version.0 = byte - b'0';
                self.state = State::VersionMajor;
            }
            State::VersionMajor => {
                if byte == b'.' {
                    self.state = State::VersionMinorStart;
                } else {
                    self.version.0 = push_digit(self.version.0, byte)?;
                }
            }
            State::VersionMinorStart => {
                ensure!(byte.is_ascii_digit(), ParseError::malformed("invalid version"));
                self.version.1 = byte - b'0';
                self.state = State::VersionMinor;
            }
            State::VersionMinor => {
                if byte == b'\r' {
                    self.state = State::ExpectingNewline1;
                } else {
                    self.version.1 = push_digit(self.version.1, byte)?;
                }
            }
            State::ExpectingNewline1 => self.expect(byte, b'\n', State::HeaderLineStart)?,
            State::HeaderLineStart => {
                if byte == b'\r' {
                    self.state = State::ExpectingNewline3;
                } else if !self.headers.is_empty() && (byte == b' ' || byte == b'\t') {
                    self.state = State::HeaderLws;
                } else {
                    ensure!(is_token(byte), ParseError::malformed("invalid header name"));
                    ensure!(
                        self.headers.len() < self.limits.max_headers,
                        ParseError::too_many_headers(self.limits.max_headers)
                    );
                    let start = self.push_token(byte);
                    let end = self.head.len();
                    self.headers.push(HeaderIndex { name: start..end, value: end..end });
                    self.state = State::HeaderName;
                }
            }
            State::HeaderLws => match byte {
                b'\r' => self.state = State::ExpectingNewline2,
                b' ' | b'\t' => {}
                _ => {
                    ensure!(!is_ctl(byte), ParseError::malformed("invalid header value"));
                    // folded continuation: join with a single space
                    if !self.current_header().value.is_empty() {
                        self.push(b' ');
                    }
                    self.push_value(byte);
                    self.state = State::HeaderValue;
                }
            },
            State::HeaderName => {
                if byte == b':' {
                    let end = self.head.len();
                    self.current_header().value = end..end;
                    self.state = State::SpaceBeforeHeaderValue;
                } else {
                    ensure!(is_token(byte), ParseError::malformed("invalid header name"));
                    self.push(byte);
                    self.current_header().name.end = self.head.len();
                }
            }
            State::SpaceBeforeHeaderValue => match byte {
                b' ' | b'\t' => {}
                b'\r' => self.state = State::ExpectingNewline2,
                _ => {
                    ensure!(!is_ctl(byte), ParseError::malformed("invalid header value"));
                    self.push_value(byte);
                    self.state = State::HeaderValue;
                }
            },
            State::HeaderValue => {
                if byte == b'\r' {
                    self.state = State::ExpectingNewline2;
                } else {
                    ensure!(!is_ctl(byte) || byte == b'\t', ParseError::malformed("invalid header value"));
                    self.push_value(byte);
                }
            }
            State::ExpectingNewline2 => {
                ensure!(byte == b'\n', ParseError::malformed("expect LF after header line"));
                self.check_framing_header()?;
                self.state = State::HeaderLineStart;
            }
            State::ExpectingNewline3 => {
                ensure!(byte == b'\n', ParseError::malformed("expect LF after headers"));
                self.state = match self.content_length {
                    Some(length) if length > 0 => State::Body,
                    _ => State::Done,
                };
            }
            State::Body | State::Done | State::Failed => unreachable!("not a head state"),
        }
        Ok(())
    }

    /// Validates `Content-Length` / `Transfer-Encoding` as soon as the header line ends.
    fn check_framing_header(&mut self) -> Result<(), ParseError> {
        let index = self.headers.last().cloned().ok_or(ParseError::malformed("missing header"))?;
        let name = &self.head[index.name.clone()];

        if name.eq_ignore_ascii_case(b"transfer-encoding") {
            return Err(ParseError::malformed("transfer-encoding is not supported"));
        }

        if !name.eq_ignore_ascii_case(b"content-length") {
            return Ok(());
        }

        let value = self.head[index.value].trim_ascii();
        ensure!(
            !value.is_empty() && value.iter().all(u8::is_ascii_digit),
            ParseError::invalid_content_length(format!("value {} is not u64", String::from_utf8_lossy(value)))
        );
        let length = value
            .iter()
            .try_fold(0u64, |acc, digit| acc.checked_mul(10)?.checked_add(u64::from(digit - b'0')))
            .ok_or_else(|| ParseError::invalid_content_length("value overflows u64"))?;

        if let Some(previous) = self.content_length {
            ensure!(previous == length, ParseError::invalid_content_length("conflicting values"));
        }
        ensure!(length <= self.limits.max_body_bytes, ParseError::too_large_body(length, self.limits.max_body_bytes));

        self.content_length = Some(length);
        Ok(())
    }

    #[inline]
    fn expect(&mut self, byte: u8, expected: u8, next: State) -> Result<(), ParseError> {
        ensure!(byte == expected, ParseError::malformed("unexpected byte in request line"));
        self.state = next;
        Ok(())
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.head.extend_from_slice(&[byte]);
    }

    /// Pushes the first byte of a new token and returns where it starts.
    #[inline]
    fn push_token(&mut self, byte: u8) -> usize {
        let start = self.head.len();
        self.push(byte);
        start
    }

    #[inline]
    fn push_value(&mut self, byte: u8) {
        self.push(byte);
        let end = self.head.len();
        self.current_header().value.end = end;
    }

    fn current_header(&mut self) -> &mut HeaderIndex {
        // header states are only reachable after a header index was pushed
        let last = self.headers.len() - 1;
        &mut self.headers[last]
    }

    /// Converts the recorded token ranges into a [`Request`].
    ///
    /// # Errors
    ///
    /// - [`ParseError::Malformed`] if parsing has not reached `Good`
    /// - [`ParseError::InvalidVersion`] for anything but HTTP/1.0 and HTTP/1.1
    /// - [`ParseError::InvalidUri`] if the target is not a valid URI
    /// - [`ParseError::InvalidHeader`] if a header name or value is not valid
    /// - [`ParseError::InvalidEncoding`] if query, cookies or form fields can't be decoded
    pub fn decode(self) -> Result<Request, ParseError> {
        ensure!(self.state == State::Done, ParseError::malformed("request is not complete"));

        let head = self.head.freeze();

        let method = Method::from_bytes(&head[self.method.clone()]).map_err(|_e| ParseError::malformed("invalid method"))?;

        let version = match self.version {
            (1, 0) => Version::HTTP_10,
            (1, 1) => Version::HTTP_11,
            (major, minor) => return Err(ParseError::InvalidVersion { major, minor }),
        };

        let path = decode_path(&head[self.path.clone()])?;
        let query = parse_params(&head[self.query.clone()])?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        let mut cookies = Params::new();
        for index in &self.headers {
            let name = HeaderName::from_bytes(&head[index.name.clone()]).map_err(ParseError::invalid_header)?;
            let value_range = trim_range(&head, index.value.clone());
            let value = HeaderValue::from_maybe_shared(head.slice(value_range)).map_err(ParseError::invalid_header)?;

            // every Cookie line contributes, even though the header map keeps only the last
            if name == header::COOKIE {
                parse_cookies(value.as_bytes(), &mut cookies)?;
            }
            headers.insert(name, value);
        }

        let body = self.body.freeze();
        let form = if is_form(&headers) { parse_params(&body)? } else { Params::new() };

        Ok(RequestParts { method, path, query, version, headers, cookies, form, body }.into())
    }
}

fn decode_path(raw: &[u8]) -> Result<String, ParseError> {
    let raw = std::str::from_utf8(raw).map_err(ParseError::invalid_uri)?;
    let uri = Uri::try_from(raw).map_err(ParseError::invalid_uri)?;
    Ok(uri.path().to_string())
}

fn parse_params(raw: &[u8]) -> Result<Params, ParseError> {
    if raw.is_empty() {
        return Ok(Params::new());
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw).map_err(ParseError::invalid_encoding)?;
    Ok(pairs.into_iter().collect())
}

fn parse_cookies(raw: &[u8], cookies: &mut Params) -> Result<(), ParseError> {
    let raw = std::str::from_utf8(raw).map_err(ParseError::invalid_encoding)?;
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = value.trim();
        let value = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
        cookies.insert(name.trim().to_string(), value.to_string());
    }
    Ok(())
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|content_type| content_type.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
}

/// Drops trailing whitespace left before the CRLF of a header line.
fn trim_range(bytes: &[u8], mut range: Range<usize>) -> Range<usize> {
    while range.end > range.start && matches!(bytes[range.end - 1], b' ' | b'\t') {
        range.end -= 1;
    }
    range
}

fn push_digit(current: u8, byte: u8) -> Result<u8, ParseError> {
    ensure!(byte.is_ascii_digit(), ParseError::malformed("invalid version"));
    current
        .checked_mul(10)
        .and_then(|value| value.checked_add(byte - b'0'))
        .ok_or(ParseError::malformed("invalid version"))
}

#[inline]
fn is_ctl(byte: u8) -> bool {
    byte <= 31 || byte == 127
}

#[inline]
fn is_tspecial(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\' | b'"' | b'/' | b'[' | b']' | b'?' | b'=' | b'{' | b'}' | b' ' | b'\t'
    )
}

#[inline]
fn is_token(byte: u8) -> bool {
    byte.is_ascii() && !is_ctl(byte) && !is_tspecial(byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const HELLO: &[u8] = b"GET /hello/world HTTP/1.1\r\nHost: x\r\n\r\n";

    fn crlf(text: &str) -> Vec<u8> {
        text.replace('\n', "\r\n").into_bytes()
    }

    fn parse_all(bytes: &[u8]) -> Request {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(bytes), ParseStatus::Good);
        parser.decode().unwrap()
    }

    fn parse_chunks(chunks: &[&[u8]]) -> Request {
        let mut parser = RequestParser::new();
        let (last, init) = chunks.split_last().unwrap();
        for chunk in init {
            assert_eq!(parser.parse(chunk), ParseStatus::Indeterminate);
        }
        assert_eq!(parser.parse(last), ParseStatus::Good);
        parser.decode().unwrap()
    }

    fn assert_same(left: &Request, right: &Request) {
        assert_eq!(left.method(), right.method());
        assert_eq!(left.path(), right.path());
        assert_eq!(left.query(), right.query());
        assert_eq!(left.version(), right.version());
        assert_eq!(left.headers(), right.headers());
        assert_eq!(left.cookies(), right.cookies());
        assert_eq!(left.form(), right.form());
        assert_eq!(left.body(), right.body());
    }

    #[test]
    fn hello_world_in_three_reads() {
        let request = parse_chunks(&[&HELLO[..5], &HELLO[5..15], &HELLO[15..]]);

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/hello/world");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header(header::HOST), Some("x"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn from_curl() {
        let bytes = crlf(indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##});

        let request = parse_all(&bytes);

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.path(), "/index.html");
        assert!(request.query().is_empty());
        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.header(header::ACCEPT), Some("*/*"));
        assert_eq!(request.header(header::HOST), Some("127.0.0.1:8080"));
        assert_eq!(request.header(header::USER_AGENT), Some("curl/7.79.1"));
    }

    #[test]
    fn from_edge() {
        let bytes = crlf(indoc! {r##"
        GET /index/?a=1&b=2&a=3&name=hello%20world+again HTTP/1.1
        Host: 127.0.0.1:8080
        Connection: keep-alive
        sec-ch-ua: "#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109"
        sec-ch-ua-mobile: ?0
        Accept-Language: zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7
        Cookie: theme=dark; lang="en"
        Cookie: sid=abc

        "##});

        let request = parse_all(&bytes);

        assert_eq!(request.path(), "/index/");
        assert_eq!(request.query_param("a"), Some("3"));
        assert_eq!(request.query_param("b"), Some("2"));
        assert_eq!(request.query_param("name"), Some("hello world again"));

        assert_eq!(request.header(header::CONNECTION), Some("keep-alive"));
        assert_eq!(
            request.header("sec-ch-ua"),
            Some(r##""#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109""##)
        );
        assert_eq!(request.header("SEC-CH-UA-MOBILE"), Some("?0"));
        assert_eq!(request.header(header::ACCEPT_LANGUAGE), Some("zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"));

        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.cookie("lang"), Some("en"));
        assert_eq!(request.cookie("sid"), Some("abc"));
        assert_eq!(request.header(header::COOKIE), Some("sid=abc"));
    }

    #[test]
    fn duplicate_headers_last_write_wins() {
        let request = parse_all(b"GET / HTTP/1.0\r\nX-Trace: 1\r\nx-trace: 2\r\n\r\n");
        assert_eq!(request.version(), Version::HTTP_10);
        assert_eq!(request.headers().get_all("x-trace").iter().count(), 1);
        assert_eq!(request.header("X-Trace"), Some("2"));
    }

    #[test]
    fn folded_header_and_optional_space() {
        let request = parse_all(b"GET / HTTP/1.1\r\nX-Long: first\r\n  second\r\nX-Tight:value  \r\n\r\n");
        assert_eq!(request.header("x-long"), Some("first second"));
        assert_eq!(request.header("x-tight"), Some("value"));
    }

    #[test]
    fn body_by_content_length() {
        let bytes = b"POST /login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 27\r\n\r\nuser=alice&pass=s%26cret+1X";

        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(&bytes[..bytes.len() - 1]), ParseStatus::Indeterminate);
        assert_eq!(parser.content_length(), Some(27));
        assert_eq!(parser.body_len(), 26);
        assert_eq!(parser.parse(&bytes[bytes.len() - 1..]), ParseStatus::Good);
        assert_eq!(parser.bytes_consumed(), bytes.len());

        let request = parser.decode().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.body().len(), 27);
        assert_eq!(request.form_param("user"), Some("alice"));
        assert_eq!(request.form_param("pass"), Some("s&cret 1X"));
    }

    #[test]
    fn non_form_body_is_kept_raw() {
        let request = parse_all(b"PUT /data HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}");
        assert_eq!(&request.body()[..], b"{\"a\":1}");
        assert!(request.form().is_empty());
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let mut bytes = HELLO.to_vec();
        bytes.extend_from_slice(b"GET /next HTTP/1.1\r\n");

        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(&bytes), ParseStatus::Good);
        assert_eq!(parser.bytes_consumed(), HELLO.len());
        assert_eq!(parser.parse(b"more"), ParseStatus::Good);
        assert_eq!(parser.bytes_consumed(), HELLO.len());
    }

    #[test]
    fn any_split_matches_single_shot() {
        let bytes = crlf(indoc! {r##"
        POST /submit/form?x=1&y=two HTTP/1.1
        Host: localhost
        Cookie: a=1; b=2
        Content-Type: application/x-www-form-urlencoded
        Content-Length: 13

        k1=v1&k2=v%32"##});

        let expected = parse_all(&bytes);
        assert_eq!(expected.form_param("k2"), Some("v2"));

        for first in 1..bytes.len() {
            let request = parse_chunks(&[&bytes[..first], &bytes[first..]]);
            assert_same(&expected, &request);
        }

        for first in (1..bytes.len()).step_by(7) {
            for second in (first + 1..bytes.len()).step_by(5) {
                let request = parse_chunks(&[&bytes[..first], &bytes[first..second], &bytes[second..]]);
                assert_same(&expected, &request);
            }
        }

        let bytewise: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_same(&expected, &parse_chunks(&bytewise));
    }

    #[test]
    fn bad_request_lines() {
        let cases: &[&[u8]] = &[
            b"G(T / HTTP/1.1\r\n\r\n",
            b"GET  / HTTP/1.1\r\n\r\n",
            b"GET /a\x01b HTTP/1.1\r\n\r\n",
            b"GET / HTTX/1.1\r\n\r\n",
            b"GET / HTTP/x.1\r\n\r\n",
            b"GET / HTTP/1.1\n\r\n",
            b"GET / HTTP/1.1\r\nHost x\r\n\r\n",
            b"GET / HTTP/1.1\r\nHost: x\n\n",
            b"GET / HTTP/1.1\r\n: x\r\n\r\n",
            b"GET / HTTP/1.1\r\n x\r\n\r\n",
            b"GET / HTTP/1.1\r\nHost: a\x00b\r\n\r\n",
        ];

        for case in cases {
            let mut parser = RequestParser::new();
            assert_eq!(parser.parse(case), ParseStatus::Bad, "{}", String::from_utf8_lossy(case));
            assert!(parser.bytes_consumed() < case.len());
            assert!(parser.error().is_some());
        }
    }

    #[test]
    fn bad_stops_consuming() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\nHost x"), ParseStatus::Bad);
        let consumed = parser.bytes_consumed();
        assert_eq!(consumed, "GET / HTTP/1.1\r\nHost".len());
        assert_eq!(parser.parse(b"\r\n\r\n"), ParseStatus::Bad);
        assert_eq!(parser.bytes_consumed(), consumed);
        assert!(matches!(parser.take_error(), Some(ParseError::Malformed { .. })));
    }

    #[test]
    fn missing_terminator_hits_header_limit() {
        let limits = ParseLimits { max_header_bytes: 64, ..ParseLimits::default() };
        let mut parser = RequestParser::with_limits(limits);
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\nX-Endless: "), ParseStatus::Indeterminate);

        let mut status = ParseStatus::Indeterminate;
        let mut rounds = 0;
        while status == ParseStatus::Indeterminate {
            status = parser.parse(b"aaaaaaaa");
            rounds += 1;
            assert!(rounds < 100);
        }
        assert_eq!(status, ParseStatus::Bad);
        assert!(matches!(parser.error(), Some(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn too_many_headers() {
        let limits = ParseLimits { max_headers: 2, ..ParseLimits::default() };
        let mut parser = RequestParser::with_limits(limits);
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\na: 1\r\nb: 2\r\nc: 3\r\n\r\n"), ParseStatus::Bad);
        assert!(matches!(parser.error(), Some(ParseError::TooManyHeaders { max_num: 2 })));
    }

    #[test]
    fn content_length_errors() {
        let cases: &[&[u8]] = &[
            b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n",
            b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
            b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\n",
        ];
        for case in cases {
            let mut parser = RequestParser::new();
            assert_eq!(parser.parse(case), ParseStatus::Bad);
            assert!(matches!(parser.error(), Some(ParseError::InvalidContentLength { .. })));
        }

        let limits = ParseLimits { max_body_bytes: 4, ..ParseLimits::default() };
        let mut parser = RequestParser::with_limits(limits);
        assert_eq!(parser.parse(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n"), ParseStatus::Bad);
        assert!(matches!(parser.error(), Some(ParseError::TooLargeBody { current_size: 5, max_size: 4 })));
    }

    #[test]
    fn chunked_is_rejected() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n"), ParseStatus::Bad);
    }

    #[test]
    fn decode_failures_are_distinct() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HTTP/2.0\r\n\r\n"), ParseStatus::Good);
        assert!(matches!(parser.decode(), Err(ParseError::InvalidVersion { major: 2, minor: 0 })));

        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET /caf\xc3\xa9 HTTP/1.1\r\n\r\n"), ParseStatus::Good);
        assert!(matches!(parser.decode(), Err(ParseError::InvalidUri { .. })));

        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\nCookie: a=\xff\xfe\r\n\r\n"), ParseStatus::Good);
        assert!(matches!(parser.decode(), Err(ParseError::InvalidEncoding { .. })));
    }

    #[test]
    fn decode_requires_good() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n"), ParseStatus::Indeterminate);
        assert!(matches!(parser.decode(), Err(ParseError::Malformed { .. })));
    }
}
