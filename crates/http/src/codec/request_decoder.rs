//! HTTP request decoder module
//!
//! [`RequestDecoder`] adapts the incremental [`RequestParser`] to the
//! [`tokio_util::codec::Decoder`] interface so a connection can drive it with a
//! [`FramedRead`](tokio_util::codec::FramedRead).
//!
//! Every call feeds the bytes of the latest read to the parser and advances the
//! read buffer by exactly what the parser accepted. The parser keeps its own
//! copy of the request, so the framed reader can reuse its buffer freely.
//!
//! # Example
//!
//! ```
//! use wisp_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /hello HT");
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//!
//! buffer.extend_from_slice(b"TP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/hello");
//! ```

use std::mem;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::{ParseLimits, ParseStatus, RequestParser};
use crate::protocol::{ParseError, Request};

/// A [`Decoder`] producing one decoded [`Request`] per complete message.
///
/// - `Ok(None)`: the parser is `Indeterminate`, more bytes are needed
/// - `Ok(Some(request))`: the parser reached `Good` and decoding succeeded
/// - `Err(_)`: the parser went `Bad`, or decoding failed
///
/// A fresh parser is installed after every decoded request.
#[derive(Debug)]
pub struct RequestDecoder {
    parser: RequestParser,
    limits: ParseLimits,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance with default limits
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { parser: RequestParser::with_limits(limits), limits }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_limits(ParseLimits::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let before = self.parser.bytes_consumed();
        let status = self.parser.parse(src);
        let consumed = self.parser.bytes_consumed() - before;
        src.advance(consumed);
        trace!(consumed, status = ?status, "fed request bytes");

        match status {
            ParseStatus::Indeterminate => Ok(None),
            ParseStatus::Good => {
                let parser = mem::replace(&mut self.parser, RequestParser::with_limits(self.limits));
                parser.decode().map(Some)
            }
            ParseStatus::Bad => Err(self.parser.take_error().unwrap_or(ParseError::malformed("bad request"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn partial_reads_are_fully_consumed() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("POST /echo HTTP/1.1\r\nContent-Len");

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(buffer.is_empty());

        buffer.extend_from_slice(b"gth: 4\r\n\r\nab");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(buffer.is_empty());

        buffer.extend_from_slice(b"cd");
        let request = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(&request.body()[..], b"abcd");
    }

    #[test]
    fn leftover_bytes_stay_in_buffer() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");

        let first = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.path(), "/a");
        assert_eq!(&buffer[..], b"GET /b HTTP/1.1\r\n\r\n");

        let second = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.path(), "/b");
        assert!(buffer.is_empty());
    }

    #[test]
    fn bad_input_reports_parse_error() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET / HTTP/1.1\r\nno colon here\r\n\r\n");
        let error = decoder.decode(&mut buffer).unwrap_err();
        assert!(matches!(error, ParseError::Malformed { .. }));
        assert!(!error.is_io());
    }

    #[test]
    fn decode_error_is_reported() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET / HTTP/3.0\r\n\r\n");
        assert!(matches!(decoder.decode(&mut buffer), Err(ParseError::InvalidVersion { major: 3, minor: 0 })));
    }

    #[test]
    fn eof_mid_request_ends_stream() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET / HT");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(decoder.decode_eof(&mut buffer).unwrap().is_none());
    }
}
