//! HTTP codec module for parsing requests and serializing responses
//!
//! # Components
//!
//! - Request side:
//!   - [`RequestParser`]: incremental byte-wise state machine with a tri-state [`ParseStatus`]
//!   - [`RequestDecoder`]: [`tokio_util::codec::Decoder`] adapter used by the connection
//!
//! - Response side:
//!   - [`ResponseSerializer`]: maps a response to the byte ranges of a gather write
//!
//! # Example
//!
//! ```
//! use wisp_http::codec::{ParseStatus, RequestParser};
//!
//! let mut parser = RequestParser::new();
//! assert_eq!(parser.parse(b"GET /index.html HTTP/1.1\r\nHo"), ParseStatus::Indeterminate);
//! assert_eq!(parser.parse(b"st: localhost\r\n\r\n"), ParseStatus::Good);
//!
//! let request = parser.decode().unwrap();
//! assert_eq!(request.path(), "/index.html");
//! ```

mod request_decoder;
mod request_parser;
mod response_serializer;

pub use request_decoder::RequestDecoder;
pub use request_parser::ParseLimits;
pub use request_parser::ParseStatus;
pub use request_parser::RequestParser;
pub use request_parser::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADERS, DEFAULT_MAX_HEADER_BYTES};
pub use response_serializer::ResponseSerializer;
