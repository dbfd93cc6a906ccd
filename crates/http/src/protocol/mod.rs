//! Core HTTP protocol types.
//!
//! - [`Request`]: a fully decoded request, produced by the parser's decode step
//! - [`Response`]: the response a handler fills in
//! - [`stock_reply`]: the single table of canned error responses
//! - Errors: [`HttpError`] wraps [`ParseError`] (reading side) and [`SendError`] (writing side)

mod request;
pub use request::Params;
pub use request::Request;
pub(crate) use request::RequestParts;

mod response;
pub use response::Response;

mod stock;
pub use stock::reason_phrase;
pub use stock::stock_entry;
pub use stock::stock_reply;
pub use stock::StockEntry;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
