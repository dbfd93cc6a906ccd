//! The stock reply table.
//!
//! Every canned response the server produces on its own (bad request, not found,
//! internal error, ...) comes from [`stock_reply`]. Nothing else builds these bodies.

use http::StatusCode;

use crate::protocol::Response;

/// A row of the stock table: reason phrase and minimal body for one status code.
#[derive(Debug, Clone, Copy)]
pub struct StockEntry {
    pub reason: &'static str,
    pub body: &'static str,
}

macro_rules! stock_table {
    ($($status:ident, $code:literal, $reason:literal;)*) => {
        /// Looks up the stock entry for `status`, if the table has one.
        pub fn stock_entry(status: StatusCode) -> Option<StockEntry> {
            match status {
                StatusCode::OK => Some(StockEntry { reason: "OK", body: "" }),
                $(
                    StatusCode::$status => Some(StockEntry {
                        reason: $reason,
                        body: concat!(
                            "<html><head><title>", $reason, "</title></head><body><h1>",
                            $code, " ", $reason,
                            "</h1></body></html>"
                        ),
                    }),
                )*
                _ => None,
            }
        }
    };
}

stock_table! {
    CREATED, "201", "Created";
    ACCEPTED, "202", "Accepted";
    NO_CONTENT, "204", "No Content";
    MULTIPLE_CHOICES, "300", "Multiple Choices";
    MOVED_PERMANENTLY, "301", "Moved Permanently";
    FOUND, "302", "Moved Temporarily";
    NOT_MODIFIED, "304", "Not Modified";
    BAD_REQUEST, "400", "Bad Request";
    UNAUTHORIZED, "401", "Unauthorized";
    FORBIDDEN, "403", "Forbidden";
    NOT_FOUND, "404", "Not Found";
    METHOD_NOT_ALLOWED, "405", "Method Not Allowed";
    PAYLOAD_TOO_LARGE, "413", "Payload Too Large";
    INTERNAL_SERVER_ERROR, "500", "Internal Server Error";
    NOT_IMPLEMENTED, "501", "Not Implemented";
    BAD_GATEWAY, "502", "Bad Gateway";
    SERVICE_UNAVAILABLE, "503", "Service Unavailable";
}

/// Returns the reason phrase written on the status line for `status`.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    stock_entry(status).map(|entry| entry.reason).or_else(|| status.canonical_reason()).unwrap_or("Unknown")
}

/// Builds the canned response for `status`.
///
/// Codes missing from the table get an empty body.
pub fn stock_reply(status: StatusCode) -> Response {
    let mut response = Response::with_status(status);
    let body = stock_entry(status).map_or("", |entry| entry.body);
    if !body.is_empty() {
        response.set_body(body, mime::TEXT_HTML_UTF_8.as_ref());
    }
    response
}
