//! Request fixtures shared by the wisp benchmarks.

use std::fmt;

/// What a fixture exercises in the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Request line and headers only.
    Get,
    /// Content-Length framed `application/x-www-form-urlencoded` body.
    FormPost,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Get => f.write_str("get"),
            RequestKind::FormPost => f.write_str("form_post"),
        }
    }
}

/// A raw request as a client would send it.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    name: &'static str,
    kind: RequestKind,
    raw: &'static str,
}

pub const GET_SMALL: Fixture = Fixture::new("small_header", RequestKind::Get, include_str!("../resources/request/get_small.txt"));
pub const GET_LARGE: Fixture = Fixture::new("large_header", RequestKind::Get, include_str!("../resources/request/get_large.txt"));
pub const POST_FORM: Fixture = Fixture::new("form", RequestKind::FormPost, include_str!("../resources/request/post_form.txt"));

/// Every fixture, smallest first.
pub fn fixtures() -> [Fixture; 3] {
    [GET_SMALL, GET_LARGE, POST_FORM]
}

impl Fixture {
    const fn new(name: &'static str, kind: RequestKind, raw: &'static str) -> Self {
        Self { name, kind, raw }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn raw(&self) -> &'static [u8] {
        self.raw.as_bytes()
    }

    /// The request cut into reads of at most `read_size` bytes.
    pub fn reads(&self, read_size: usize) -> impl Iterator<Item = &'static [u8]> {
        self.raw().chunks(read_size)
    }
}
