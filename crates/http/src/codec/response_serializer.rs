//! HTTP response serializer
//!
//! Projects a [`Response`] onto the ordered byte ranges of its wire form:
//!
//! 1. the status line `HTTP/1.1 <code> <reason>\r\n`
//! 2. one range per header line `<name>: <value>\r\n`
//! 3. the blank line terminating the head
//! 4. the body, unless the body is omitted for a `HEAD` request
//!
//! The ranges are meant for a single gather write. Serialization never touches
//! the response itself; `Content-Length` must already be final (see
//! [`Response::finalize`]). With `omit_body` set the header still describes the
//! body the request would have received.

use std::io;
use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{reason_phrase, Response};

/// Initial buffer size allocated for head serialization
const INIT_HEAD_SIZE: usize = 1024;

const CRLF: &[u8] = b"\r\n";

/// Serializer for [`Response`] values, see the [module documentation](self).
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSerializer;

impl ResponseSerializer {
    /// Returns the wire byte ranges of `response`, in write order.
    pub fn to_buffers(response: &Response, omit_body: bool) -> Vec<Bytes> {
        let mut head = BytesMut::with_capacity(INIT_HEAD_SIZE);
        let mut buffers = Vec::with_capacity(response.headers().len() + 3);

        let status = response.status();
        // writing into BytesMut can't fail
        let _ = write!(FastWrite(&mut head), "HTTP/1.1 {} {}\r\n", status.as_str(), reason_phrase(status));
        buffers.push(head.split().freeze());

        for (name, value) in response.headers() {
            head.put_slice(name.as_ref());
            head.put_slice(b": ");
            head.put_slice(value.as_ref());
            head.put_slice(CRLF);
            buffers.push(head.split().freeze());
        }

        buffers.push(Bytes::from_static(CRLF));

        if !omit_body && !response.body().is_empty() {
            buffers.push(response.body().clone());
        }

        buffers
    }

    /// Total number of bytes the ranges of `to_buffers` add up to.
    pub fn wire_len(buffers: &[Bytes]) -> usize {
        buffers.iter().map(Bytes::len).sum()
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
