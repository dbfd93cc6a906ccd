use std::io::{self, IoSlice};
use std::net::SocketAddr;

use bytes::{Buf, Bytes};
use futures::StreamExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::FramedRead;
use tracing::{debug, trace, warn};

use crate::codec::{ParseLimits, RequestDecoder, ResponseSerializer};
use crate::connection::{ConnectionHandle, ConnectionId, ConnectionManager, Dispatcher};
use crate::protocol::{stock_reply, HttpError, Response, SendError};

/// Size of the per connection receive buffer
const RECV_BUFFER_SIZE: usize = 8 * 1024;

/// Lifecycle of a connection. `Closing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Dispatching,
    Writing,
    Closing,
}

/// A single client connection serving exactly one request
///
/// `HttpConnection` reads until the parser has a complete request, dispatches it,
/// writes the response with one gather write, shuts the socket down and
/// unregisters itself from its [`ConnectionManager`].
///
/// Every read and write is raced against the connection's [`ConnectionHandle`].
/// Once the handle is closed the pending operation is abandoned and
/// [`process`](Self::process) returns without touching the manager again.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: W,
    handle: ConnectionHandle,
    manager: ConnectionManager,
    dispatcher: Dispatcher,
    state: ConnectionState,
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("id", &self.handle.id())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, dispatcher: Dispatcher, manager: ConnectionManager) -> Self {
        Self::with_handle(reader, writer, dispatcher, manager, ConnectionHandle::new(None))
    }

    /// Creates a connection for a socket accepted from `peer_addr`.
    pub fn accepted(reader: R, writer: W, dispatcher: Dispatcher, manager: ConnectionManager, peer_addr: SocketAddr) -> Self {
        Self::with_handle(reader, writer, dispatcher, manager, ConnectionHandle::new(Some(peer_addr)))
    }

    fn with_handle(reader: R, writer: W, dispatcher: Dispatcher, manager: ConnectionManager, handle: ConnectionHandle) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), RECV_BUFFER_SIZE),
            writer,
            handle,
            manager,
            dispatcher,
            state: ConnectionState::Reading,
        }
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        *self.framed_read.decoder_mut() = RequestDecoder::with_limits(limits);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drives the connection to completion.
    ///
    /// Transport failures while reading are returned after the connection has
    /// been unregistered; nothing is written back in that case. Failures while
    /// writing are returned after the regular shutdown and unregistration.
    pub async fn process(mut self) -> Result<(), HttpError> {
        let id = self.handle.id();
        debug!(conn = %id, peer = ?self.handle.peer_addr(), "connection started");

        let next = select! {
            biased;
            () = self.handle.closed() => {
                trace!(conn = %id, "read aborted");
                return Ok(());
            }
            next = self.framed_read.next() => next,
        };

        let (response, omit_body) = match next {
            Some(Ok(request)) => {
                self.transition(ConnectionState::Dispatching);
                let omit_body = request.is_head();
                let response = select! {
                    biased;
                    () = self.handle.closed() => {
                        trace!(conn = %id, "dispatch aborted");
                        return Ok(());
                    }
                    response = self.dispatcher.dispatch(request) => response,
                };
                (response, omit_body)
            }

            Some(Err(e)) if e.is_io() => {
                debug!(conn = %id, cause = %e, "can't read request, dropping connection");
                self.manager.stop(&self.handle);
                return Err(e.into());
            }

            Some(Err(e)) => {
                warn!(conn = %id, cause = %e, "bad request");
                (stock_reply(StatusCode::BAD_REQUEST), false)
            }

            None => {
                debug!(conn = %id, "peer closed before sending a full request");
                self.manager.stop(&self.handle);
                return Ok(());
            }
        };

        self.transition(ConnectionState::Writing);
        let written = select! {
            biased;
            () = self.handle.closed() => {
                trace!(conn = %id, "write aborted");
                return Ok(());
            }
            written = write_response(&mut self.writer, response, omit_body) => written,
        };

        self.transition(ConnectionState::Closing);
        let _ = self.writer.shutdown().await;
        self.manager.stop(&self.handle);

        match written {
            Ok(len) => {
                debug!(conn = %id, bytes = len, "response sent, connection closed");
                Ok(())
            }
            Err(e) => {
                debug!(conn = %id, cause = %e, "can't write response");
                Err(SendError::io(e).into())
            }
        }
    }

    fn transition(&mut self, state: ConnectionState) {
        trace!(conn = %self.handle.id(), from = ?self.state, to = ?state, "connection state");
        self.state = state;
    }
}

async fn write_response<W>(writer: &mut W, mut response: Response, omit_body: bool) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    response.finalize();
    let buffers = ResponseSerializer::to_buffers(&response, omit_body);
    let len = ResponseSerializer::wire_len(&buffers);
    write_all_vectored(writer, buffers).await?;
    Ok(len)
}

/// Writes every buffer, in order, using vectored writes.
async fn write_all_vectored<W>(writer: &mut W, mut buffers: Vec<Bytes>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    buffers.retain(|buffer| !buffer.is_empty());
    let mut start = 0;

    while start < buffers.len() {
        let slices: Vec<IoSlice<'_>> = buffers[start..].iter().map(|buffer| IoSlice::new(buffer)).collect();
        let mut written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }

        while written > 0 {
            let current = &mut buffers[start];
            if written >= current.len() {
                written -= current.len();
                start += 1;
            } else {
                current.advance(written);
                written = 0;
            }
        }
    }

    writer.flush().await
}
