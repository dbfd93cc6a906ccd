//! The single boundary where handler failures become responses.
//!
//! [`Dispatcher`] opens the session, runs the [`RequestHandler`] and closes the
//! session, also when the handler declined, failed or panicked. An `Err` or a
//! panic is logged and turned into a stock `500`. A declined request becomes a
//! stock `404`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use http::StatusCode;
use tracing::{debug, error};

use crate::handler::{HandlerError, RequestHandler, SessionHook};
use crate::protocol::{stock_reply, Request, Response};

/// Where the handler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the connection's own task. A slow handler stalls its worker.
    #[default]
    Inline,
    /// On tokio's blocking thread pool.
    Blocking,
}

#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn RequestHandler>,
    session_hook: Option<Arc<dyn SessionHook>>,
    mode: DispatchMode,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session_hook", &self.session_hook.is_some())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new<H: RequestHandler + 'static>(handler: H) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler, session_hook: None, mode: DispatchMode::default() }
    }

    pub fn with_session_hook<S: SessionHook + 'static>(self, hook: S) -> Self {
        self.with_session_hook_arc(Arc::new(hook))
    }

    pub fn with_session_hook_arc(mut self, hook: Arc<dyn SessionHook>) -> Self {
        self.session_hook = Some(hook);
        self
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Produces the response for `request` according to the dispatch mode.
    pub async fn dispatch(&self, request: Request) -> Response {
        match self.mode {
            DispatchMode::Inline => self.dispatch_now(&request),
            DispatchMode::Blocking => {
                let dispatcher = self.clone();
                match tokio::task::spawn_blocking(move || dispatcher.dispatch_now(&request)).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(cause = %e, "blocking dispatch did not complete");
                        stock_reply(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }
            }
        }
    }

    /// Runs the handler on the current thread.
    pub fn dispatch_now(&self, request: &Request) -> Response {
        let mut response = Response::new();

        match self.run(request, &mut response) {
            Ok(Ok(true)) => response,
            Ok(Ok(false)) => {
                debug!(method = %request.method(), path = request.path(), "request not handled");
                stock_reply(StatusCode::NOT_FOUND)
            }
            Ok(Err(e)) => {
                error!(cause = %e, path = request.path(), "handler failed");
                stock_reply(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(payload) => {
                error!(cause = panic_message(payload.as_ref()), path = request.path(), "handler panicked");
                stock_reply(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Calls the handler inside the session scope.
    ///
    /// The session is closed on the handler's response whatever the outcome,
    /// before a stock reply replaces it.
    fn run(&self, request: &Request, response: &mut Response) -> thread::Result<Result<bool, HandlerError>> {
        let Some(hook) = &self.session_hook else {
            return panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle(request, response, None)));
        };

        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut session = hook.open(request);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle(request, response, Some(&mut session))));
            hook.close(response, session);
            outcome
        }))
        .and_then(|outcome| outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
