//! Listener and worker pool.
//!
//! [`Server::run`] starts `workers` OS threads. Each thread runs its own
//! single-threaded tokio runtime and its own accept loop on a clone of the
//! listening socket, so a connection stays on the thread that accepted it.
//! The calling thread waits for the [`Shutdown`] signal (or SIGINT/SIGTERM),
//! then stops every live connection and joins the workers.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::select;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn, Level};
use wisp_http::codec::ParseLimits;
use wisp_http::connection::{ConnectionManager, DispatchMode, Dispatcher, HttpConnection};
use wisp_http::handler::{RequestHandler, SessionHook};
use wisp_http::protocol::HttpError;

use crate::Shutdown;

/// Settings a [`Server`] was built with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addresses: Vec<SocketAddr>,
    pub workers: usize,
    pub dispatch_mode: DispatchMode,
    pub handle_signals: bool,
    pub parse_limits: ParseLimits,
}

pub struct ServerBuilder {
    handler: Option<Arc<dyn RequestHandler>>,
    session_hook: Option<Arc<dyn SessionHook>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    workers: usize,
    dispatch_mode: DispatchMode,
    handle_signals: bool,
    parse_limits: ParseLimits,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("handler", &self.handler.is_some())
            .field("session_hook", &self.session_hook.is_some())
            .field("workers", &self.workers)
            .field("dispatch_mode", &self.dispatch_mode)
            .field("handle_signals", &self.handle_signals)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            handler: None,
            session_hook: None,
            address: None,
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            dispatch_mode: DispatchMode::default(),
            handle_signals: true,
            parse_limits: ParseLimits::default(),
        }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(|addresses| addresses.collect()));
        self
    }

    /// Number of worker threads, defaults to the available parallelism.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn dispatch_mode(mut self, dispatch_mode: DispatchMode) -> Self {
        self.dispatch_mode = dispatch_mode;
        self
    }

    /// Whether SIGINT/SIGTERM trigger the shutdown, defaults to `true`.
    pub fn handle_signals(mut self, handle_signals: bool) -> Self {
        self.handle_signals = handle_signals;
        self
    }

    pub fn handler(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn session_hook(mut self, session_hook: impl SessionHook + 'static) -> Self {
        self.session_hook = Some(Arc::new(session_hook));
        self
    }

    pub fn parse_limits(mut self, parse_limits: ParseLimits) -> Self {
        self.parse_limits = parse_limits;
        self
    }

    /// Validates the configuration and binds the listening socket.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        let addresses = self.address.ok_or(ServerBuildError::MissingAddress)?.map_err(ServerBuildError::InvalidAddress)?;
        if addresses.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }
        if self.workers == 0 {
            return Err(ServerBuildError::InvalidWorkers);
        }

        let listener = std::net::TcpListener::bind(addresses.as_slice()).map_err(ServerBuildError::Bind)?;
        listener.set_nonblocking(true).map_err(ServerBuildError::Bind)?;

        let mut dispatcher = Dispatcher::from_arc(handler).with_mode(self.dispatch_mode);
        if let Some(session_hook) = self.session_hook {
            dispatcher = dispatcher.with_session_hook_arc(session_hook);
        }

        let config = ServerConfig {
            addresses,
            workers: self.workers,
            dispatch_mode: self.dispatch_mode,
            handle_signals: self.handle_signals,
            parse_limits: self.parse_limits,
        };

        Ok(Server { config, listener, dispatcher, manager: ConnectionManager::new(), shutdown: Shutdown::new() })
    }
}

#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    listener: std::net::TcpListener,
    dispatcher: Dispatcher,
    manager: ConnectionManager,
    shutdown: Shutdown,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("handler must be set")]
    MissingHandler,
    #[error("address must be set")]
    MissingAddress,
    #[error("address can't be resolved: {0}")]
    InvalidAddress(#[source] io::Error),
    #[error("at least one worker is required")]
    InvalidWorkers,
    #[error("can't bind listener: {0}")]
    Bind(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Bind(#[source] io::Error),
    #[error("can't start runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("worker {name} panicked")]
    WorkerPanicked { name: String },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the listener is bound to, useful after binding port `0`.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops [`run`](Self::run) when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Serves until shutdown, blocking the calling thread.
    ///
    /// Installs an `INFO` level subscriber unless one is already set.
    pub fn run(self) -> Result<(), ServerError> {
        let _ = tracing_subscriber::fmt().with_max_level(Level::INFO).try_init();

        info!(address = ?self.listener.local_addr().ok(), workers = self.config.workers, "start listening");

        let runtime = Builder::new_current_thread().enable_all().build().map_err(ServerError::Runtime)?;

        let mut workers = Vec::with_capacity(self.config.workers);
        for index in 0..self.config.workers {
            match self.spawn_worker(index) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    error!(cause = %e, "can't start worker");
                    self.shutdown.trigger();
                    self.manager.stop_all();
                    join_workers(workers)?;
                    return Err(e);
                }
            }
        }

        runtime.block_on(wait_for_shutdown(self.shutdown.clone(), self.config.handle_signals));

        info!(connections = self.manager.len(), "shutting down");
        self.shutdown.trigger();
        self.manager.stop_all();
        join_workers(workers)?;
        info!("server stopped");
        Ok(())
    }

    fn spawn_worker(&self, index: usize) -> Result<JoinHandle<Result<(), ServerError>>, ServerError> {
        let worker = Worker {
            listener: self.listener.try_clone().map_err(ServerError::Bind)?,
            dispatcher: self.dispatcher.clone(),
            manager: self.manager.clone(),
            shutdown: self.shutdown.clone(),
            parse_limits: self.config.parse_limits,
        };

        thread::Builder::new()
            .name(format!("wisp-worker-{index}"))
            .spawn(move || {
                let shutdown = worker.shutdown.clone();
                let result = worker.run();
                if let Err(e) = &result {
                    error!(cause = %e, "worker failed, shutting down");
                    shutdown.trigger();
                }
                result
            })
            .map_err(ServerError::Runtime)
    }
}

fn join_workers(workers: Vec<JoinHandle<Result<(), ServerError>>>) -> Result<(), ServerError> {
    for worker in workers {
        let name = worker.thread().name().unwrap_or("wisp-worker").to_string();
        worker.join().map_err(|_panic| ServerError::WorkerPanicked { name })??;
    }
    Ok(())
}

async fn wait_for_shutdown(shutdown: Shutdown, handle_signals: bool) {
    if !handle_signals {
        shutdown.wait().await;
        return;
    }

    select! {
        () = shutdown.wait() => {}
        () = shutdown_signal() => info!("shutdown signal received"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(cause = %e, "can't listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!(cause = %e, "can't listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

struct Worker {
    listener: std::net::TcpListener,
    dispatcher: Dispatcher,
    manager: ConnectionManager,
    shutdown: Shutdown,
    parse_limits: ParseLimits,
}

impl Worker {
    fn run(self) -> Result<(), ServerError> {
        let runtime = Builder::new_current_thread().enable_all().build().map_err(ServerError::Runtime)?;
        runtime.block_on(self.serve())
    }

    async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::from_std(self.listener).map_err(ServerError::Bind)?;
        let mut connections = JoinSet::new();

        loop {
            select! {
                biased;
                () = self.shutdown.wait() => break,
                accepted = listener.accept() => {
                    let (tcp_stream, peer_addr) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };

                    let (reader, writer) = tcp_stream.into_split();
                    let connection =
                        HttpConnection::accepted(reader, writer, self.dispatcher.clone(), self.manager.clone(), peer_addr)
                            .with_limits(self.parse_limits);
                    connections.spawn(self.manager.register(connection));
                }
                Some(finished) = connections.join_next() => log_finished(finished),
            }
        }

        drop(listener);
        // connections accepted while the shutdown was being triggered
        self.manager.stop_all();
        while let Some(finished) = connections.join_next().await {
            log_finished(finished);
        }
        Ok(())
    }
}

fn log_finished(finished: Result<Result<(), HttpError>, JoinError>) {
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(cause = %e, "connection ended with error"),
        Err(e) => error!(cause = %e, "connection task failed"),
    }
}
