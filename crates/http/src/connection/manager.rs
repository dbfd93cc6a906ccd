use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::connection::{ConnectionHandle, ConnectionId, HttpConnection};
use crate::protocol::HttpError;

/// Registry of live connections.
///
/// A connection is in the registry from [`register`](Self::register) until the
/// first [`stop`](Self::stop) on its handle. The lock is never held while a
/// connection is being closed.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<Mutex<HashMap<ConnectionId, ConnectionHandle>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds `connection` to the registry and returns the future driving it.
    ///
    /// The caller is expected to spawn the returned future.
    pub fn register<R, W>(&self, connection: HttpConnection<R, W>) -> impl Future<Output = Result<(), HttpError>> + use<R, W>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let handle = connection.handle().clone();
        self.lock().insert(handle.id(), handle);
        connection.process()
    }

    /// Removes the connection from the registry and closes it.
    ///
    /// Safe to call any number of times from any number of places; returns
    /// `true` only for the call that actually closed the connection.
    pub fn stop(&self, handle: &ConnectionHandle) -> bool {
        let removed = self.lock().remove(&handle.id()).is_some();
        let closed = handle.close();
        if closed {
            debug!(conn = %handle.id(), removed, "connection stopped");
        }
        closed
    }

    /// Stops every registered connection.
    ///
    /// The registry is emptied in one critical section, so a connection
    /// registered concurrently is either stopped here or stays registered.
    pub fn stop_all(&self) {
        let snapshot: Vec<ConnectionHandle> = self.lock().drain().map(|(_, handle)| handle).collect();
        debug!(connections = snapshot.len(), "stopping all connections");
        for handle in &snapshot {
            if handle.close() {
                debug!(conn = %handle.id(), "connection stopped");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Dispatcher;
    use crate::handler::handler_fn;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};

    type TestConnection = HttpConnection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn connection(manager: &ConnectionManager) -> (TestConnection, DuplexStream) {
        let (client, server) = duplex(1024);
        let (reader, writer) = split(server);
        let dispatcher = Dispatcher::new(handler_fn(|_, _, _| Ok(true)));
        (HttpConnection::new(reader, writer, dispatcher, manager.clone()), client)
    }

    #[tokio::test]
    async fn register_then_stop() {
        let manager = ConnectionManager::new();
        let (connection, _client) = connection(&manager);
        let handle = connection.handle().clone();

        let task = tokio::spawn(manager.register(connection));
        assert_eq!(manager.len(), 1);
        assert!(manager.contains(handle.id()));

        assert!(manager.stop(&handle));
        assert!(manager.is_empty());
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn racing_stops_close_once() {
        let manager = ConnectionManager::new();
        let (connection, _client) = connection(&manager);
        let handle = connection.handle().clone();
        let task = tokio::spawn(manager.register(connection));

        let stops: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let handle = handle.clone();
                tokio::spawn(async move { manager.stop(&handle) })
            })
            .collect();

        let mut closed = 0;
        for stop in stops {
            if stop.await.unwrap() {
                closed += 1;
            }
        }

        assert_eq!(closed, 1);
        assert!(manager.is_empty());
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stop_all_closes_everything() {
        let manager = ConnectionManager::new();
        let mut tasks = Vec::new();
        let mut clients = Vec::new();
        for _ in 0..3 {
            let (connection, client) = connection(&manager);
            clients.push(client);
            tasks.push(tokio::spawn(manager.register(connection)));
        }
        assert_eq!(manager.len(), 3);

        manager.stop_all();
        assert!(manager.is_empty());
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }

    #[test]
    fn stop_all_never_drops_a_live_connection() {
        let manager = ConnectionManager::new();

        for _ in 0..200 {
            let handles = std::thread::scope(|scope| {
                let registering = scope.spawn(|| {
                    (0..20)
                        .map(|_| {
                            let (connection, _client) = connection(&manager);
                            let handle = connection.handle().clone();
                            drop(manager.register(connection));
                            handle
                        })
                        .collect::<Vec<_>>()
                });
                manager.stop_all();
                registering.join().unwrap()
            });

            // registered and open, or unregistered and closed
            for handle in &handles {
                assert_ne!(manager.contains(handle.id()), handle.is_closed(), "{} lost without being stopped", handle.id());
            }
            manager.stop_all();
            assert!(manager.is_empty());
        }
    }

    #[tokio::test]
    async fn connection_registered_after_stop_all_stays_live() {
        let manager = ConnectionManager::new();
        let (first, _first_client) = connection(&manager);
        let first_handle = first.handle().clone();
        let first_task = tokio::spawn(manager.register(first));

        manager.stop_all();
        assert!(first_handle.is_closed());

        let (second, _second_client) = connection(&manager);
        let second_handle = second.handle().clone();
        let second_task = tokio::spawn(manager.register(second));
        assert!(manager.contains(second_handle.id()));
        assert!(!second_handle.is_closed());

        assert!(manager.stop(&second_handle));
        first_task.await.unwrap().unwrap();
        second_task.await.unwrap().unwrap();
    }
}
