//! TCP relay server: accept loop and per-connection handler dispatch.
//!
//! The acceptor blocks only while waiting for an incoming connection. Each
//! accepted connection is handed to a freshly spawned, detached task; the
//! acceptor keeps no handle to it and is never blocked by it. A handler's
//! transport failure ends that handler alone; only the acceptor's own
//! listening-socket failures propagate out of [`Server::run`].

use crate::config::ServerConfig;
use crate::transport;
use crate::workload::{Greeter, Workload};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Server instance
pub struct Server {
    config: ServerConfig,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> Self {
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));
        Server {
            config,
            connection_limit,
        }
    }

    /// Bind the listening endpoint and begin accepting connections.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.listen.parse()?;
        let listener = transport::listen(addr, self.config.backlog)?;
        info!(
            address = %self.config.listen,
            backlog = self.config.backlog,
            workload = ?self.config.workload,
            "server listening"
        );
        self.serve(listener).await
    }

    /// Accept connections from `listener` until the process is killed.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut greeter = Greeter::new();

        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            let (stream, addr) = transport::accept(&listener).await?;
            debug!(peer = %addr, "new connection");

            let workload = self.config.workload;
            let max_line = self.config.max_line;
            let greeter = greeter.fork();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, workload, greeter, max_line).await {
                    debug!(peer = %addr, error = %e, "connection ended with error");
                }
                drop(permit);
            });
        }
    }
}

/// Run the workload on one owned connection, then close it. The close
/// happens no matter how the workload went.
async fn handle_connection(
    mut stream: TcpStream,
    workload: Workload,
    mut greeter: Greeter,
    max_line: usize,
) -> Result<(), transport::TransportError> {
    let outcome = workload.run(&mut stream, &mut greeter, max_line).await;
    if let Err(e) = transport::close(&mut stream).await {
        debug!(error = %e, "close failed");
    }
    outcome
}
