//! Fail-fast socket primitives shared by the server and client.
//!
//! Every operation retries transparently when it is interrupted before
//! completing; `accept` additionally retries handshakes the peer aborted
//! before acceptance. Every other failure surfaces as a [`TransportError`]
//! tagged with the failing operation, classified as either `Disconnected`
//! (the peer went away, only the unit of work that owned the connection
//! ends) or `Fatal` (the calling flow cannot continue).
//!
//! End-of-stream is not an error: a read that returns `Ok(0)` means no
//! further data will arrive on that direction of the connection.

use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::trace;

/// A transport operation failure, tagged with the operation that failed.
#[derive(Debug)]
pub enum TransportError {
    /// The peer ended or reset the connection mid-operation. Ends only the
    /// unit of work that owned the connection.
    Disconnected {
        op: &'static str,
        source: io::Error,
    },
    /// Any other transport failure. Unrecoverable for the calling flow.
    Fatal {
        op: &'static str,
        source: io::Error,
    },
}

impl TransportError {
    pub(crate) fn new(op: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => TransportError::Disconnected { op, source },
            _ => TransportError::Fatal { op, source },
        }
    }

    /// Name of the operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            TransportError::Disconnected { op, .. } | TransportError::Fatal { op, .. } => op,
        }
    }

    /// Whether the failure is unrecoverable for the calling flow, as
    /// opposed to the peer simply being gone.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Fatal { .. })
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Disconnected { op, source }
            | TransportError::Fatal { op, source } => write!(f, "{op}: {source}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Disconnected { source, .. }
            | TransportError::Fatal { source, .. } => Some(source),
        }
    }
}

/// Create a listening socket bound to `addr` with an explicit accept
/// backlog. Covers the socket, bind, and listen steps; each reports its
/// own operation name on failure.
pub fn listen(addr: SocketAddr, backlog: u32) -> Result<TcpListener, TransportError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| TransportError::new("socket", e))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| TransportError::new("socket", e))?;
    socket
        .bind(&addr.into())
        .map_err(|e| TransportError::new("bind", e))?;
    socket
        .listen(backlog as i32)
        .map_err(|e| TransportError::new("listen", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| TransportError::new("listen", e))?;
    TcpListener::from_std(socket.into()).map_err(|e| TransportError::new("listen", e))
}

/// Accept one connection, retrying interrupted calls and handshakes the
/// peer aborted before acceptance.
pub async fn accept(listener: &TcpListener) -> Result<(TcpStream, SocketAddr), TransportError> {
    loop {
        match listener.accept().await {
            Ok(accepted) => return Ok(accepted),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                ) =>
            {
                trace!(error = %e, "accept retried");
            }
            Err(e) => return Err(TransportError::new("accept", e)),
        }
    }
}

/// Connect to a remote address.
pub async fn connect(addr: SocketAddr) -> Result<TcpStream, TransportError> {
    TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::new("connect", e))
}

/// Read up to `buf.len()` bytes, retrying interrupted calls. Returns the
/// number of bytes read; `Ok(0)` means end-of-stream.
pub async fn read_some<R>(stream: &mut R, buf: &mut [u8]) -> Result<usize, TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        match stream.read(buf).await {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("read retried");
            }
            Err(e) => return Err(TransportError::new("read", e)),
        }
    }
}

/// Write up to `buf.len()` bytes, retrying interrupted calls. Returns the
/// number of bytes the transport accepted, which may be fewer than
/// requested.
pub async fn write_some<W>(stream: &mut W, buf: &[u8]) -> Result<usize, TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match stream.write(buf).await {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("write retried");
            }
            Err(e) => return Err(TransportError::new("write", e)),
        }
    }
}

/// Flush and close the write side of a connection, retrying interrupted
/// calls. The handle must not be used for writing afterward.
pub async fn close<W>(stream: &mut W) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match stream.shutdown().await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("close retried");
            }
            Err(e) => return Err(TransportError::new("close", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn classifies_peer_loss_as_disconnected() {
        let e = TransportError::new("read", io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(!e.is_fatal());
        assert_eq!(e.op(), "read");

        let e = TransportError::new("write", io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!e.is_fatal());
    }

    #[test]
    fn classifies_everything_else_as_fatal() {
        let e = TransportError::new("bind", io::Error::from(io::ErrorKind::AddrInUse));
        assert!(e.is_fatal());
        assert_eq!(e.op(), "bind");

        let e = TransportError::new("socket", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(e.is_fatal());
    }

    #[test]
    fn reports_operation_and_reason() {
        let e = TransportError::new("accept", io::Error::other("boom"));
        assert_eq!(e.to_string(), "accept: boom");
    }

    #[tokio::test]
    async fn read_some_reports_end_of_stream_as_zero() {
        let mut mock = Builder::new().build();
        let mut buf = [0u8; 8];
        assert_eq!(read_some(&mut mock, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_some_retries_interrupted_calls() {
        let mut mock = Builder::new()
            .read_error(io::Error::from(io::ErrorKind::Interrupted))
            .read(b"data")
            .build();
        let mut buf = [0u8; 8];
        let n = read_some(&mut mock, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"data");
    }

    #[tokio::test]
    async fn listener_accepts_connections() {
        let listener = listen("127.0.0.1:0".parse().unwrap(), 5).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = connect(addr).await.unwrap();
        let (_server_side, peer) = accept(&listener).await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }
}
