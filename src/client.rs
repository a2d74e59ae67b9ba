//! Relay client: connect, then forward bytes both ways until either side
//! closes.

use crate::config::ClientArgs;
use crate::framing;
use crate::transport::{self, TransportError};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Connect to the configured server and relay between the local standard
/// streams and the socket. The connection is closed here, after the relay
/// loop ends, and not reused.
pub async fn run(args: &ClientArgs) -> Result<(), TransportError> {
    let addr = SocketAddr::from((args.address, args.port));
    let mut stream = transport::connect(addr).await?;
    info!(peer = %addr, "connected");

    let outcome = relay(
        tokio::io::stdin(),
        tokio::io::stdout(),
        &mut stream,
        args.max_chunk,
    )
    .await;

    if let Err(e) = transport::close(&mut stream).await {
        debug!(error = %e, "close failed");
    }
    outcome
}

/// Forward bytes between a local input/output pair and a remote stream.
///
/// Each iteration waits on both sources at once and forwards whichever
/// chunk becomes ready, at most `max_chunk` bytes per read, unchanged to
/// the other side. The loop ends the first time either source reports
/// end-of-stream; the side that signaled it is not read again. Neither
/// direction is ordered relative to the other.
pub async fn relay<I, O, S>(
    mut input: I,
    mut output: O,
    stream: S,
    max_chunk: usize,
) -> Result<(), TransportError>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut remote_rd, mut remote_wr) = tokio::io::split(stream);
    let mut local_buf = vec![0u8; max_chunk];
    let mut remote_buf = vec![0u8; max_chunk];

    loop {
        // Both reads are cancel safe: whichever loses the race has
        // transferred no bytes yet.
        tokio::select! {
            read = transport::read_some(&mut input, &mut local_buf) => {
                let n = read?;
                if n == 0 {
                    debug!("local input closed");
                    return Ok(());
                }
                framing::write_exact(&mut remote_wr, &local_buf[..n]).await?;
            }
            read = transport::read_some(&mut remote_rd, &mut remote_buf) => {
                let n = read?;
                if n == 0 {
                    debug!("remote peer closed");
                    return Ok(());
                }
                framing::write_exact(&mut output, &remote_buf[..n]).await?;
                output
                    .flush()
                    .await
                    .map_err(|e| TransportError::new("write", e))?;
            }
        }
    }
}
