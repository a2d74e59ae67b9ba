//! Line and chunk discipline on top of the transport primitives.
//!
//! Sockets deliver data in arbitrary fragment sizes; these helpers give
//! callers "read at most one line" and "send exactly this slice" semantics
//! regardless of how the transport fragments the stream.

use crate::transport::{self, TransportError};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read one newline-terminated line from `stream` into `buf`.
///
/// At most `buf.len() - 1` data bytes are written, and a zero byte is
/// placed immediately after the last data byte in every stop case, so the
/// line is always delimited even when the buffer fills or the stream ends
/// early. The newline, when seen, is kept as the last data byte and
/// counted. An empty `buf` is a no-op returning 0 with the buffer
/// untouched.
///
/// Returns the number of data bytes written, excluding the terminator.
/// End-of-stream before any byte yields 0 with `buf[0] == 0`.
pub async fn read_line<R>(stream: &mut R, buf: &mut [u8]) -> Result<usize, TransportError>
where
    R: AsyncRead + Unpin,
{
    if buf.is_empty() {
        return Ok(0);
    }

    // One byte per read keeps the stop conditions exact; this path is
    // line-oriented, not a throughput path.
    let cap = buf.len() - 1;
    let mut n = 0;
    while n < cap {
        let mut byte = [0u8; 1];
        if transport::read_some(stream, &mut byte).await? == 0 {
            break;
        }
        buf[n] = byte[0];
        n += 1;
        if byte[0] == b'\n' {
            break;
        }
    }
    buf[n] = 0;
    Ok(n)
}

/// Write all of `buf` to `stream`, looping over partial acceptances.
///
/// On `Ok(())` every byte of `buf` has been accepted by the transport.
/// There is no partial success: the only other outcome is an error. A
/// write that accepts zero bytes of a non-empty remainder is an error.
pub async fn write_exact<W>(stream: &mut W, buf: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut rest = buf;
    while !rest.is_empty() {
        let n = transport::write_some(stream, rest).await?;
        if n == 0 {
            return Err(TransportError::new(
                "write",
                io::Error::new(io::ErrorKind::WriteZero, "write accepted zero bytes"),
            ));
        }
        rest = &rest[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn reads_one_line_and_keeps_the_newline() {
        let mut mock = Builder::new().read(b"hi\n").build();
        let mut buf = [0xaau8; 16];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..4], b"hi\n\0");
    }

    #[tokio::test]
    async fn reassembles_a_fragmented_line() {
        let mut mock = Builder::new().read(b"he").read(b"ll").read(b"o\n").build();
        let mut buf = [0u8; 16];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf[..7], b"hello\n\0");
    }

    #[tokio::test]
    async fn resumes_after_a_transient_interruption() {
        let mut mock = Builder::new()
            .read(b"he")
            .read_error(io::Error::from(io::ErrorKind::Interrupted))
            .read(b"llo\n")
            .build();
        let mut buf = [0u8; 16];

        // Same bytes as the uninterrupted stream, nothing lost or repeated.
        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf[..7], b"hello\n\0");
    }

    #[tokio::test]
    async fn capacity_bounds_the_line() {
        let mut mock = Builder::new().read(b"abcdefgh").build();
        let mut buf = [0u8; 4];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf, b"abc\0");

        // The rest of the stream was left unread.
        let mut rest = Vec::new();
        mock.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"defgh");
    }

    #[tokio::test]
    async fn stops_at_end_of_stream_mid_line() {
        let mut mock = Builder::new().read(b"partial").build();
        let mut buf = [0u8; 16];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 7);
        assert_eq!(&buf[..8], b"partial\0");
    }

    #[tokio::test]
    async fn empty_stream_yields_zero_and_a_bare_terminator() {
        let mut mock = Builder::new().build();
        let mut buf = [0x55u8; 8];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(buf[0], 0);
    }

    #[tokio::test]
    async fn zero_capacity_is_a_no_op() {
        let mut mock = Builder::new().build();
        let mut buf: [u8; 0] = [];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn single_byte_capacity_only_terminates() {
        let mut mock = Builder::new().build();
        let mut buf = [0x55u8; 1];

        let n = read_line(&mut mock, &mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(buf[0], 0);
    }

    #[tokio::test]
    async fn write_exact_loops_over_partial_writes() {
        // The mock accepts each expectation as a separate partial write.
        let mut mock = Builder::new()
            .write(b"hel")
            .write(b"lo ")
            .write(b"world")
            .build();
        write_exact(&mut mock, b"hello world").await.unwrap();
    }

    #[tokio::test]
    async fn write_exact_retries_interrupted_writes() {
        let mut mock = Builder::new()
            .write(b"ab")
            .write_error(io::Error::from(io::ErrorKind::Interrupted))
            .write(b"cd")
            .build();
        write_exact(&mut mock, b"abcd").await.unwrap();
    }

    #[tokio::test]
    async fn write_exact_of_nothing_is_a_no_op() {
        let mut mock = Builder::new().build();
        write_exact(&mut mock, b"").await.unwrap();
    }
}
