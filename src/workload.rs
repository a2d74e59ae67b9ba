//! Per-connection units of work run by the server.
//!
//! A workload receives one owned connection, does its job, and returns;
//! the caller closes the connection afterward no matter how the workload
//! went.

use crate::framing;
use crate::transport::TransportError;
use bytes::{BufMut, BytesMut};
use clap::ValueEnum;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};

/// Longest greeting in data bytes, newline excluded.
const MAX_GREETING: usize = 10;

/// The unit of work a handler runs on its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Send one short random line, then hang up.
    Greeting,
    /// Reflect every received line back until the peer hangs up.
    Echo,
}

impl Workload {
    pub async fn run<S>(
        self,
        stream: &mut S,
        greeter: &mut Greeter,
        max_line: usize,
    ) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            Workload::Greeting => greet(stream, greeter).await,
            Workload::Echo => echo(stream, max_line).await,
        }
    }
}

async fn greet<S>(stream: &mut S, greeter: &mut Greeter) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    let line = greeter.next_line();
    framing::write_exact(stream, &line).await
}

async fn echo<S>(stream: &mut S, max_line: usize) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; max_line];
    loop {
        let n = framing::read_line(stream, &mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        framing::write_exact(stream, &buf[..n]).await?;
    }
}

/// Source of short random greeting lines.
///
/// Owns its generator state; there is no process-wide seed. The accept
/// loop holds one instance and forks a child for each handler task.
#[derive(Debug)]
pub struct Greeter {
    rng: fastrand::Rng,
}

impl Greeter {
    pub fn new() -> Self {
        Greeter {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Greeter {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Split off an independent generator for a handler task.
    pub fn fork(&mut self) -> Self {
        Greeter {
            rng: self.rng.fork(),
        }
    }

    /// One random lowercase line: 1 to `MAX_GREETING` data bytes plus the
    /// newline.
    pub fn next_line(&mut self) -> BytesMut {
        let len = self.rng.usize(1..=MAX_GREETING);
        let mut line = BytesMut::with_capacity(len + 1);
        for _ in 0..len {
            line.put_u8(self.rng.u8(b'a'..=b'z'));
        }
        line.put_u8(b'\n');
        line
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Greeter::new()
    }
}
