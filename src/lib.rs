//! wire-relay: a duplex TCP byte-stream relay
//!
//! Two programs share this library:
//! - `relay-server` accepts connections and runs an independent, detached
//!   handler task for each one
//! - `relay-client` forwards bytes between the local standard streams and a
//!   remote server until either side closes
//!
//! Features:
//! - Fail-fast transport primitives with transparent retry of interrupted calls
//! - Bounded line reads and all-or-nothing writes over fragmenting sockets
//! - Pluggable per-connection workloads (greeting, echo)
//! - Configuration via CLI arguments or TOML file

pub mod client;
pub mod config;
pub mod framing;
pub mod server;
pub mod transport;
pub mod workload;
