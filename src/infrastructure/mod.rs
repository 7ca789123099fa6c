//! Infrastructure layer - External concerns and adapters
//!
//! Everything that touches the network lives here.

pub mod transport;

pub use transport::{SessionConfig, TransportSession};
