//! HTTP transport to the node
//!
//! A [`TransportSession`] owns one pooled `reqwest` client, configured once from
//! a [`SessionConfig`], and applies the retry policy to every POST it sends.

pub mod policy;
pub mod session;

pub use policy::{Credentials, Endpoint, RetryPolicy, Scheme, SessionConfig, TlsPolicy};
pub use session::{HttpResponse, TransportSession};
