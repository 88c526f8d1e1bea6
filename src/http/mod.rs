//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, strip hop-by-hop, X-Forwarded-For)
//!     → dispatch.rs (select backend, forward, retry)
//!     → upstream.rs (hyper client call under per-attempt timeout)
//!     → response.rs (identification headers, or 503)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use request::ProxyRequest;
pub use server::HttpServer;
pub use upstream::{Forward, ForwardError, ForwardResult};
