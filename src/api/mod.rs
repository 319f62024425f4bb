//! Portal HTTP API.
//!
//! Routes are nested under `/api/` and protected by a middleware stack:
//! Rate Limit → Gate (session + role) → Audit → Handler.
//!
//! `portal_router()` returns a `Router` that can be mounted on any axum
//! server instance; `start_portal_server()` runs it on a TCP listener.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{start_portal_server, PortalServer, PortalSession, ServerError};
pub use types::ApiContext;
