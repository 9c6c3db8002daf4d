//! HTTP module
//!
//! Application shell for the document management API: router, CORS and
//! request logging. Business routers plug into [`server::router`].

pub mod middleware;
pub mod server;

pub use server::{router, start, AppState, ServerHandle};
