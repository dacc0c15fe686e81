//! HTTP surface of the analysis service.
//!
//! `api_router()` returns a composable `Router`; `server::serve` binds it
//! and runs until shutdown.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
