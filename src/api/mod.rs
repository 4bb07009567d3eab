//! HTTP API.
//!
//! Routes come from `router::route_table()`; every response is wrapped in
//! the `{status, data}` envelope from `types`, and every error renders
//! through `ApiError`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::{api_router, route_table};
pub use server::{start_api_server_on, ApiServer};
pub use types::ApiContext;
