//! HTTP API server implementation

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::ApiServer;
