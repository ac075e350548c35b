//! HTTP API - routes, handlers, and the status page

pub mod handlers;
pub mod payload;
pub mod routes;
pub mod ui;

pub use routes::create_router;
