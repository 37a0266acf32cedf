// HTTP surface for the catalog engine: listing endpoints that return
// fail-open pages wrapped in the standard response envelope.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
