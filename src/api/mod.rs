//! Optional HTTP front end: an upload form and a comparison endpoint.
//! Enabled with the `api` feature.

pub mod models;
pub mod server;

pub use server::start_http_server;
