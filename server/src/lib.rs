//! Question Search Server Library
//!
//! Loads the question dataset into a vector index at startup and serves
//! similarity search over HTTP.

pub mod config;
pub mod error;
pub mod http;
pub mod startup;

pub use config::{Args, Backend, ModelKind};
pub use error::{ServerError, ServerResult};
pub use http::{HttpServer, SearchApp};
