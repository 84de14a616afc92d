//! Builders that assemble core components from configuration.

pub mod server_builder;

pub use server_builder::{JobServer, ServerBuilder};
