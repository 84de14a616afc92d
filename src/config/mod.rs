//! Configuration models for the job server.

pub mod server;

pub use server::ServerConfig;
