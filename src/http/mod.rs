//! The HTTP front end: axum routes, request/response models, and error
//! mapping. Wire-format HTTP parsing itself stays inside axum/hyper;
//! everything here is translation to and from the `core` dispatcher.

pub mod error;
pub mod models;
pub mod routes;

pub use routes::build_router;
