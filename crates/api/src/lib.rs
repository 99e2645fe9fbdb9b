//! HTTP API: callback protocol, administrative routes, and server wiring.

pub mod app;
pub mod connector;
pub mod context;
pub mod middleware;
