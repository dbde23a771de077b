//! API layer - HTTP routes and error mapping.

pub mod http;
