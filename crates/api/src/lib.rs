//! HTTP API: cookie transport, session verification guard and routing.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod cookies;
pub mod middleware;
