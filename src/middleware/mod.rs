//! Middleware module
//!
//! Request-level middleware shared by all routes

pub mod logging;
