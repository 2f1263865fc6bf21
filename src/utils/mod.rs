//! Utility module
//!
//! Contains error handling and other shared helpers

pub mod error;
