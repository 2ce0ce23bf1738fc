//! Core types and trait definitions for the helpdesk ticket engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod actor;
pub mod error;
pub mod log;
pub mod sla;
pub mod store;
pub mod ticket;

pub use error::{Error, Result};
