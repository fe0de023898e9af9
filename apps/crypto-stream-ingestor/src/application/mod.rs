//! Application Layer
//!
//! Ports the pipeline talks through and the services that drive it.

pub mod ports;
pub mod services;
