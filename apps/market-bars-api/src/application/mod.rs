//! Application Layer
//!
//! The historical data port and the bars query service.

pub mod ports;
pub mod services;
