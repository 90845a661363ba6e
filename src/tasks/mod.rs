//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Pressure monitor: evicts low-priority cache entries when memory runs high

mod pressure;

pub use pressure::spawn_pressure_monitor;
