//! Recruitment pipeline engine: application steps, recruitment time windows, and interview
//! slot selection/allocation with conflict protection.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
