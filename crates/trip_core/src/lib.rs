//! Trip planning core
//!
//! Geodesic distances, charging stop placement and the telemetry simulator
//! replaying a planned trip.

pub mod distance;
mod models;
pub mod planner;
pub mod simulator;

pub use crate::models::*;
pub use crate::planner::Planner;
pub use crate::simulator::Simulator;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("Destination unreachable from ({}, {}): {reason}", position.latitude, position.longitude)]
    UnreachableDestination {
        position: Coordinate,
        reason: String,
    },
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },
    #[error("Invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl PlanError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        PlanError::MalformedRequest {
            reason: reason.into(),
        }
    }
}
