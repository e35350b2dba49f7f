//! JSON messages exchanged with trip planning clients.
//!
//! Every message carries a snake_case `type` tag next to its camelCase
//! fields, the way the mobile client reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trip_core::{ChargingStop, Coordinate, Location, SimulationState, TripPlan, VehicleStatus};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    /// Optional on the wire so a missing value is reported as a malformed request
    pub origin: Option<Location>,
    pub destination: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_battery_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    pub route: Vec<Coordinate>,
    pub charging_schedules: Vec<ChargingStop>,
    /// km
    pub total_distance: f64,
    /// minutes
    pub estimated_travel_time: f64,
    pub total_cost: u64,
}

impl RouteResponse {
    pub fn from_plan(plan: &TripPlan, trip_id: Option<Uuid>) -> Self {
        RouteResponse {
            trip_id,
            route: plan.path.clone(),
            charging_schedules: plan.stops.clone(),
            total_distance: plan.total_distance_km,
            estimated_travel_time: plan.total_travel_time_minutes,
            total_cost: plan.total_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatusEvent {
    pub current_location: Coordinate,
    pub battery_level: f64,
    pub is_charging: bool,
    pub current_speed: f64,
    pub estimated_arrival: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_charging_station: Option<ChargingStop>,
    pub state: SimulationState,
    pub stranded: bool,
}

impl From<VehicleStatus> for VehicleStatusEvent {
    fn from(status: VehicleStatus) -> Self {
        VehicleStatusEvent {
            current_location: status.current_location,
            battery_level: status.battery_level_percent,
            is_charging: status.is_charging,
            current_speed: status.current_speed_kmh,
            estimated_arrival: status.estimated_arrival,
            next_charging_station: status.next_stop,
            state: status.state,
            stranded: status.stranded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    TripRequest(TripRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished { message: String },
    RouteResponse(RouteResponse),
    VehicleStatus(VehicleStatusEvent),
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys only, serializing cannot fail
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"{}"}}"#, e)
        })
    }
}
