//! Trip planning service
//!
//! Ties the station catalog and vehicle profiles to the planner, and keeps
//! track of the simulations started for planned trips.

pub mod config;
pub mod protocol;
pub mod registry;
pub mod runner;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use trip_core::distance::interpolate_path;
use trip_core::{
    ChargingStation, PlanError, Planner, Simulator, TripPlan, VehicleProfile, VehicleStatus,
};
use uuid::Uuid;

pub use crate::config::{ConfigError, ServiceConfig};
use crate::protocol::TripRequest;
use crate::registry::SimulationRegistry;
use crate::runner::spawn_simulation;

/// Statuses buffered for a slow subscriber before the simulation waits
const STATUS_BUFFER: usize = 16;

/// A plan along with the inputs it was computed from.
#[derive(Debug, Clone)]
pub struct PlannedTrip {
    pub plan: TripPlan,
    pub vehicle: VehicleProfile,
    pub start_battery_percent: f64,
}

/// A trip whose simulation is running.
#[derive(Debug)]
pub struct StartedTrip {
    pub trip_id: Uuid,
    pub plan: TripPlan,
    pub statuses: mpsc::Receiver<VehicleStatus>,
}

#[derive(Debug)]
pub struct Engine {
    config: ServiceConfig,
    planner: Planner,
    simulations: SimulationRegistry,
}

impl Engine {
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Engine {
            planner: Planner::new(config.planner.clone()),
            config,
            simulations: SimulationRegistry::default(),
        })
    }

    pub fn stations(&self) -> &[ChargingStation] {
        &self.config.stations
    }

    /// Validate a request and plan its trip, departing at `departure`.
    pub fn plan_trip(
        &self,
        request: &TripRequest,
        departure: DateTime<Utc>,
    ) -> Result<PlannedTrip, PlanError> {
        let origin = request
            .origin
            .as_ref()
            .ok_or_else(|| PlanError::MalformedRequest {
                reason: "missing origin".into(),
            })?;
        let destination = request
            .destination
            .as_ref()
            .ok_or_else(|| PlanError::MalformedRequest {
                reason: "missing destination".into(),
            })?;
        let start_battery_percent = request
            .current_battery_level
            .unwrap_or(self.config.default_battery_level);
        if !(0.0..=100.0).contains(&start_battery_percent) {
            return Err(PlanError::MalformedRequest {
                reason: format!("battery level {} is not a percentage", start_battery_percent),
            });
        }
        let vehicle = self.config.vehicle(request.vehicle_id.as_deref()).clone();

        tracing::info!(
            "Planning trip for vehicle {} from ({}, {}) to ({}, {})",
            vehicle.id,
            origin.coordinate.latitude,
            origin.coordinate.longitude,
            destination.coordinate.latitude,
            destination.coordinate.longitude
        );
        let path = interpolate_path(
            &origin.coordinate,
            &destination.coordinate,
            self.config.planner.route_steps,
        )?;
        let plan = self.planner.plan(
            &path,
            &self.config.stations,
            &vehicle,
            start_battery_percent,
            departure,
        )?;
        Ok(PlannedTrip {
            plan,
            vehicle,
            start_battery_percent,
        })
    }

    /// Plan a trip departing now and start its simulation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_trip(&self, request: &TripRequest) -> Result<StartedTrip, PlanError> {
        let PlannedTrip {
            plan,
            vehicle,
            start_battery_percent,
        } = self.plan_trip(request, Utc::now())?;
        let simulator = Simulator::new(
            plan.clone(),
            vehicle,
            start_battery_percent,
            self.config.simulation.clone(),
        )?;

        let trip_id = Uuid::new_v4();
        let (handle, statuses) = spawn_simulation(
            trip_id,
            simulator,
            Duration::from_millis(self.config.simulation.tick_interval_ms),
            STATUS_BUFFER,
        );
        self.simulations.insert(handle);
        Ok(StartedTrip {
            trip_id,
            plan,
            statuses,
        })
    }

    pub fn trip_status(&self, trip_id: Uuid) -> Option<VehicleStatus> {
        self.simulations.latest(trip_id)
    }

    pub fn active_trips(&self) -> Vec<Uuid> {
        self.simulations.active_trips()
    }

    pub async fn stop_trip(&self, trip_id: Uuid) -> bool {
        self.simulations.cancel(trip_id).await
    }

    pub async fn shutdown(&self) {
        tracing::info!("Stopping all simulations");
        self.simulations.cancel_all().await;
    }
}
