use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trip_core::{ChargingStation, PlanError, PlannerSettings, SimulationSettings, VehicleProfile};

/// Battery level assumed when a trip request does not carry one
const DEFAULT_BATTERY_LEVEL: f64 = 85.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Station {id} appears more than once in the catalog")]
    DuplicateStation { id: String },
    #[error("Vehicle {id} appears more than once")]
    DuplicateVehicle { id: String },
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] PlanError),
}

/// Service configuration: station catalog, vehicle profiles and tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub stations: Vec<ChargingStation>,
    /// Profile used when a request names no known vehicle
    #[serde(default)]
    pub default_vehicle: VehicleProfile,
    #[serde(default)]
    pub vehicles: Vec<VehicleProfile>,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default = "default_battery_level")]
    pub default_battery_level: f64,
}

fn default_battery_level() -> f64 {
    DEFAULT_BATTERY_LEVEL
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            stations: Vec::new(),
            default_vehicle: VehicleProfile::default(),
            vehicles: Vec::new(),
            planner: PlannerSettings::default(),
            simulation: SimulationSettings::default(),
            default_battery_level: DEFAULT_BATTERY_LEVEL,
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut station_ids = HashSet::new();
        for station in &self.stations {
            station.validate()?;
            if !station_ids.insert(station.id.as_str()) {
                return Err(ConfigError::DuplicateStation {
                    id: station.id.clone(),
                });
            }
        }

        self.default_vehicle.validate()?;
        let mut vehicle_ids = HashSet::new();
        for vehicle in &self.vehicles {
            vehicle.validate()?;
            if !vehicle_ids.insert(vehicle.id.as_str()) {
                return Err(ConfigError::DuplicateVehicle {
                    id: vehicle.id.clone(),
                });
            }
        }

        self.planner.validate()?;
        self.simulation.validate()?;
        if !(0.0..=100.0).contains(&self.default_battery_level) {
            return Err(PlanError::InvalidParameter {
                name: "defaultBatteryLevel",
                value: self.default_battery_level,
            }
            .into());
        }
        Ok(())
    }

    /// Profile of `vehicle_id`, or the default one.
    pub fn vehicle(&self, vehicle_id: Option<&str>) -> &VehicleProfile {
        let Some(vehicle_id) = vehicle_id else {
            return &self.default_vehicle;
        };
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.id == vehicle_id)
            .unwrap_or_else(|| {
                tracing::warn!("Unknown vehicle {}, using the default profile", vehicle_id);
                &self.default_vehicle
            })
    }
}
