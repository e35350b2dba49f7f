use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PlanError> {
        let coordinate = Coordinate {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check the latitude/longitude ranges.
    ///
    /// Needed for values which did not go through [`Coordinate::new`], such as
    /// deserialized requests. NaN is never in range.
    pub fn validate(&self) -> Result<(), PlanError> {
        if (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude) {
            Ok(())
        } else {
            Err(PlanError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<Coordinate> for Location {
    fn from(coordinate: Coordinate) -> Self {
        Location {
            coordinate,
            address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStation {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub port_number: u32,
    pub available: bool,
    /// Power cap of the station in kW, if lower than what vehicles accept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_power_kw: Option<f64>,
}

impl ChargingStation {
    pub fn validate(&self) -> Result<(), PlanError> {
        self.location.coordinate.validate()?;
        if self.port_number == 0 {
            return Err(PlanError::InvalidParameter {
                name: "portNumber",
                value: 0.0,
            });
        }
        if let Some(power) = self.max_power_kw {
            positive("maxPowerKw", power)?;
        }
        Ok(())
    }

    /// Charging power actually delivered to `vehicle` at this station.
    pub fn effective_power_kw(&self, vehicle: &VehicleProfile) -> f64 {
        self.max_power_kw
            .map_or(vehicle.charging_power_kw, |power| {
                power.min(vehicle.charging_power_kw)
            })
    }
}

/// A charging stop of a planned trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStop {
    pub station_id: String,
    pub station_name: String,
    pub location: Location,
    pub port_number: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Energy delivered in kWh
    pub energy_amount: f64,
    /// Cost in currency minor units
    pub cost: u64,
    /// Battery level expected when the stop ends
    pub target_battery_percent: f64,
}

impl ChargingStop {
    pub fn duration_minutes(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 60_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    pub id: String,
    /// Usable battery capacity in kWh
    pub battery_capacity_kwh: f64,
    pub consumption_kwh_per_km: f64,
    /// Maximum charging power accepted by the vehicle in kW
    pub charging_power_kw: f64,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        VehicleProfile {
            id: "default".into(),
            battery_capacity_kwh: 50.0,
            consumption_kwh_per_km: 0.2,
            charging_power_kw: 50.0,
        }
    }
}

impl VehicleProfile {
    pub fn validate(&self) -> Result<(), PlanError> {
        positive("batteryCapacityKwh", self.battery_capacity_kwh)?;
        positive("consumptionKwhPerKm", self.consumption_kwh_per_km)?;
        positive("chargingPowerKw", self.charging_power_kw)
    }

    pub fn kwh_to_percent(&self, kwh: f64) -> f64 {
        kwh / self.battery_capacity_kwh * 100.0
    }

    pub fn percent_to_kwh(&self, percent: f64) -> f64 {
        percent / 100.0 * self.battery_capacity_kwh
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    /// Battery percentage the planner keeps in reserve
    pub reserve_percent: f64,
    /// Maximum distance between the path and a candidate station
    pub detour_radius_km: f64,
    /// Price of one kWh in currency minor units
    pub tariff_per_kwh: f64,
    pub average_speed_kmh: f64,
    /// Number of legs of the interpolated route
    pub route_steps: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        PlannerSettings {
            reserve_percent: 20.0,
            detour_radius_km: 10.0,
            tariff_per_kwh: 2000.0,
            average_speed_kmh: 50.0,
            route_steps: 10,
        }
    }
}

impl PlannerSettings {
    pub fn validate(&self) -> Result<(), PlanError> {
        if !(0.0..100.0).contains(&self.reserve_percent) {
            return Err(PlanError::InvalidParameter {
                name: "reservePercent",
                value: self.reserve_percent,
            });
        }
        if !(self.detour_radius_km >= 0.0) {
            return Err(PlanError::InvalidParameter {
                name: "detourRadiusKm",
                value: self.detour_radius_km,
            });
        }
        if !(self.tariff_per_kwh >= 0.0) {
            return Err(PlanError::InvalidParameter {
                name: "tariffPerKwh",
                value: self.tariff_per_kwh,
            });
        }
        if self.route_steps == 0 {
            return Err(PlanError::InvalidParameter {
                name: "routeSteps",
                value: 0.0,
            });
        }
        positive("averageSpeedKmh", self.average_speed_kmh)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationSettings {
    /// Wall-clock delay between two snapshots
    pub tick_interval_ms: u64,
    /// Simulated time covered by one charging tick
    pub charge_tick_minutes: f64,
    /// Distance under which the vehicle is considered at a stop
    pub arrival_tolerance_km: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            tick_interval_ms: 2000,
            charge_tick_minutes: 5.0,
            arrival_tolerance_km: 0.05,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.tick_interval_ms == 0 {
            return Err(PlanError::InvalidParameter {
                name: "tickIntervalMs",
                value: 0.0,
            });
        }
        positive("chargeTickMinutes", self.charge_tick_minutes)?;
        if !(self.arrival_tolerance_km >= 0.0) {
            return Err(PlanError::InvalidParameter {
                name: "arrivalToleranceKm",
                value: self.arrival_tolerance_km,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    pub path: Vec<Coordinate>,
    pub stops: Vec<ChargingStop>,
    pub total_distance_km: f64,
    /// Driving and charging time
    pub total_travel_time_minutes: f64,
    pub total_cost: u64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub average_speed_kmh: f64,
    pub start_battery_percent: f64,
    pub arrival_battery_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Driving,
    Charging,
    Arrived,
    Stranded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    pub current_location: Coordinate,
    pub battery_level_percent: f64,
    pub is_charging: bool,
    pub current_speed_kmh: f64,
    pub estimated_arrival: DateTime<Utc>,
    pub next_stop: Option<ChargingStop>,
    pub state: SimulationState,
    pub stranded: bool,
}

fn positive(name: &'static str, value: f64) -> Result<(), PlanError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PlanError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_ranges() {
        assert!(Coordinate::new(-6.2, 106.8167).is_ok());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
        assert!(matches!(
            Coordinate::new(91.0, 0.0),
            Err(PlanError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            Coordinate::new(0.0, 180.5),
            Err(PlanError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_location_json_is_flat() {
        let json = r#"{"latitude": -6.2267, "longitude": 106.7968, "address": "Senayan City, Jakarta"}"#;
        let location: Location = serde_json::from_str(json).unwrap();
        assert_eq!(location.coordinate.latitude, -6.2267);
        assert_eq!(location.address.as_deref(), Some("Senayan City, Jakarta"));

        let bare = serde_json::to_value(Location::from(location.coordinate)).unwrap();
        assert_eq!(
            bare,
            serde_json::json!({"latitude": -6.2267, "longitude": 106.7968})
        );
    }

    #[test]
    fn test_station_deserialization() {
        let json = r#"
        {
          "id": "spklu-001",
          "name": "SPKLU Senayan City",
          "location": {"latitude": -6.2267, "longitude": 106.7968},
          "portNumber": 1,
          "available": true
        }
        "#;
        let station: ChargingStation = serde_json::from_str(json).unwrap();
        assert_eq!(station.port_number, 1);
        assert!(station.max_power_kw.is_none());
        assert!(station.validate().is_ok());
        assert_eq!(station.effective_power_kw(&VehicleProfile::default()), 50.0);

        let capped = ChargingStation {
            max_power_kw: Some(22.0),
            ..station
        };
        assert_eq!(capped.effective_power_kw(&VehicleProfile::default()), 22.0);
    }

    #[test]
    fn test_settings_defaults_from_partial_json() {
        let settings: PlannerSettings = serde_json::from_str(r#"{"reservePercent": 15}"#).unwrap();
        assert_eq!(settings.reserve_percent, 15.0);
        assert_eq!(settings.detour_radius_km, 10.0);
        assert!(settings.validate().is_ok());

        let broken = PlannerSettings {
            average_speed_kmh: 0.0,
            ..PlannerSettings::default()
        };
        assert!(matches!(
            broken.validate(),
            Err(PlanError::InvalidParameter {
                name: "averageSpeedKmh",
                ..
            })
        ));
    }

    #[test]
    fn test_vehicle_percent_conversions() {
        let vehicle = VehicleProfile::default();
        assert_eq!(vehicle.percent_to_kwh(80.0), 40.0);
        assert_eq!(vehicle.kwh_to_percent(10.0), 20.0);
        assert!(
            VehicleProfile {
                consumption_kwh_per_km: -0.1,
                ..VehicleProfile::default()
            }
            .validate()
            .is_err()
        );
    }
}
