use chrono::{DateTime, Duration, Utc};

use crate::distance::{drive_minutes, haversine_km, minutes_to_duration};
use crate::{ChargingStation, ChargingStop, Coordinate, PlanError, PlannerSettings, TripPlan, VehicleProfile};

/// Below this amount a charging stop would not move the battery.
const MIN_CHARGE_KWH: f64 = 1e-3;

/// Slack on reserve checks, so that summing legs in another order does not
/// trigger a stop.
const RESERVE_EPSILON_KWH: f64 = 1e-9;

/// Places charging stops along a path.
///
/// Each call is independent: station availability is read from the catalog
/// and never updated.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    settings: PlannerSettings,
}

/// Running totals while walking the path.
struct Progress {
    battery_kwh: f64,
    distance_km: f64,
    elapsed_minutes: f64,
}

impl Planner {
    pub fn new(settings: PlannerSettings) -> Self {
        Planner { settings }
    }

    /// Plan the charging stops of a trip following `path`.
    ///
    /// A stop is placed as soon as the next leg would take the battery below
    /// the reserve threshold. The station coordinate is inserted in the
    /// returned path right after the position it was selected from.
    pub fn plan(
        &self,
        path: &[Coordinate],
        stations: &[ChargingStation],
        vehicle: &VehicleProfile,
        start_battery_percent: f64,
        departure: DateTime<Utc>,
    ) -> Result<TripPlan, PlanError> {
        if path.len() < 2 {
            return Err(PlanError::malformed("a path needs at least two points"));
        }
        path.iter().try_for_each(Coordinate::validate)?;
        vehicle.validate()?;
        self.settings.validate()?;
        if !(0.0..=100.0).contains(&start_battery_percent) {
            return Err(PlanError::malformed(format!(
                "battery level {} is not a percentage",
                start_battery_percent
            )));
        }

        let capacity_kwh = vehicle.battery_capacity_kwh;
        let reserve_kwh = vehicle.percent_to_kwh(self.settings.reserve_percent);
        let consumption = vehicle.consumption_kwh_per_km;

        // Distance left from each path point to the destination
        let mut remaining_km = vec![0.0; path.len()];
        for i in (0..path.len() - 1).rev() {
            remaining_km[i] = remaining_km[i + 1] + haversine_km(&path[i], &path[i + 1]);
        }

        let mut progress = Progress {
            battery_kwh: vehicle.percent_to_kwh(start_battery_percent),
            distance_km: 0.0,
            elapsed_minutes: 0.0,
        };
        let mut route = vec![path[0]];
        let mut stops: Vec<ChargingStop> = Vec::new();

        for (i, leg) in path.windows(2).enumerate() {
            let (from, to) = (&leg[0], &leg[1]);
            let leg_kwh = haversine_km(from, to) * consumption;

            if leg_kwh > 0.0 && progress.battery_kwh - leg_kwh < reserve_kwh - RESERVE_EPSILON_KWH {
                let (station, detour_km) =
                    self.select_station(from, stations, progress.battery_kwh, consumption)?;
                let station_position = station.location.coordinate;
                tracing::debug!(
                    "Charging required at ({}, {}), selected {} at {:.2} km",
                    from.latitude,
                    from.longitude,
                    station.id,
                    detour_km
                );
                self.drive(&mut progress, detour_km, consumption);
                route.push(station_position);

                let onward_km = haversine_km(&station_position, to);
                let target_kwh =
                    ((onward_km + remaining_km[i + 1]) * consumption + reserve_kwh).min(capacity_kwh);
                let energy_kwh = target_kwh - progress.battery_kwh;
                if energy_kwh < MIN_CHARGE_KWH {
                    return Err(PlanError::UnreachableDestination {
                        position: station_position,
                        reason: format!("charging at {} adds no usable energy", station.id),
                    });
                }
                if target_kwh - onward_km * consumption < reserve_kwh - RESERVE_EPSILON_KWH {
                    return Err(PlanError::UnreachableDestination {
                        position: station_position,
                        reason: format!(
                            "the leg after {} needs more than the usable battery capacity",
                            station.id
                        ),
                    });
                }

                let stop = self.charge(
                    &mut progress,
                    station,
                    vehicle,
                    energy_kwh,
                    target_kwh,
                    departure,
                );
                stops.push(stop);
                self.drive(&mut progress, onward_km, consumption);
            } else {
                self.drive(&mut progress, haversine_km(from, to), consumption);
            }
            route.push(*to);
        }

        let total_cost = stops.iter().map(|stop| stop.cost).sum();
        let plan = TripPlan {
            path: route,
            stops,
            total_distance_km: progress.distance_km,
            total_travel_time_minutes: progress.elapsed_minutes,
            total_cost,
            departure_time: departure,
            arrival_time: departure + minutes_to_duration(progress.elapsed_minutes),
            average_speed_kmh: self.settings.average_speed_kmh,
            start_battery_percent,
            arrival_battery_percent: vehicle.kwh_to_percent(progress.battery_kwh).clamp(0.0, 100.0),
        };
        tracing::info!(
            "Planned trip of {:.1} km with {} charging stop(s), total cost {}",
            plan.total_distance_km,
            plan.stops.len(),
            plan.total_cost
        );
        Ok(plan)
    }

    /// Nearest available station within the detour radius that the vehicle
    /// can still reach. Ties are broken on the lowest station id.
    fn select_station<'a>(
        &self,
        position: &Coordinate,
        stations: &'a [ChargingStation],
        battery_kwh: f64,
        consumption: f64,
    ) -> Result<(&'a ChargingStation, f64), PlanError> {
        stations
            .iter()
            .filter(|station| station.available)
            .map(|station| (station, haversine_km(position, &station.location.coordinate)))
            .filter(|(_, km)| *km <= self.settings.detour_radius_km && km * consumption <= battery_kwh)
            .min_by(|(a, a_km), (b, b_km)| a_km.total_cmp(b_km).then_with(|| a.id.cmp(&b.id)))
            .ok_or_else(|| PlanError::UnreachableDestination {
                position: *position,
                reason: format!(
                    "no available charging station within {} km",
                    self.settings.detour_radius_km
                ),
            })
    }

    fn drive(&self, progress: &mut Progress, km: f64, consumption: f64) {
        progress.battery_kwh -= km * consumption;
        progress.distance_km += km;
        progress.elapsed_minutes += drive_minutes(km, self.settings.average_speed_kmh);
    }

    fn charge(
        &self,
        progress: &mut Progress,
        station: &ChargingStation,
        vehicle: &VehicleProfile,
        energy_kwh: f64,
        target_kwh: f64,
        departure: DateTime<Utc>,
    ) -> ChargingStop {
        // Whole milliseconds, never empty
        let duration = minutes_to_duration(energy_kwh / station.effective_power_kw(vehicle) * 60.0)
            .max(Duration::milliseconds(1));
        let start_time = departure + minutes_to_duration(progress.elapsed_minutes);
        progress.elapsed_minutes += duration.num_milliseconds() as f64 / 60_000.0;
        progress.battery_kwh = target_kwh;

        ChargingStop {
            station_id: station.id.clone(),
            station_name: station.name.clone(),
            location: station.location.clone(),
            port_number: station.port_number,
            start_time,
            end_time: start_time + duration,
            energy_amount: energy_kwh,
            cost: (energy_kwh * self.settings.tariff_per_kwh).round() as u64,
            target_battery_percent: vehicle.kwh_to_percent(target_kwh),
        }
    }
}
