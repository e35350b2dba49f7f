//! Step-by-step replay of a planned trip.
//!
//! A [`Simulator`] walks the plan's path one point per tick while driving,
//! holds its position while charging and produces one [`VehicleStatus`] per
//! tick. It owns its counters; one instance serves exactly one trip.

use chrono::{DateTime, Utc};

use crate::distance::{drive_minutes, haversine_km, minutes_to_duration};
use crate::{
    ChargingStop, PlanError, SimulationSettings, SimulationState, TripPlan, VehicleProfile,
    VehicleStatus,
};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Simulator {
    plan: TripPlan,
    vehicle: VehicleProfile,
    settings: SimulationSettings,
    state: SimulationState,
    index: usize,
    battery_percent: f64,
    next_stop: usize,
    sim_time: DateTime<Utc>,
    /// Whether the last tick charged the battery
    charged: bool,
    /// Whether the last tick moved the vehicle
    moved: bool,
}

impl Simulator {
    pub fn new(
        plan: TripPlan,
        vehicle: VehicleProfile,
        start_battery_percent: f64,
        settings: SimulationSettings,
    ) -> Result<Self, PlanError> {
        vehicle.validate()?;
        settings.validate()?;
        if plan.path.len() < 2 {
            return Err(PlanError::malformed("a path needs at least two points"));
        }
        if !(0.0..=100.0).contains(&start_battery_percent) {
            return Err(PlanError::malformed(format!(
                "battery level {} is not a percentage",
                start_battery_percent
            )));
        }
        Ok(Simulator {
            sim_time: plan.departure_time,
            plan,
            vehicle,
            settings,
            state: SimulationState::Driving,
            index: 0,
            battery_percent: start_battery_percent,
            next_stop: 0,
            charged: false,
            moved: false,
        })
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Arrived and stranded runs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SimulationState::Arrived | SimulationState::Stranded
        )
    }

    /// Advance the simulation by one tick and report the new status.
    pub fn tick(&mut self) -> VehicleStatus {
        self.charged = false;
        self.moved = false;
        match self.state {
            SimulationState::Driving => self.drive(),
            SimulationState::Charging => self.charge(),
            SimulationState::Arrived | SimulationState::Stranded => {}
        }
        self.snapshot()
    }

    /// Status of the vehicle as of the last tick.
    pub fn snapshot(&self) -> VehicleStatus {
        let current_speed_kmh = if self.moved && self.state == SimulationState::Driving {
            self.plan.average_speed_kmh
        } else {
            0.0
        };
        VehicleStatus {
            current_location: self.plan.path[self.index],
            battery_level_percent: self.battery_percent,
            is_charging: self.charged,
            current_speed_kmh,
            estimated_arrival: self.estimated_arrival(),
            next_stop: self.pending_stop().cloned(),
            state: self.state,
            stranded: self.state == SimulationState::Stranded,
        }
    }

    fn pending_stop(&self) -> Option<&ChargingStop> {
        self.plan.stops.get(self.next_stop)
    }

    fn at_pending_stop(&self) -> bool {
        self.pending_stop().is_some_and(|stop| {
            haversine_km(&self.plan.path[self.index], &stop.location.coordinate)
                <= self.settings.arrival_tolerance_km
        })
    }

    fn drive(&mut self) {
        if self.at_pending_stop() {
            if let Some(stop) = self.pending_stop() {
                if self.battery_percent < stop.target_battery_percent - EPSILON {
                    tracing::debug!("Vehicle reached {}, start charging", stop.station_id);
                    self.state = SimulationState::Charging;
                    self.charge();
                    return;
                }
                tracing::debug!("Skipping charging stop {}", stop.station_id);
                self.next_stop += 1;
            }
        }

        let from = self.plan.path[self.index];
        let leg_km = haversine_km(&from, &self.plan.path[self.index + 1]);
        let drain = self
            .vehicle
            .kwh_to_percent(leg_km * self.vehicle.consumption_kwh_per_km);
        // The vehicle only moves when the whole leg can be paid for
        if drain > self.battery_percent + EPSILON {
            tracing::warn!(
                "Vehicle stranded at ({}, {}) with {:.2}% left",
                from.latitude,
                from.longitude,
                self.battery_percent
            );
            self.state = SimulationState::Stranded;
            return;
        }

        self.index += 1;
        self.moved = true;
        self.battery_percent = (self.battery_percent - drain).max(0.0);
        self.sim_time += minutes_to_duration(drive_minutes(leg_km, self.plan.average_speed_kmh));

        if self.index == self.plan.path.len() - 1 {
            tracing::info!("Vehicle arrived at destination");
            self.state = SimulationState::Arrived;
        } else if self.battery_percent <= 0.0 && !self.at_pending_stop() {
            tracing::warn!(
                "Vehicle stranded at ({}, {})",
                self.plan.path[self.index].latitude,
                self.plan.path[self.index].longitude
            );
            self.state = SimulationState::Stranded;
        }
    }

    fn charge(&mut self) {
        let Some(stop) = self.plan.stops.get(self.next_stop) else {
            self.state = SimulationState::Driving;
            return;
        };
        let power_kw = stop.energy_amount / (stop.duration_minutes() / 60.0);
        let power_kw = if power_kw.is_finite() {
            power_kw.min(self.vehicle.charging_power_kw)
        } else {
            self.vehicle.charging_power_kw
        };
        let target = stop.target_battery_percent.min(100.0);
        let increment = self
            .vehicle
            .kwh_to_percent(power_kw * self.settings.charge_tick_minutes / 60.0);

        let before = self.battery_percent;
        self.battery_percent = (self.battery_percent + increment).min(target).max(before);
        self.charged = true;
        self.sim_time = (self.sim_time + minutes_to_duration(self.settings.charge_tick_minutes))
            .min(stop.end_time.max(self.sim_time));

        if self.battery_percent >= target - EPSILON || self.sim_time >= stop.end_time {
            tracing::debug!(
                "Charging at {} complete, battery at {:.1}%",
                stop.station_id,
                self.battery_percent
            );
            self.next_stop += 1;
            self.state = SimulationState::Driving;
        }
    }

    fn estimated_arrival(&self) -> DateTime<Utc> {
        let remaining_km: f64 = self.plan.path[self.index..]
            .windows(2)
            .map(|leg| haversine_km(&leg[0], &leg[1]))
            .sum();
        let mut minutes = drive_minutes(remaining_km, self.plan.average_speed_kmh);
        for (i, stop) in self.plan.stops.iter().enumerate().skip(self.next_stop) {
            if i == self.next_stop && self.state == SimulationState::Charging {
                minutes += (stop.end_time - self.sim_time).num_milliseconds().max(0) as f64 / 60_000.0;
            } else {
                minutes += stop.duration_minutes();
            }
        }
        self.sim_time + minutes_to_duration(minutes)
    }
}
