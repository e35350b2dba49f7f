use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use trip_core::VehicleStatus;
use uuid::Uuid;

use crate::runner::SimulationHandle;

/// Running simulations indexed by trip id.
#[derive(Debug, Default)]
pub struct SimulationRegistry {
    runs: Mutex<HashMap<Uuid, SimulationHandle>>,
}

impl SimulationRegistry {
    fn runs(&self) -> MutexGuard<'_, HashMap<Uuid, SimulationHandle>> {
        // A handle map cannot be left half-updated, ignore poisoning
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a simulation. Finished runs are pruned on the way.
    pub fn insert(&self, handle: SimulationHandle) {
        let mut runs = self.runs();
        runs.retain(|_, run| !run.is_finished());
        runs.insert(handle.trip_id(), handle);
    }

    pub fn latest(&self, trip_id: Uuid) -> Option<VehicleStatus> {
        self.runs().get(&trip_id).map(SimulationHandle::latest)
    }

    pub fn active_trips(&self) -> Vec<Uuid> {
        let mut trips: Vec<Uuid> = self
            .runs()
            .values()
            .filter(|run| !run.is_finished())
            .map(SimulationHandle::trip_id)
            .collect();
        trips.sort();
        trips
    }

    /// Cancel the simulation of `trip_id`; false if it is not registered.
    pub async fn cancel(&self, trip_id: Uuid) -> bool {
        let handle = self.runs().remove(&trip_id);
        match handle {
            Some(handle) => {
                handle.cancel().await;
                true
            }
            None => false,
        }
    }

    pub async fn cancel_all(&self) {
        let handles: Vec<SimulationHandle> = self.runs().drain().map(|(_, run)| run).collect();
        for handle in handles {
            handle.cancel().await;
        }
    }
}
