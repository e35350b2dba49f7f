//! Runs a [`Simulator`] on its own tokio task at a fixed tick interval.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use trip_core::{SimulationState, Simulator, VehicleStatus};
use uuid::Uuid;

/// Owner side of a running simulation.
///
/// Dropping the handle aborts the task; [`SimulationHandle::cancel`] stops it
/// and waits until it is gone.
#[derive(Debug)]
pub struct SimulationHandle {
    trip_id: Uuid,
    cancel: Option<oneshot::Sender<()>>,
    latest: watch::Receiver<VehicleStatus>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    /// Last status produced by the simulation.
    pub fn latest(&self) -> VehicleStatus {
        self.latest.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the simulation. No tick is produced once this returns.
    pub async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already be over
            let _ = cancel.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                tracing::error!("Simulation task of trip {} failed: {}", self.trip_id, e);
            }
        }
        tracing::info!("Simulation of trip {} cancelled", self.trip_id);
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the simulation of a trip.
///
/// Every tick's status is sent to the returned receiver. The task ends once
/// the vehicle arrived, when the receiver is dropped, or on cancellation. A
/// stranded vehicle keeps reporting its last status until cancelled.
pub fn spawn_simulation(
    trip_id: Uuid,
    mut simulator: Simulator,
    tick_interval: Duration,
    buffer: usize,
) -> (SimulationHandle, mpsc::Receiver<VehicleStatus>) {
    let (status_tx, status_rx) = mpsc::channel(buffer.max(1));
    let (latest_tx, latest_rx) = watch::channel(simulator.snapshot());
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tracing::info!("Starting simulation of trip {}", trip_id);
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => break,
                _ = ticker.tick() => {}
            }

            let status = simulator.tick();
            tracing::debug!(
                "Trip {} at ({}, {}), battery {:.1}%",
                trip_id,
                status.current_location.latitude,
                status.current_location.longitude,
                status.battery_level_percent
            );
            latest_tx.send_replace(status.clone());

            tokio::select! {
                biased;
                _ = &mut cancel_rx => break,
                sent = status_tx.send(status) => {
                    if sent.is_err() {
                        tracing::debug!("Trip {} has no subscriber left", trip_id);
                        break;
                    }
                }
            }

            if simulator.state() == SimulationState::Arrived {
                tracing::info!("Simulation of trip {} complete", trip_id);
                break;
            }
        }
    });

    let handle = SimulationHandle {
        trip_id,
        cancel: Some(cancel_tx),
        latest: latest_rx,
        task,
    };
    (handle, status_rx)
}
