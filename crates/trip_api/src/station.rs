use axum::{Json, extract::State};
use std::sync::Arc;
use trip_core::ChargingStation;
use trip_engine::Engine;

/// Get the charging station catalog
pub async fn list_stations(State(engine): State<Arc<Engine>>) -> Json<Vec<ChargingStation>> {
    tracing::info!("Listing charging stations");
    Json(engine.stations().to_vec())
}
