//! Trip planner API Library
//!
//! This library provides the HTTP and WebSocket API of the EV trip planner.

mod station;
mod trip;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trip_engine::Engine;

pub use crate::ws::TripSession;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stations", get(station::list_stations))
        .route("/trips", get(trip::list_trips))
        .route("/trips/plan", post(trip::plan_trip))
        .route("/trips/{trip_id}/status", get(trip::trip_status))
        .route("/trips/{trip_id}/stop", post(trip::stop_trip))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use trip_core::{ChargingStation, Coordinate, Location};
    use trip_engine::ServiceConfig;
    use trip_engine::protocol::{ClientMessage, ServerMessage, TripRequest};
    use tower::util::ServiceExt;

    fn test_engine() -> Arc<Engine> {
        let mut config = ServiceConfig::default();
        config.stations = vec![ChargingStation {
            id: "spklu-101".into(),
            name: "SPKLU Rest Area KM 72".into(),
            location: Location::from(Coordinate::new(-6.4870, 107.1350).unwrap()),
            port_number: 1,
            available: true,
            max_power_kw: None,
        }];
        config.simulation.tick_interval_ms = 60_000;
        Arc::new(Engine::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_app(test_engine());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_integration_session_then_http_status_and_stop() {
        let engine = test_engine();
        let app = create_app(engine.clone());

        // Start a trip the way a WebSocket client does
        let mut session = TripSession::new(engine.clone());
        let request = ClientMessage::TripRequest(TripRequest {
            origin: Some(Location::from(Coordinate::new(-6.2, 106.8167).unwrap())),
            destination: Some(Location::from(Coordinate::new(-6.9147, 107.6098).unwrap())),
            vehicle_id: None,
            current_battery_level: Some(40.0),
        });
        let reply = session
            .handle_text(&serde_json::to_string(&request).unwrap())
            .await;
        let ServerMessage::RouteResponse(route) = reply else {
            panic!("Expected a route response, got {:?}", reply);
        };
        let trip_id = route.trip_id.expect("Missing trip id");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/trips/{}/status", trip_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: ServerMessage = serde_json::from_slice(&body).unwrap();
        let ServerMessage::VehicleStatus(status) = status else {
            panic!("Expected a vehicle status");
        };
        assert_eq!(status.current_location, route.route[0]);

        // Stop the trip
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/trips/{}/stop", trip_id))
                    .method("POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/trips/{}/status", trip_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
