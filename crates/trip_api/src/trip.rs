use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trip_core::PlanError;
use trip_engine::Engine;
use trip_engine::protocol::{RouteResponse, ServerMessage, TripRequest};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrips {
    pub trips: Vec<Uuid>,
}

fn plan_error_to_response(error: PlanError) -> impl IntoResponse {
    let status = match error {
        PlanError::UnreachableDestination { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlanError::InvalidCoordinate { .. }
        | PlanError::MalformedRequest { .. }
        | PlanError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
    };

    (status, Json(ServerMessage::error(error)))
}

/// Plan a trip without simulating it
pub async fn plan_trip(
    State(engine): State<Arc<Engine>>,
    Json(payload): Json<TripRequest>,
) -> impl IntoResponse {
    match engine.plan_trip(&payload, Utc::now()) {
        Ok(planned) => (
            StatusCode::OK,
            Json(ServerMessage::RouteResponse(RouteResponse::from_plan(
                &planned.plan,
                None,
            ))),
        )
            .into_response(),
        Err(error) => plan_error_to_response(error).into_response(),
    }
}

/// List the trips with a running simulation
pub async fn list_trips(State(engine): State<Arc<Engine>>) -> Json<ActiveTrips> {
    Json(ActiveTrips {
        trips: engine.active_trips(),
    })
}

/// Get the last vehicle status of a trip
pub async fn trip_status(
    State(engine): State<Arc<Engine>>,
    Path(trip_id): Path<Uuid>,
) -> impl IntoResponse {
    match engine.trip_status(trip_id) {
        Some(status) => (
            StatusCode::OK,
            Json(ServerMessage::VehicleStatus(status.into())),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ServerMessage::error(format!("Trip {} not found", trip_id))),
        )
            .into_response(),
    }
}

/// Stop the simulation of a trip
pub async fn stop_trip(
    State(engine): State<Arc<Engine>>,
    Path(trip_id): Path<Uuid>,
) -> impl IntoResponse {
    tracing::info!("Stopping trip {}", trip_id);
    if engine.stop_trip(trip_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ServerMessage::error(format!("Trip {} not found", trip_id))),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        routing::{get, post},
    };
    use axum::{body::Body, http::Request};
    use tower::util::ServiceExt;
    use trip_core::{ChargingStation, Coordinate, Location};
    use trip_engine::ServiceConfig;

    /// Create the application router with trip endpoints
    pub fn create_app(engine: Arc<Engine>) -> Router {
        Router::new()
            .route("/trips", get(list_trips))
            .route("/trips/plan", post(plan_trip))
            .route("/trips/{trip_id}/status", get(trip_status))
            .route("/trips/{trip_id}/stop", post(stop_trip))
            .with_state(engine)
    }

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
        Arc::new(Engine::new(config).unwrap())
    }

    async fn post_plan(app: Router, body: &str) -> (StatusCode, ServerMessage) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/trips/plan")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_plan_trip() {
        let app = create_app(test_engine());
        let (status, message) = post_plan(
            app,
            r#"{
                "origin": {"latitude": -6.2, "longitude": 106.8167},
                "destination": {"latitude": -6.9147, "longitude": 107.6098},
                "currentBatteryLevel": 40
            }"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ServerMessage::RouteResponse(route) = message else {
            panic!("Expected a route response, got {:?}", message);
        };
        assert!(route.trip_id.is_none());
        assert_eq!(route.charging_schedules.len(), 1);
        assert_eq!(route.charging_schedules[0].station_id, "spklu-101");
        assert_eq!(route.route.len(), 12);
        assert_eq!(route.total_cost, route.charging_schedules[0].cost);
        assert!(route.total_distance > 110.0);
    }

    #[tokio::test]
    async fn test_plan_trip_unreachable() {
        let app = create_app(test_engine());
        let (status, message) = post_plan(
            app,
            r#"{
                "origin": {"latitude": -6.2, "longitude": 106.8167},
                "destination": {"latitude": -6.9147, "longitude": 107.6098},
                "currentBatteryLevel": 30
            }"#,
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let ServerMessage::Error { message } = message else {
            panic!("Expected an error");
        };
        assert!(message.contains("unreachable"));
    }

    #[tokio::test]
    async fn test_plan_trip_missing_origin() {
        let app = create_app(test_engine());
        let (status, message) = post_plan(
            app,
            r#"{"destination": {"latitude": -6.9147, "longitude": 107.6098}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            message,
            ServerMessage::error("Malformed request: missing origin")
        );
    }

    #[tokio::test]
    async fn test_plan_trip_invalid_coordinate() {
        let app = create_app(test_engine());
        let (status, _) = post_plan(
            app,
            r#"{
                "origin": {"latitude": -96.2, "longitude": 106.8167},
                "destination": {"latitude": -6.9147, "longitude": 107.6098}
            }"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_trips_empty() {
        let app = create_app(test_engine());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/trips")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let trips: ActiveTrips = serde_json::from_slice(&body).unwrap();
        assert!(trips.trips.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_trip() {
        let app = create_app(test_engine());
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/trips/{}/stop", Uuid::new_v4()))
                    .method("POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
