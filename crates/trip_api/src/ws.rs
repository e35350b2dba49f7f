//! WebSocket endpoint streaming trip plans and vehicle statuses.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use trip_core::VehicleStatus;
use trip_engine::Engine;
use trip_engine::protocol::{ClientMessage, RouteResponse, ServerMessage};
use uuid::Uuid;

/// State of one WebSocket connection: at most one simulated trip at a time.
pub struct TripSession {
    engine: Arc<Engine>,
    active_trip: Option<Uuid>,
    statuses: Option<mpsc::Receiver<VehicleStatus>>,
}

impl TripSession {
    pub fn new(engine: Arc<Engine>) -> Self {
        TripSession {
            engine,
            active_trip: None,
            statuses: None,
        }
    }

    pub fn active_trip(&self) -> Option<Uuid> {
        self.active_trip
    }

    /// Handle one text frame and produce the reply.
    ///
    /// A new trip request replaces the session's running simulation.
    pub async fn handle_text(&mut self, text: &str) -> ServerMessage {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Rejecting client message: {}", e);
                return ServerMessage::error(format!("Malformed request: {}", e));
            }
        };

        match message {
            ClientMessage::TripRequest(request) => {
                self.stop().await;
                match self.engine.start_trip(&request) {
                    Ok(trip) => {
                        self.active_trip = Some(trip.trip_id);
                        self.statuses = Some(trip.statuses);
                        ServerMessage::RouteResponse(RouteResponse::from_plan(
                            &trip.plan,
                            Some(trip.trip_id),
                        ))
                    }
                    Err(e) => {
                        tracing::info!("Trip request rejected: {}", e);
                        ServerMessage::error(e)
                    }
                }
            }
        }
    }

    /// Next status of the running trip.
    ///
    /// Pending forever while no trip runs; `None` once the simulation ended.
    pub async fn next_status(&mut self) -> Option<ServerMessage> {
        let Some(statuses) = self.statuses.as_mut() else {
            return std::future::pending().await;
        };
        let received = statuses.recv().await;
        match received {
            Some(status) => Some(ServerMessage::VehicleStatus(status.into())),
            None => {
                self.statuses = None;
                None
            }
        }
    }

    /// Cancel the running simulation, if any.
    pub async fn stop(&mut self) {
        self.statuses = None;
        if let Some(trip_id) = self.active_trip.take() {
            self.engine.stop_trip(trip_id).await;
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(engine): State<Arc<Engine>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, engine))
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    socket
        .send(Message::Text(message.to_json().into()))
        .await
        .is_ok()
}

async fn handle_socket(mut socket: WebSocket, engine: Arc<Engine>) {
    tracing::info!("New client connected");
    let mut session = TripSession::new(engine);

    let greeting = ServerMessage::ConnectionEstablished {
        message: "Connected to EV Charging Scheduler".into(),
    };
    if !send(&mut socket, &greeting).await {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = session.handle_text(text.as_str()).await;
                        if !send(&mut socket, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = ServerMessage::error("Binary messages are not supported");
                        if !send(&mut socket, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            Some(status) = session.next_status() => {
                if !send(&mut socket, &status).await {
                    break;
                }
            }
        }
    }

    session.stop().await;
    tracing::info!("Client disconnected");
}
