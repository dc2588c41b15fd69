//! Websocket endpoint streaming room events and accepting control-plane
//! actions, gated by the caller's [`events::Role`].

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use events::{ControlAction, Room};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RoleHeader;
use crate::state::AppState;

/// Flat query params, since `serde_urlencoded` can't deserialize an
/// internally-tagged enum. Exactly one of these four should be set; the
/// first one present wins.
#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub flow_id: Option<Uuid>,
    pub node_id: Option<String>,
    pub project_id: Option<Uuid>,
    pub execution_id: Option<Uuid>,
}

impl RoomQuery {
    fn into_room(self) -> Option<Room> {
        if let Some(id) = self.flow_id {
            return Some(Room::Flow(id));
        }
        if let Some(id) = self.node_id {
            return Some(Room::Node(id));
        }
        if let Some(id) = self.project_id {
            return Some(Room::Project(id));
        }
        if let Some(id) = self.execution_id {
            return Some(Room::Execution(id));
        }
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlMessage {
    Pause { execution_id: Uuid },
    Resume { execution_id: Uuid },
    Abort { execution_id: Uuid },
    Retry { execution_id: Uuid },
}

pub async fn subscribe(
    ws: WebSocketUpgrade,
    Query(query): Query<RoomQuery>,
    RoleHeader(role): RoleHeader,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(room) = query.into_room() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, room, role, state)).into_response()
}

async fn handle_socket(mut socket: WebSocket, room: Room, role: events::Role, state: AppState) {
    let mut subscription = state.events.subscribe(room);

    for event in subscription.history {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = subscription.receiver.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_control_message(&text, role, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    _ => {}
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &events::Event) -> Result<(), axum::Error> {
    let Ok(text) = serde_json::to_string(event) else { return Ok(()) };
    socket.send(Message::Text(text)).await
}

async fn handle_control_message(text: &str, role: events::Role, state: &AppState) {
    let Ok(message) = serde_json::from_str::<ControlMessage>(text) else { return };

    let (execution_id, action) = match message {
        ControlMessage::Pause { execution_id } => (execution_id, ControlAction::Pause),
        ControlMessage::Resume { execution_id } => (execution_id, ControlAction::Resume),
        ControlMessage::Abort { execution_id } => (execution_id, ControlAction::Abort),
        ControlMessage::Retry { execution_id } => (execution_id, ControlAction::Retry),
    };

    if role.authorize(action).is_err() {
        return;
    }

    let Some(executor) = state.executors.get(execution_id).await else { return };

    let _ = match action {
        ControlAction::Pause => executor.pause().await,
        ControlAction::Resume => executor.resume().await,
        ControlAction::Abort => executor.abort().await,
        // Retry has no direct executor analogue: a flow-level retry means
        // resubmitting it as a fresh run, which is a queue concern, not
        // something this already-finished executor can do to itself.
        ControlAction::Retry => Ok(()),
    };
}
