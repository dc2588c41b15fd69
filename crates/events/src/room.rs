//! Rooms gate fan-out; roles gate control-plane actions.

use uuid::Uuid;

use crate::error::EventsError;
use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Flow(Uuid),
    Node(String),
    Project(Uuid),
    Execution(Uuid),
}

impl Room {
    /// Every room an event is a member of, used for publish-time fan-out.
    pub fn memberships(event: &Event) -> Vec<Room> {
        let mut rooms = Vec::new();
        if let Some(flow_id) = event.flow_id {
            rooms.push(Room::Flow(flow_id));
        }
        if let Some(node_id) = &event.node_id {
            rooms.push(Room::Node(node_id.clone()));
        }
        if let Some(project_id) = event.project_id {
            rooms.push(Room::Project(project_id));
        }
        if let Some(execution_id) = event.execution_id {
            rooms.push(Room::Execution(execution_id));
        }
        rooms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Developer,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Abort,
    Retry,
}

impl Role {
    /// Data-plane subscription is role-agnostic; only control-plane actions
    /// are gated.
    pub fn authorize(self, action: ControlAction) -> Result<(), EventsError> {
        let allowed = match (self, action) {
            (Role::Admin, _) => true,
            (Role::Developer, ControlAction::Pause | ControlAction::Resume | ControlAction::Retry) => true,
            (Role::Developer, ControlAction::Abort) => false,
            (Role::Viewer, _) => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(EventsError::Unauthorized { role: format!("{self:?}"), action: format!("{action:?}") })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn admin_may_abort() {
        assert!(Role::Admin.authorize(ControlAction::Abort).is_ok());
    }

    #[test]
    fn developer_may_not_abort() {
        assert!(Role::Developer.authorize(ControlAction::Abort).is_err());
    }

    #[test]
    fn developer_may_pause_and_retry() {
        assert!(Role::Developer.authorize(ControlAction::Pause).is_ok());
        assert!(Role::Developer.authorize(ControlAction::Retry).is_ok());
    }

    #[test]
    fn viewer_may_not_take_any_control_action() {
        assert!(Role::Viewer.authorize(ControlAction::Pause).is_err());
        assert!(Role::Viewer.authorize(ControlAction::Resume).is_err());
    }

    #[test]
    fn event_belongs_to_every_room_its_fields_name() {
        let flow_id = Uuid::new_v4();
        let event = Event::new(crate::event::EventKind::NodeUpdate, json!({})).with_flow(flow_id).with_node("n1");
        let rooms = Room::memberships(&event);
        assert!(rooms.contains(&Room::Flow(flow_id)));
        assert!(rooms.contains(&Room::Node("n1".to_string())));
    }
}
