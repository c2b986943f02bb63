//! WebSocket adapter for real-time enrollment updates.
//!
//! Pushes subscription activation and sync events to connected clients,
//! routed per user through broadcast rooms.

mod event_bridge;
mod handler;
mod messages;
mod rooms;

pub use event_bridge::{WebSocketEventBridge, ENROLLMENT_EVENT_TYPES};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, EnrollmentUpdate, EnrollmentUpdateType, ServerMessage};
pub use rooms::{ClientId, RoomManager};
