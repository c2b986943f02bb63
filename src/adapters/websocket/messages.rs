//! WebSocket message types for real-time enrollment updates.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: Connection status, enrollment updates, errors, pings
//! - Client → Server: Pings

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established successfully.
    Connected(ConnectedMessage),

    /// Enrollment update notification.
    #[serde(rename = "enrollment.update")]
    EnrollmentUpdate(EnrollmentUpdateMessage),

    /// Error occurred.
    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

/// Sent when a client successfully connects and joins their room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub user_id: String,
    pub client_id: String,
    pub timestamp: String,
}

/// Enrollment update notification with typed payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentUpdateMessage {
    pub update_type: EnrollmentUpdateType,
    pub data: serde_json::Value,
    pub timestamp: String,
}

/// Types of enrollment updates that can be sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentUpdateType {
    /// A subscription grant was created for one of the user's orders.
    SubscriptionActivated,
    /// Activation could not be completed and needs attention.
    ActivationFailed,
    /// Subject access changed after a catalog refresh.
    SubscriptionSynced,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,
}

// ============================================
// Internal Types
// ============================================

/// Internal representation of an enrollment update for broadcasting.
///
/// This is what the event bridge creates and sends to rooms.
#[derive(Debug, Clone)]
pub struct EnrollmentUpdate {
    pub update_type: EnrollmentUpdateType,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl EnrollmentUpdate {
    /// Convert to a server message for sending to clients.
    pub fn to_server_message(self) -> ServerMessage {
        ServerMessage::EnrollmentUpdate(EnrollmentUpdateMessage {
            update_type: self.update_type,
            data: self.data,
            timestamp: self.timestamp.as_datetime().to_rfc3339(),
        })
    }
}
