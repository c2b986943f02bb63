//! WebSocket room management for user-scoped message routing.
//!
//! Rooms are organized by user ID, allowing targeted broadcast of
//! enrollment updates to all clients a given user has open.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::foundation::UserId;

use super::messages::EnrollmentUpdate;

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manages WebSocket connection rooms organized by user.
///
/// Provides:
/// - Client join/leave operations
/// - Broadcast to all clients of a user
/// - Automatic cleanup of empty rooms
///
/// Uses `RwLock` for the room registry since broadcasts (reads) vastly
/// outnumber joins/leaves (writes).
pub struct RoomManager {
    /// Map of user_id → broadcast sender for that room.
    rooms: RwLock<HashMap<UserId, broadcast::Sender<EnrollmentUpdate>>>,

    /// Map of client_id → user_id for O(1) cleanup on disconnect.
    client_users: RwLock<HashMap<ClientId, UserId>>,

    /// Channel capacity for each room's broadcast channel.
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_users: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Create with default capacity (128 messages).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Join a client to a user room.
    ///
    /// If the room doesn't exist, it's created automatically.
    /// Returns a receiver for enrollment updates in that room.
    pub async fn join(
        &self,
        user_id: &UserId,
        client_id: ClientId,
    ) -> broadcast::Receiver<EnrollmentUpdate> {
        let mut rooms = self.rooms.write().await;

        let sender = rooms.entry(user_id.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.client_users
            .write()
            .await
            .insert(client_id, user_id.clone());

        sender.subscribe()
    }

    /// Remove a client from their user room.
    ///
    /// If the room becomes empty, it's automatically cleaned up.
    pub async fn leave(&self, client_id: &ClientId) {
        let mut client_users = self.client_users.write().await;

        if let Some(user_id) = client_users.remove(client_id) {
            let rooms = self.rooms.read().await;
            if let Some(sender) = rooms.get(&user_id) {
                if sender.receiver_count() == 0 {
                    drop(rooms);
                    self.rooms.write().await.remove(&user_id);
                }
            }
        }
    }

    /// Broadcast an update to all clients of a user.
    ///
    /// If the user has no connected clients, this is a no-op. If the
    /// broadcast buffer is full, oldest messages are dropped and slow
    /// clients miss updates.
    pub async fn broadcast_to_user(&self, user_id: &UserId, update: EnrollmentUpdate) {
        let rooms = self.rooms.read().await;

        if let Some(sender) = rooms.get(user_id) {
            // No receivers is fine
            let _ = sender.send(update);
        }
    }

    /// Get count of connected clients for a user (0 if no room exists).
    pub async fn client_count(&self, user_id: &UserId) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Get all active room IDs (for monitoring/debugging).
    pub async fn active_rooms(&self) -> Vec<UserId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Get total count of connected clients across all rooms.
    pub async fn total_client_count(&self) -> usize {
        self.client_users.read().await.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
