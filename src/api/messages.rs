use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Room as listed by `GET /rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub id: String,
    pub name: String,
    /// Anything else the server sends (description, counters, timestamps)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Minimum room name length accepted by the room form
pub const MIN_ROOM_NAME_LEN: usize = 3;

impl CreateRoomRequest {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }

    /// Client-side check mirroring the room form
    pub fn validate(&self) -> Result<(), String> {
        if self.name.chars().count() < MIN_ROOM_NAME_LEN {
            return Err(format!(
                "room name must have at least {} characters",
                MIN_ROOM_NAME_LEN
            ));
        }
        Ok(())
    }
}

/// Response of `POST /rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    pub room_id: String,
}
