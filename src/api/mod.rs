//! Client for the remote room API
//!
//! - GET /rooms - List rooms (display name lookup)
//! - POST /rooms - Create a room
//! - POST /rooms/:room_id/audio - Ingest one audio segment
//! - POST /rooms/:room_id/file - Ingest one attachment

mod client;
pub mod messages;

pub use client::{ApiClient, Uploader};
pub use messages::{CreateRoomRequest, CreateRoomResponse, RoomDescriptor};
