use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, info};

use super::messages::{CreateRoomRequest, CreateRoomResponse, RoomDescriptor};
use crate::audio::AudioSegment;
use crate::error::UploadError;
use crate::upload::Attachment;

/// Transport for segment and attachment uploads
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// `POST /rooms/{room_id}/audio`
    async fn upload_segment(&self, room_id: &str, segment: AudioSegment) -> Result<Value, UploadError>;

    /// `POST /rooms/{room_id}/file`
    async fn upload_attachment(
        &self,
        room_id: &str,
        attachment: Attachment,
    ) -> Result<Value, UploadError>;
}

/// REST client for the room API
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UploadError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UploadError::Network(format!("invalid base URL {}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(UploadError::Network(format!("invalid base URL {}", base_url)));
        }

        let http = Client::builder().timeout(timeout).build()?;

        info!("Room API client targeting {}", base_url);

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/a/b/c`, encoding each piece as a single path segment
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /rooms`
    pub async fn list_rooms(&self) -> Result<Vec<RoomDescriptor>, UploadError> {
        let url = self.endpoint(&["rooms"]);
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;

        response
            .json::<Vec<RoomDescriptor>>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    /// Display name of a room, if the server lists it
    pub async fn room_name(&self, room_id: &str) -> Result<Option<String>, UploadError> {
        let rooms = self.list_rooms().await?;
        Ok(rooms.into_iter().find(|r| r.id == room_id).map(|r| r.name))
    }

    /// `POST /rooms`
    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<CreateRoomResponse, UploadError> {
        request.validate().map_err(UploadError::InvalidRoom)?;

        let url = self.endpoint(&["rooms"]);
        debug!("POST {}", url);

        let response = self.http.post(url).json(request).send().await?;
        let response = check_status(response).await?;

        let created = response
            .json::<CreateRoomResponse>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        info!("Created room {} ({})", request.name, created.room_id);

        Ok(created)
    }

    async fn post_multipart(&self, url: Url, form: Form) -> Result<Value, UploadError> {
        let response = self.http.post(url).multipart(form).send().await?;
        let response = check_status(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Uploader for ApiClient {
    async fn upload_segment(&self, room_id: &str, segment: AudioSegment) -> Result<Value, UploadError> {
        let url = self.endpoint(&["rooms", room_id, "audio"]);
        let bytes = segment.payload.len();

        let part = Part::bytes(segment.payload)
            .file_name(crate::audio::SEGMENT_FILE_NAME)
            .mime_str(crate::audio::SEGMENT_MEDIA_TYPE)?;
        let form = Form::new().part("file", part);

        let ack = self.post_multipart(url, form).await?;

        debug!("Segment upload acknowledged ({} bytes): {}", bytes, ack);
        Ok(ack)
    }

    async fn upload_attachment(
        &self,
        room_id: &str,
        attachment: Attachment,
    ) -> Result<Value, UploadError> {
        let url = self.endpoint(&["rooms", room_id, "file"]);

        let part = Part::bytes(attachment.payload)
            .file_name(attachment.file_name)
            .mime_str(&attachment.media_type)
            .map_err(|e| UploadError::Io(format!("invalid media type: {}", e)))?;
        let form = Form::new().part("file", part);

        let ack = self.post_multipart(url, form).await?;

        debug!("Attachment upload acknowledged: {}", ack);
        Ok(ack)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Status {
        status: status.as_u16(),
        body,
    })
}
