// Tests for the room API client against an in-process fake server

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use room_capture::{ApiClient, Attachment, CreateRoomRequest, UploadError, Uploader};
use serde_json::{json, Value};

/// One multipart part as the server saw it
#[derive(Debug, Clone)]
struct ReceivedPart {
    room_id: String,
    kind: &'static str,
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct FakeServer {
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
    created: Arc<Mutex<Vec<Value>>>,
}

async fn collect(
    server: &FakeServer,
    room_id: String,
    kind: &'static str,
    mut multipart: Multipart,
) -> StatusCode {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST;
        };

        server.parts.lock().unwrap().push(ReceivedPart {
            room_id: room_id.clone(),
            kind,
            field: name,
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    StatusCode::OK
}

async fn audio(
    State(server): State<FakeServer>,
    Path(room_id): Path<String>,
    multipart: Multipart,
) -> impl IntoResponse {
    let status = collect(&server, room_id, "audio", multipart).await;
    (status, Json(json!({ "message": "chunk received" })))
}

async fn file(
    State(server): State<FakeServer>,
    Path(room_id): Path<String>,
    multipart: Multipart,
) -> impl IntoResponse {
    let status = collect(&server, room_id, "file", multipart).await;
    (status, Json(json!({ "message": "file received" })))
}

async fn rooms() -> impl IntoResponse {
    Json(json!([
        { "id": "r1", "name": "Standup", "description": "daily", "files": 2 },
        { "id": "r2", "name": "Retro" }
    ]))
}

async fn create_room(State(server): State<FakeServer>, Json(body): Json<Value>) -> impl IntoResponse {
    server.created.lock().unwrap().push(body);
    (StatusCode::CREATED, Json(json!({ "roomId": "r3" })))
}

async fn spawn_server(router: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

async fn fake_ingestion() -> Result<(ApiClient, FakeServer)> {
    let server = FakeServer::default();
    let router = Router::new()
        .route("/rooms", get(rooms).post(create_room))
        .route("/rooms/:room_id/audio", post(audio))
        .route("/rooms/:room_id/file", post(file))
        .with_state(server.clone());

    let addr = spawn_server(router).await?;
    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5))?;
    Ok((client, server))
}

#[tokio::test]
async fn test_segment_upload_is_multipart_wav() -> Result<()> {
    let (client, server) = fake_ingestion().await?;
    let segment = common::segment(10);
    let payload = segment.payload.clone();

    let ack = client.upload_segment("room-1", segment).await?;

    assert_eq!(ack["message"], "chunk received");

    let parts = server.parts.lock().unwrap();
    assert_eq!(parts.len(), 1);
    let part = &parts[0];
    assert_eq!(part.room_id, "room-1");
    assert_eq!(part.kind, "audio");
    assert_eq!(part.field, "file");
    assert_eq!(part.file_name.as_deref(), Some("audio.wav"));
    assert_eq!(part.content_type.as_deref(), Some("audio/wav"));
    assert_eq!(part.bytes, payload);

    Ok(())
}

#[tokio::test]
async fn test_attachment_keeps_name_and_type() -> Result<()> {
    let (client, server) = fake_ingestion().await?;
    let attachment = Attachment::new("agenda.pdf", "application/pdf", b"%PDF-1.7".to_vec());

    client.upload_attachment("room-1", attachment).await?;

    let parts = server.parts.lock().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].kind, "file");
    assert_eq!(parts[0].field, "file");
    assert_eq!(parts[0].file_name.as_deref(), Some("agenda.pdf"));
    assert_eq!(parts[0].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(parts[0].bytes, b"%PDF-1.7");

    Ok(())
}

#[tokio::test]
async fn test_room_id_is_one_path_segment() -> Result<()> {
    let (client, server) = fake_ingestion().await?;

    client.upload_segment("team a/b", common::segment(1)).await?;

    let url = client.endpoint(&["rooms", "team a/b", "audio"]);
    assert!(url.path().ends_with("/rooms/team%20a%2Fb/audio"), "{}", url);
    assert_eq!(server.parts.lock().unwrap()[0].room_id, "team a/b");

    Ok(())
}

#[tokio::test]
async fn test_endpoint_joins_base_path() -> Result<()> {
    let client = ApiClient::new("http://example.test/api/", Duration::from_secs(1))?;

    assert_eq!(
        client.endpoint(&["rooms", "r1", "file"]).as_str(),
        "http://example.test/api/rooms/r1/file"
    );

    Ok(())
}

#[tokio::test]
async fn test_server_error_maps_to_status() -> Result<()> {
    let router = Router::new().route(
        "/rooms/:room_id/audio",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "disk full") }),
    );
    let addr = spawn_server(router).await?;
    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5))?;

    let err = client.upload_segment("room-1", common::segment(1)).await.unwrap_err();

    assert_eq!(
        err,
        UploadError::Status {
            status: 500,
            body: "disk full".to_string()
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_non_json_ack_is_invalid_response() -> Result<()> {
    let router = Router::new().route("/rooms/:room_id/audio", post(|| async { "ok" }));
    let addr = spawn_server(router).await?;
    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5))?;

    let err = client.upload_segment("room-1", common::segment(1)).await.unwrap_err();

    assert!(matches!(err, UploadError::InvalidResponse(_)));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() -> Result<()> {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(2))?;
    let err = client.upload_segment("room-1", common::segment(1)).await.unwrap_err();

    assert!(matches!(err, UploadError::Network(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_keeps_extra_fields() -> Result<()> {
    let (client, _server) = fake_ingestion().await?;

    let rooms = client.list_rooms().await?;

    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].id, "r1");
    assert_eq!(rooms[0].name, "Standup");
    assert_eq!(rooms[0].extra["description"], "daily");
    assert!(rooms[1].extra.is_empty());

    assert_eq!(client.room_name("r2").await?, Some("Retro".to_string()));
    assert_eq!(client.room_name("missing").await?, None);

    Ok(())
}

#[tokio::test]
async fn test_create_room() -> Result<()> {
    let (client, server) = fake_ingestion().await?;

    let created = client
        .create_room(&CreateRoomRequest::new("  Planning  ", Some(" ".to_string())))
        .await?;

    assert_eq!(created.room_id, "r3");
    let bodies = server.created.lock().unwrap();
    assert_eq!(bodies[0], json!({ "name": "Planning" }));

    Ok(())
}

#[tokio::test]
async fn test_create_room_rejects_short_name_locally() -> Result<()> {
    let (client, server) = fake_ingestion().await?;

    let err = client
        .create_room(&CreateRoomRequest::new("ab", None))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::InvalidRoom(_)));
    assert!(server.created.lock().unwrap().is_empty(), "Nothing was sent");

    Ok(())
}

#[test]
fn test_invalid_base_url() {
    assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    assert!(ApiClient::new("mailto:rooms@example.test", Duration::from_secs(1)).is_err());
}
