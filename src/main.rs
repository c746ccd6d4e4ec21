use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use room_capture::{
    create_router, notice_channel, ApiClient, AppState, Attachment, Config, CreateRoomRequest,
    MicrophonePlatform, NoticeReceiver, NoticeSender, RecordingController, UploadDispatcher,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const NOTICE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "room-capture", version, about = "Segmented microphone capture for rooms")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, global = true, default_value = "config/room-capture")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record until Ctrl-C (or for a fixed time), streaming segments to the room
    Record {
        #[arg(long)]
        room: String,
        /// Stop automatically after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Serve the local control API for one room
    Serve {
        #[arg(long)]
        room: String,
    },
    /// Upload one file to a room
    Attach {
        #[arg(long)]
        room: String,
        file: PathBuf,
    },
    /// List rooms
    Rooms,
    /// Create a room
    CreateRoom {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Room API: {}", cfg.api.base_url);

    let api = ApiClient::new(&cfg.api.base_url, cfg.api.request_timeout())
        .context("Failed to create room API client")?;

    match cli.command {
        Command::Record { room, seconds } => record(&cfg, api, room, seconds).await,
        Command::Serve { room } => serve(&cfg, api, room).await,
        Command::Attach { room, file } => attach(&cfg, api, room, file).await,
        Command::Rooms => list_rooms(&api).await,
        Command::CreateRoom { name, description } => {
            let created = api
                .create_room(&CreateRoomRequest::new(name, description))
                .await
                .context("Failed to create room")?;
            println!("{}", created.room_id);
            Ok(())
        }
    }
}

async fn record(cfg: &Config, api: ApiClient, room: String, seconds: Option<u64>) -> Result<()> {
    resolve_room_name(&api, &room).await;

    let (notice_tx, notice_rx) = notice_channel();
    let logger = spawn_notice_logger(notice_rx);

    let dispatcher = build_dispatcher(cfg, api, notice_tx.clone());
    let mut controller = RecordingController::new(
        cfg.session(room),
        Arc::new(microphone(cfg)),
        dispatcher.clone(),
        notice_tx,
    );

    controller.start().await.context("Failed to start recording")?;

    match seconds {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => {
            info!("Recording, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
        }
    }

    if let Some(report) = controller.stop().await {
        info!(
            "Session {}: {:.1}s, {} rotations, {} segments",
            report.session_id, report.duration_secs, report.rotations, report.segments_emitted
        );
    }

    info!("Waiting for {} upload(s) to finish", dispatcher.in_flight());
    dispatcher.drain().await;

    drop(controller);
    drop(dispatcher);
    flush_notices(logger).await;

    Ok(())
}

async fn serve(cfg: &Config, api: ApiClient, room: String) -> Result<()> {
    let room_name = resolve_room_name(&api, &room).await;

    let (notice_tx, notice_rx) = notice_channel();
    let logger = spawn_notice_logger(notice_rx);

    let dispatcher = build_dispatcher(cfg, api, notice_tx.clone());
    let controller = RecordingController::new(
        cfg.session(room),
        Arc::new(microphone(cfg)),
        dispatcher.clone(),
        notice_tx,
    );

    let state = AppState::new(controller, room_name);
    let app = create_router(state.clone());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Control API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    state.controller.lock().await.stop().await;
    dispatcher.drain().await;

    drop(state);
    drop(dispatcher);
    flush_notices(logger).await;

    Ok(())
}

async fn attach(cfg: &Config, api: ApiClient, room: String, file: PathBuf) -> Result<()> {
    let (notice_tx, notice_rx) = notice_channel();
    let logger = spawn_notice_logger(notice_rx);

    let dispatcher = build_dispatcher(cfg, api, notice_tx);
    let attachment = Attachment::from_path(&file).await?;

    let ack = dispatcher
        .send_attachment(attachment, &room)?
        .await
        .context("Upload task failed")??;

    drop(dispatcher);
    flush_notices(logger).await;

    println!("{}", ack);
    Ok(())
}

async fn list_rooms(api: &ApiClient) -> Result<()> {
    let rooms = api.list_rooms().await.context("Failed to list rooms")?;

    for room in rooms {
        println!("{}\t{}", room.id, room.name);
    }

    Ok(())
}

fn microphone(cfg: &Config) -> MicrophonePlatform {
    MicrophonePlatform::new(cfg.audio.frame_buffer).with_constraints(cfg.audio.constraints())
}

fn build_dispatcher(cfg: &Config, api: ApiClient, notices: NoticeSender) -> UploadDispatcher {
    UploadDispatcher::new(Arc::new(api), notices)
        .with_suggested_extensions(cfg.attachments.suggested_extensions.clone())
}

/// Look up the room's display name; failures only cost the name
async fn resolve_room_name(api: &ApiClient, room_id: &str) -> Option<String> {
    match api.room_name(room_id).await {
        Ok(Some(name)) => {
            info!("Room: {} ({})", name, room_id);
            Some(name)
        }
        Ok(None) => {
            warn!("Room {} is not in the room list", room_id);
            None
        }
        Err(e) => {
            warn!("Could not resolve room name for {}: {}", room_id, e);
            None
        }
    }
}

fn spawn_notice_logger(mut notices: NoticeReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            if notice.is_failure() {
                warn!("{}", notice.message());
            } else {
                info!("{}", notice.message());
            }
        }
    })
}

/// Let the logger print what is still queued. It ends once every sender is dropped.
async fn flush_notices(logger: JoinHandle<()>) {
    if tokio::time::timeout(NOTICE_FLUSH_TIMEOUT, logger).await.is_err() {
        warn!("Notice logger still busy at exit");
    }
}
