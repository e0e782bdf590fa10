/// Serve the latest waterfall over http
///
/// The update loop keeps running on the calling thread and publishes every
/// frame into shared state the axum handlers read from.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::sample::Sample;
use crate::waterfall::Waterfall;

/// What the handlers hand out, replaced after every update cycle
#[derive(Debug, Default)]
struct Published {
    png: Vec<u8>,
    devices: DeviceList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct DeviceList {
    devices: Vec<String>,
    labels: Vec<String>,
    palette: String,
}

type Shared = Arc<Mutex<Published>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Published> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn get_waterfall(State(shared): State<Shared>) -> impl IntoResponse {
    let png = lock(&shared).png.clone();
    ([(header::CONTENT_TYPE, "image/png")], png)
}

async fn get_devices(State(shared): State<Shared>) -> Json<DeviceList> {
    Json(lock(&shared).devices.clone())
}

// Build the axum router
fn build_app(shared: Shared) -> Router {
    Router::new()
        .route("/waterfall.png", get(get_waterfall))
        .route("/api/devices", get(get_devices))
        .with_state(shared)
}

// Run the server (async)
async fn run_server(shared: Shared, port: u16) -> Result<()> {
    let app = build_app(shared);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Copy the current frame and device list into the shared state
fn publish(waterfall: &Waterfall, shared: &Shared) -> Result<()> {
    let png = waterfall.renderer().encode_png()?;
    let history = waterfall.history();
    let config = waterfall.config();

    let mut published = lock(shared);
    published.png = png;
    published.devices = DeviceList {
        devices: history.devices().to_vec(),
        labels: history.labels(config.label_len),
        palette: config.palette.to_string(),
    };

    Ok(())
}

/// Handle the web interface for the waterfall
///
/// `waterfall` - the waterfall to drive
/// `rx` - the receiver for samples from the feed
/// `interval` - time between update cycles
/// `port` - local port to listen on
pub fn web_display(
    mut waterfall: Waterfall,
    rx: Receiver<Sample>,
    interval: Duration,
    port: u16,
) -> color_eyre::Result<()> {
    let shared: Shared = Arc::new(Mutex::new(Published::default()));

    // Create the Tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    let server = rt.spawn(run_server(shared.clone(), port));

    loop {
        waterfall.ingest(&rx);
        waterfall.tick()?;
        publish(&waterfall, &shared)?;

        if server.is_finished() {
            rt.block_on(server)??;
            return Ok(());
        }

        thread::sleep(interval);
    }
}
