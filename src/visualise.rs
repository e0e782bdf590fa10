use chrono::Local;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::sample::Sample;
use crate::waterfall::{Waterfall, WaterfallRenderer};

/// Time stamped file name for a waterfall snapshot in `dir`
pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(format!("waterfall_{}.png", Local::now().format("%Y%m%d_%H%M%S%.3f")))
}

/// Save the last rendered frame as a png in `dir`
///
/// returns the path written
pub fn save_snapshot(renderer: &WaterfallRenderer, dir: &Path) -> Result<PathBuf> {
    let path = snapshot_path(dir);
    renderer.save_png(&path)?;
    tracing::info!("waterfall saved to {}", path.display());
    Ok(path)
}

/// Keep rewriting `output` with the latest waterfall until the feed closes
///
/// `waterfall` - the waterfall to drive
/// `rx` - the receiver for samples from the feed
/// `interval` - time between update cycles
/// `output` - png file rewritten every cycle
pub fn snapshot_display(
    mut waterfall: Waterfall,
    rx: Receiver<Sample>,
    interval: Duration,
    output: &Path,
) -> Result<()> {
    loop {
        let received = waterfall.ingest(&rx);
        let redraw = waterfall.tick()?;
        waterfall.renderer().save_png(output)?;

        tracing::info!(
            "{} new samples, {} devices, {:?} redraw",
            received,
            waterfall.history().devices().len(),
            redraw
        );

        // The feed is done once the channel is empty and its sender is gone
        match rx.try_recv() {
            Ok(sample) => waterfall.push(sample),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                tracing::info!("feed closed, final waterfall in {}", output.display());
                return Ok(());
            }
        }

        thread::sleep(interval);
    }
}
