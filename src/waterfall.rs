//! The live waterfall: sample table, rolling history and renderer together

pub mod history;
pub mod palette;
pub mod render;
pub mod tui;
pub mod web;

use std::sync::mpsc::Receiver;

use crate::error::Result;
use crate::sample::{Sample, SampleTable};

pub use history::{HistoryConfig, Responsiveness, UpdateOutcome, WaterfallHistory};
pub use palette::Palette;
pub use render::{Redraw, RenderConfig, WaterfallRenderer};

pub const DEFAULT_WIDTH: u32 = 1150;
pub const DEFAULT_HEIGHT: u32 = 850;

/// State carried by one waterfall view from one update cycle to the next
pub struct Waterfall {
    samples: SampleTable,
    history: WaterfallHistory,
    config: RenderConfig,
    renderer: WaterfallRenderer,
    updates: u64,
}

impl Waterfall {
    pub fn new(
        samples: SampleTable,
        history_config: HistoryConfig,
        config: RenderConfig,
        size: (u32, u32),
    ) -> Self {
        let history = WaterfallHistory::new(&samples, history_config);

        Waterfall {
            samples,
            history,
            config,
            renderer: WaterfallRenderer::new(size.0, size.1),
            updates: 0,
        }
    }

    /// Move every sample waiting on the channel into the table
    ///
    /// returns the number of samples taken
    pub fn ingest(&mut self, rx: &Receiver<Sample>) -> usize {
        let mut count = 0;
        while let Ok(sample) = rx.try_recv() {
            self.samples.push(sample);
            count += 1;
        }

        count
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// One update cycle: fold the samples into the history, drop samples no
    /// later cycle can use and redraw
    pub fn tick(&mut self) -> Result<Redraw> {
        let outcome = self.history.update(&self.samples);
        self.updates += 1;

        match outcome {
            UpdateOutcome::Resampled => {
                tracing::info!("warm up sampled {} devices", self.history.devices().len())
            }
            UpdateOutcome::Appended => {
                let pruned = prune_stale(&mut self.samples, &self.history);
                tracing::trace!("pruned {} samples", pruned);
            }
        }

        self.render()
    }

    /// Redraw the current history without updating it
    pub fn render(&mut self) -> Result<Redraw> {
        let redraw = self.renderer.render(&self.history, &self.config)?;
        tracing::trace!("{:?} redraw after {} updates", redraw, self.updates);
        Ok(redraw)
    }

    /// Apply a palette picked by the user
    pub fn select_palette(&mut self, palette: Palette) {
        if palette != self.config.palette {
            tracing::info!("palette changed to {}", palette);
            self.config = self.config.select_palette(palette);
        }
    }

    pub fn palette(&self) -> Palette {
        self.config.palette
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn history(&self) -> &WaterfallHistory {
        &self.history
    }

    pub fn renderer(&self) -> &WaterfallRenderer {
        &self.renderer
    }

    pub fn samples(&self) -> &SampleTable {
        &self.samples
    }
}

/// Drop the samples no later aggregating update can select
///
/// returns the number of samples removed
fn prune_stale(samples: &mut SampleTable, history: &WaterfallHistory) -> usize {
    match samples.latest_time() {
        Some(latest) => samples.prune_before(latest - history.window()),
        None => 0,
    }
}

/// Replay a recorded feed as if it arrived live
///
/// `samples` - every sample of the recording
/// `step` - feed time between two update cycles
///
/// returns the history after the last cycle
pub fn replay(mut samples: Vec<Sample>, step: f64, config: HistoryConfig) -> WaterfallHistory {
    samples.retain(|s| s.time.is_finite());
    samples.sort_by(|a, b| a.time.total_cmp(&b.time));

    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first.time, last.time),
        _ => return WaterfallHistory::new(&SampleTable::new(), config),
    };
    let step = if step > 0.0 { step } else { config.responsiveness.window() };
    let cycles = ((last - first) / step).ceil() as u64;

    let mut feed = samples.into_iter().peekable();
    let mut table = SampleTable::new();

    table.extend(std::iter::from_fn(|| feed.next_if(|s| s.time <= first)));
    let mut history = WaterfallHistory::new(&table, config);

    for cycle in 1..=cycles {
        // `first + cycle * step` can round short of the end on large timestamps
        let now = if cycle == cycles { last } else { first + cycle as f64 * step };
        table.extend(std::iter::from_fn(|| feed.next_if(|s| s.time <= now)));

        if history.update(&table) == UpdateOutcome::Appended {
            prune_stale(&mut table, &history);
        }
    }

    tracing::debug!("replayed {} update cycles", cycles);
    history
}
