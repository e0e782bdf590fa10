/// Implementation of the cli for the tool
use clap::{Args, Parser, Subcommand, ValueEnum};

use std::path::PathBuf;

use crate::sample::InputSource;
use crate::waterfall::{HistoryConfig, Palette, RenderConfig, Responsiveness, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Parser, Debug)]
#[command(name = "rssi-waterfall")]
#[command(about = "Waterfall view of signal strength per device", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available palettes
    Palettes,
    /// Replay a recorded Time,MACID,RSSI feed and write the final waterfall
    Render {
        /// Recorded feed, `-` for stdin
        #[arg(short, long)]
        input: InputSource,

        #[arg(short, long, default_value = "waterfall.png")]
        output: PathBuf,

        /// Feed time between two update cycles
        #[arg(long, default_value_t = 0.25)]
        step: f64,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Follow a live feed
    Watch {
        /// Live feed, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: InputSource,

        #[arg(short = 'm', long = "mode", default_value_t = DisplayMode::Interactive)]
        mode: DisplayMode,

        /// Milliseconds between update cycles
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,

        /// Png rewritten by snapshot mode, directory for saved snapshots otherwise
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        #[command(flatten)]
        view: ViewArgs,
    },
}

/// Options shared by every command that draws a waterfall
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    #[arg(short, long, value_enum, default_value_t = Palette::Viridis)]
    pub palette: Palette,

    #[arg(short, long, value_enum, default_value_t = Responsiveness::Fast)]
    pub responsiveness: Responsiveness,

    /// Update cycles spent re-sampling the device set before aggregating
    #[arg(long, default_value_t = 1)]
    pub warm_up: u32,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Leave the device labels off the image
    #[arg(long)]
    pub no_labels: bool,
}

impl ViewArgs {
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            responsiveness: self.responsiveness,
            warm_up_updates: self.warm_up,
            ..Default::default()
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            show_labels: !self.no_labels,
            ..RenderConfig::new(self.palette)
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum DisplayMode {
    Web,
    Interactive,
    Snapshot,
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = match self {
            Self::Web => "web",
            Self::Interactive => "interactive",
            Self::Snapshot => "snapshot",
        };

        write!(f, "{}", name)?;

        Ok(())
    }
}
