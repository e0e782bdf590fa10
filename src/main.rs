use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::time::Duration;

mod cli;
use cli::{CliArgs, Commands, DisplayMode, ViewArgs};

mod error;

mod sample;
use sample::{load_samples, spawn_reader, InputSource, SampleTable};

mod visualise;

mod waterfall;
use waterfall::{replay, Palette, Waterfall, WaterfallRenderer};

/// Log to stderr, `RUST_LOG` overrides the default level
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn list_palettes() {
    for palette in Palette::ALL {
        let kind = if palette.is_custom() { "custom gradient" } else { "named scale" };
        println!("{:<18} {}", palette.name(), kind);
    }
}

fn launch_render(input: InputSource, output: PathBuf, step: f64, view: ViewArgs) -> color_eyre::Result<()> {
    let samples = load_samples(&input).wrap_err_with(|| format!("Couldn't read samples from {}", input))?;
    tracing::info!("Replaying {} samples from {}", samples.len(), input);

    let history = replay(samples, step, view.history_config());

    let (width, height) = view.size();
    let mut renderer = WaterfallRenderer::new(width, height);
    renderer.render(&history, &view.render_config())?;
    renderer
        .save_png(&output)
        .wrap_err_with(|| format!("Couldn't write {}", output.display()))?;

    println!("Waterfall of {} devices saved to {}", history.devices().len(), output.display());
    Ok(())
}

fn launch_watch(
    input: InputSource,
    mode: DisplayMode,
    interval: Duration,
    output: Option<PathBuf>,
    port: u16,
    view: ViewArgs,
) -> color_eyre::Result<()> {
    tracing::info!("Watching {} in {} mode", input, mode);
    let (rx, reader_thread) = spawn_reader(input)?;

    let waterfall = Waterfall::new(
        SampleTable::new(),
        view.history_config(),
        view.render_config(),
        view.size(),
    );

    let result = match mode {
        DisplayMode::Interactive => {
            let snapshot_dir = output.unwrap_or_else(|| PathBuf::from("."));
            waterfall::tui::interactive_display(waterfall, rx, interval, snapshot_dir)
        }
        DisplayMode::Snapshot => {
            let output = output.unwrap_or_else(|| PathBuf::from("waterfall.png"));
            visualise::snapshot_display(waterfall, rx, interval, &output).map_err(Into::into)
        }
        DisplayMode::Web => waterfall::web::web_display(waterfall, rx, interval, port),
    };

    // The reader stops on its own once the receiver is gone, stdin may
    // still be open though so only wait for it when the feed has finished
    if reader_thread.is_finished() {
        let _ = reader_thread.join();
    }

    result
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = CliArgs::parse();

    let default_level = match &cli.command {
        Commands::Watch { mode: DisplayMode::Interactive, .. } => "off",
        _ => "info",
    };
    init_logging(default_level);

    match cli.command {
        Commands::Palettes => list_palettes(),
        Commands::Render { input, output, step, view } => launch_render(input, output, step, view)?,
        Commands::Watch { input, mode, interval_ms, output, port, view } => {
            launch_watch(input, mode, Duration::from_millis(interval_ms), output, port, view)?
        }
    };

    Ok(())
}
