/// Handle the terminal ui for the interactive mode

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Stylize},
    text::Line,
    widgets::{Block, Paragraph, Widget},
    DefaultTerminal, Frame,
};

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crate::sample::Sample;
use crate::visualise::save_snapshot;
use crate::waterfall::history::WaterfallHistory;
use crate::waterfall::palette::ColorScale;
use crate::waterfall::Waterfall;

/// Draws the history straight into terminal cells, newest row on top
struct WaterfallWidget<'a> {
    history: &'a WaterfallHistory,
    scale: ColorScale,
}

impl Widget for WaterfallWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let num_rows = self.history.len();
        let num_devices = self.history.devices().len();

        if area.width == 0 || area.height == 0 || num_rows == 0 || num_devices == 0 {
            return;
        }

        for y in 0..area.height {
            let back = y as usize * num_rows / area.height as usize;
            let Some(row) = self.history.row(num_rows - 1 - back) else {
                continue;
            };

            for x in 0..area.width {
                let col = x as usize * num_devices / area.width as usize;
                let value = row.get(col).copied().unwrap_or(self.history.config().floor);
                let color = self.scale.color(value);

                if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
                    cell.set_char(' ').set_bg(Color::Rgb(color.0, color.1, color.2));
                }
            }
        }
    }
}

/// Device labels spread under their columns
fn label_line(labels: &[String], width: u16) -> Line<'static> {
    if labels.is_empty() {
        return Line::from("waiting for devices...");
    }

    let col_width = (width as usize / labels.len()).max(1);
    let text: String = labels
        .iter()
        .map(|label| {
            let label: String = label.chars().take(col_width.saturating_sub(1)).collect();
            format!("{:<width$}", label, width = col_width)
        })
        .collect();

    Line::from(text)
}

/// The main application which holds the state and logic of the application.
struct App {
    /// Is the application running?
    running: bool,
    waterfall: Waterfall,
    interval: Duration,
    snapshot_dir: PathBuf,
    status: String,
}

impl App {
    pub fn new(waterfall: Waterfall, interval: Duration, snapshot_dir: PathBuf) -> Self {
        App {
            running: false,
            waterfall,
            interval,
            snapshot_dir,
            status: String::from("p/P palette  s snapshot  q quit"),
        }
    }

    pub fn run(mut self, mut terminal: DefaultTerminal, rx: Receiver<Sample>) -> color_eyre::Result<()> {
        self.running = true;
        let mut last_update = Instant::now();

        while self.running {
            self.waterfall.ingest(&rx);

            if last_update.elapsed() >= self.interval {
                self.waterfall.tick()?;
                last_update = Instant::now();
            }

            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events()?;
        }

        Ok(())
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let history = self.waterfall.history();
        let config = self.waterfall.config();

        let title = Line::from(format!(
            "rssi waterfall | {} | {} devices | {} samples",
            config.palette,
            history.devices().len(),
            self.waterfall.samples().len()
        ))
        .bold()
        .light_magenta()
        .centered();

        let block = Block::bordered().title(title);
        let inner = block.inner(layout[0]);
        frame.render_widget(block, layout[0]);

        let widget = WaterfallWidget {
            history,
            scale: ColorScale::new(config.palette, config.min, config.max),
        };
        frame.render_widget(widget, inner);

        let labels = history.labels(config.label_len);
        frame.render_widget(Paragraph::new(label_line(&labels, inner.width)), layout[1]);
        frame.render_widget(Paragraph::new(self.status.as_str()).dark_gray(), layout[2]);
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self) -> color_eyre::Result<()> {
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                // it's important to check KeyEventKind::Press to avoid handling key release events
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            (_, KeyCode::Char('p')) => {
                let palette = self.waterfall.palette().next();
                self.waterfall.select_palette(palette);
            }
            (_, KeyCode::Char('P')) => {
                let palette = self.waterfall.palette().previous();
                self.waterfall.select_palette(palette);
            }
            (_, KeyCode::Char('s')) => self.snapshot(),
            _ => {}
        }
    }

    fn snapshot(&mut self) {
        let saved = self
            .waterfall
            .render()
            .and_then(|_| save_snapshot(self.waterfall.renderer(), &self.snapshot_dir));

        self.status = match saved {
            Ok(path) => format!("saved {}", path.display()),
            Err(e) => format!("snapshot failed: {}", e),
        };
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }
}

/// Run the interactive terminal view until the user quits
///
/// `waterfall` - the waterfall to drive
/// `rx` - the receiver for samples from the feed
/// `interval` - time between update cycles
/// `snapshot_dir` - where `s` saves png snapshots
pub fn interactive_display(
    waterfall: Waterfall,
    rx: Receiver<Sample>,
    interval: Duration,
    snapshot_dir: PathBuf,
) -> color_eyre::Result<()> {
    let terminal = ratatui::init();
    let result = App::new(waterfall, interval, snapshot_dir).run(terminal, rx);
    ratatui::restore();
    result
}
