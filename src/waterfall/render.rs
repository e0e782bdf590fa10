/// Draw the waterfall history into an RGB raster
///
/// Rows run bottom to top from oldest to newest and devices run left to
/// right. The first frame, or any frame after the device set or the look of
/// the plot changed, is drawn from scratch. Routine frames only repaint the
/// cells in place.

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;

use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, WaterfallError};
use crate::waterfall::history::{WaterfallHistory, LABEL_LEN};
use crate::waterfall::palette::{ColorScale, Palette, SCALE_MAX_DBM, SCALE_MIN_DBM};

const BACKGROUND: RGBColor = RGBColor(0x3B, 0x3B, 0x3B);
const LABEL_AREA_HEIGHT: u32 = 60;
const LABEL_FONT_SIZE: i32 = 12;

/// How the waterfall should look, replaced as a whole when the user picks
/// something else
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub palette: Palette,
    pub min: f64,
    pub max: f64,
    pub show_labels: bool,
    pub label_len: usize,
}

impl RenderConfig {
    pub fn new(palette: Palette) -> Self {
        RenderConfig {
            palette,
            min: SCALE_MIN_DBM,
            max: SCALE_MAX_DBM,
            show_labels: true,
            label_len: LABEL_LEN,
        }
    }

    /// The config that results from the user selecting `palette`
    pub fn select_palette(&self, palette: Palette) -> Self {
        RenderConfig { palette, ..self.clone() }
    }

    #[cfg(test)]
    pub fn without_labels(&self) -> Self {
        RenderConfig { show_labels: false, ..self.clone() }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

/// Which redraw a render call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// Background, labels and cells were all drawn
    Full,
    /// Only the cells were replaced
    Data,
}

/// Everything besides the cell values that ends up in the frame
#[derive(Debug, Clone, PartialEq)]
struct FrameLayout {
    devices: Vec<String>,
    config: RenderConfig,
}

pub struct WaterfallRenderer {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    layout: Option<FrameLayout>,
}

fn render_error<E: std::fmt::Display>(e: E) -> WaterfallError {
    WaterfallError::Render(e.to_string())
}

/// Bytes in an RGB frame of `width` by `height` pixels
fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

impl WaterfallRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));

        WaterfallRenderer {
            width,
            height,
            frame: vec![0; frame_len(width, height)],
            layout: None,
        }
    }

    /// Raw RGB bytes of the last frame, row major
    #[cfg(test)]
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Draw `history` with the look described by `config`
    ///
    /// returns which redraw was needed
    pub fn render(&mut self, history: &WaterfallHistory, config: &RenderConfig) -> Result<Redraw> {
        let layout = FrameLayout {
            devices: history.devices().to_vec(),
            config: config.clone(),
        };
        let redraw = match &self.layout {
            Some(previous) if *previous == layout => Redraw::Data,
            _ => Redraw::Full,
        };

        let (width, height) = (self.width, self.height);
        let label_height = if config.show_labels { LABEL_AREA_HEIGHT.min(height / 2) } else { 0 };
        let scale = ColorScale::new(config.palette, config.min, config.max);

        let root = BitMapBackend::with_buffer(&mut self.frame, (width, height)).into_drawing_area();
        let (plot, label_area) = root.split_vertically((height - label_height) as i32);

        if redraw == Redraw::Full {
            root.fill(&BACKGROUND).map_err(render_error)?;
            if config.show_labels {
                // A missing system font only costs the labels
                if let Err(e) = draw_labels(&label_area, &history.labels(config.label_len)) {
                    tracing::warn!("couldn't draw device labels: {}", e);
                }
            }
        }

        draw_cells(&plot, history, &scale)?;
        root.present().map_err(render_error)?;

        self.layout = Some(layout);
        Ok(redraw)
    }

    /// Color of a single pixel of the last frame
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBColor> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some(RGBColor(self.frame[i], self.frame[i + 1], self.frame[i + 2]))
    }

    pub fn to_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.frame.clone())
            .ok_or_else(|| WaterfallError::Render("frame does not match its size".to_string()))
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_image()?.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.to_image()?.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
}

/// Pixel span of cell `i` of `count` over `len` pixels
fn cell_span(i: usize, count: usize, len: u32) -> (i32, i32) {
    let start = (i as u64 * len as u64 / count as u64) as i32;
    let end = ((i as u64 + 1) * len as u64 / count as u64) as i32;
    (start, end)
}

fn draw_cells<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    history: &WaterfallHistory,
    scale: &ColorScale,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let num_rows = history.len();
    let num_devices = history.devices().len();

    if num_rows == 0 || num_devices == 0 {
        return Ok(());
    }

    for (r, row) in history.rows().enumerate() {
        let (bottom, top) = cell_span(r, num_rows, height);
        let (y0, y1) = (height as i32 - top, height as i32 - bottom);
        if y1 <= y0 {
            continue;
        }

        for (c, value) in row.iter().enumerate() {
            let (x0, x1) = cell_span(c, num_devices, width);
            if x1 <= x0 {
                continue;
            }

            let color = scale.color(*value);
            area.draw(&Rectangle::new([(x0, y0), (x1 - 1, y1 - 1)], color.filled()))
                .map_err(render_error)?;
        }
    }

    Ok(())
}

fn draw_labels<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    labels: &[String],
) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }

    let (width, _) = area.dim_in_pixel();
    let style = ("sans-serif", 12)
        .into_font()
        .transform(FontTransform::Rotate90)
        .color(&WHITE);

    for (i, label) in labels.iter().enumerate() {
        let (x0, x1) = cell_span(i, labels.len(), width);
        let x = (x0 + x1) / 2 + LABEL_FONT_SIZE / 2;
        area.draw(&Text::new(label.as_str(), (x, 4), style.clone()))
            .map_err(render_error)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Sample, SampleTable};
    use crate::waterfall::history::HistoryConfig;
    use crate::waterfall::palette::Gradient;

    const WIDTH: u32 = 200;
    const HEIGHT: u32 = 100;

    fn history(samples: &[Sample]) -> WaterfallHistory {
        let table = SampleTable::from(samples.to_vec());
        let config = HistoryConfig { warm_up_updates: 0, ..Default::default() };
        WaterfallHistory::new(&table, config)
    }

    fn plain(palette: Palette) -> RenderConfig {
        RenderConfig::new(palette).without_labels()
    }

    #[test]
    fn test_newest_row_on_top() {
        let samples = vec![Sample::new(0.0, "AA:BB", -50.0)];
        let mut history = history(&samples);
        history.update(&SampleTable::from(samples));

        let config = plain(Palette::Viridis);
        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &config).unwrap();

        let scale = ColorScale::new(config.palette, config.min, config.max);
        assert_eq!(renderer.pixel(10, 0), Some(scale.color(-50.0)));
        assert_eq!(renderer.pixel(10, HEIGHT - 1), Some(scale.color(-100.0)));
    }

    #[test]
    fn test_devices_left_to_right() {
        let samples = vec![Sample::new(0.0, "AA", -90.0), Sample::new(0.0, "BB", -20.0)];
        let mut history = history(&samples);
        history.update(&SampleTable::from(samples));

        let config = plain(Palette::Hot);
        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &config).unwrap();

        let scale = ColorScale::new(config.palette, config.min, config.max);
        assert_eq!(renderer.pixel(0, 0), Some(scale.color(-90.0)));
        assert_eq!(renderer.pixel(WIDTH - 1, 0), Some(scale.color(-20.0)));
    }

    #[test]
    fn test_matrix_palette_uses_custom_gradient() {
        let history = history(&[Sample::new(0.0, "AA", -40.0)]);

        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &plain(Palette::Matrix)).unwrap();

        assert_eq!(renderer.pixel(5, 5), Some(Gradient::matrix().color_at(0.0)));
        assert_eq!(renderer.pixel(5, 5), Some(RGBColor(0x0D, 0x02, 0x08)));
    }

    #[test]
    fn test_redraw_strategy() {
        let samples = vec![Sample::new(0.0, "AA", -40.0)];
        let mut history = history(&samples);
        let config = plain(Palette::Viridis);
        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);

        assert_eq!(renderer.render(&history, &config).unwrap(), Redraw::Full);
        history.update(&SampleTable::from(samples));
        assert_eq!(renderer.render(&history, &config).unwrap(), Redraw::Data);

        let config = config.select_palette(Palette::Jet);
        assert_eq!(renderer.render(&history, &config).unwrap(), Redraw::Full);
        assert_eq!(renderer.render(&history, &config).unwrap(), Redraw::Data);
    }

    #[test]
    fn test_redraw_is_idempotent() {
        let samples = vec![Sample::new(0.0, "AA", -40.0), Sample::new(0.1, "BB", -75.0)];
        let mut history = history(&samples);
        history.update(&SampleTable::from(samples));
        let config = plain(Palette::Spectral);

        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &config).unwrap();
        let first = renderer.frame().to_vec();

        assert_eq!(renderer.render(&history, &config).unwrap(), Redraw::Data);
        assert_eq!(renderer.frame(), first.as_slice());

        let mut fresh = WaterfallRenderer::new(WIDTH, HEIGHT);
        fresh.render(&history, &config).unwrap();
        assert_eq!(fresh.frame(), first.as_slice());
    }

    #[test]
    fn test_no_devices_is_background() {
        let history = history(&[]);
        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &plain(Palette::Viridis)).unwrap();

        assert_eq!(renderer.pixel(0, 0), Some(BACKGROUND));
        assert_eq!(renderer.pixel(WIDTH - 1, HEIGHT - 1), Some(BACKGROUND));
    }

    #[test]
    fn test_encode_png() {
        let history = history(&[Sample::new(0.0, "AA", -40.0)]);
        let mut renderer = WaterfallRenderer::new(WIDTH, HEIGHT);
        renderer.render(&history, &plain(Palette::Plasma)).unwrap();

        let png = renderer.encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let image = renderer.to_image().unwrap();
        assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_frame_len_large_sizes() {
        assert_eq!(frame_len(WIDTH, HEIGHT), 60_000);
        // 40000 * 40000 * 3 does not fit in a u32
        assert_eq!(frame_len(40_000, 40_000), 4_800_000_000);
        assert_eq!(frame_len(u32::MAX, 1), u32::MAX as usize * 3);
    }

    #[test]
    fn test_pixel_outside_frame() {
        let renderer = WaterfallRenderer::new(WIDTH, HEIGHT);

        assert_eq!(renderer.pixel(WIDTH - 1, HEIGHT - 1), Some(RGBColor(0, 0, 0)));
        assert_eq!(renderer.pixel(WIDTH, 0), None);
        assert_eq!(renderer.pixel(0, HEIGHT), None);
    }

    #[test]
    fn test_cell_span_covers_length() {
        assert_eq!(cell_span(0, 3, 100), (0, 33));
        assert_eq!(cell_span(1, 3, 100), (33, 66));
        assert_eq!(cell_span(2, 3, 100), (66, 100));
    }
}
