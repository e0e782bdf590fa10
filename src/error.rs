/// Error types shared by the feed, renderer and display modes
///
/// Missing data is never an error here, empty windows and unknown
/// devices are filled with the floor value instead.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaterfallError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("bad sample feed: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("image error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },
}

pub type Result<T, E = WaterfallError> = std::result::Result<T, E>;
