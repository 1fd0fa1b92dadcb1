pub mod cli;
pub mod display;
pub mod io;
pub mod net;
pub mod render;
pub mod storage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("{0}")]
    Usage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),
}
