use std::path::PathBuf;

/// Everything that can go wrong while reviewing a frame.
///
/// None of these are fatal: the app turns each one into a notice and keeps
/// running. `DegenerateGeometry` is not even shown, it just means the traced
/// region was too small to fill.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("no frames found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("traced region needs at least 3 distinct points")]
    DegenerateGeometry,

    #[error("merged image is {merged:?} but original is {original:?}")]
    SizeMismatch {
        merged: (u32, u32),
        original: (u32, u32),
    },

    #[error("frame index must be 1 or greater, got {0}")]
    InvalidIndex(u32),

    #[error("{0:?} is not a frame number")]
    NotANumber(String),

    #[error("saved {}, but reloading it failed: {source}", path.display())]
    Reload {
        path: PathBuf,
        source: Box<Error>,
    },

    #[error("no image directory selected")]
    NoDirectory,

    #[error("no frame loaded")]
    NoFrameLoaded,

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
