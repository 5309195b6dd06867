//! Image preparation before upload: JPEG normalisation, compression to a
//! byte budget, GPS EXIF tagging, and the per-image upload state machine.

pub mod compress;
pub mod exif;
pub mod pipeline;
pub mod storage;

use thiserror::Error;

pub use compress::{CompressionTarget, Compressed};
pub use exif::{ExifError, GpsCoordinate};
pub use pipeline::{ImageBatch, ImageSlot, PipelineOptions, UploadState};
pub use storage::{LocalStore, ObjectStore, UploadedObject};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("could not encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Exif(#[from] ExifError),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("no image with local id {0}")]
    UnknownSlot(uuid::Uuid),
}
