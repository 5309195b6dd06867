use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::compress::{self, CompressionTarget};
use super::exif::{self, GpsCoordinate};
use super::storage::ObjectStore;
use super::MediaError;
use crate::model::NewImage;

/// Progress of one image through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Uploading,
    Compressed { size: usize, quality: u8 },
    ExifTagged,
    Uploaded { url: String },
    Failed { reason: String },
}

impl UploadState {
    /// The form shows a spinner for every state between start and finish.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadState::Uploading | UploadState::Compressed { .. } | UploadState::ExifTagged
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub target: CompressionTarget,
    /// Position to tag; `fallback` is used when unset.
    pub location: Option<GpsCoordinate>,
    pub fallback: GpsCoordinate,
    /// Object key prefix, e.g. `websites/3/images`.
    pub key_prefix: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target: CompressionTarget::default(),
            location: None,
            fallback: GpsCoordinate::FALLBACK,
            key_prefix: "images".to_string(),
        }
    }
}

/// One image row of a multi-image form.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlot {
    pub local_id: Uuid,
    pub file_name: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub state: UploadState,
}

/// Independent pipelines keyed by a local id; a failure in one slot never
/// touches another.
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    slots: Vec<ImageSlot>,
}

impl ImageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file_name: impl Into<String>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.slots.push(ImageSlot {
            local_id,
            file_name: file_name.into(),
            alt_text: None,
            caption: None,
            state: UploadState::Idle,
        });
        local_id
    }

    pub fn get(&self, local_id: Uuid) -> Option<&ImageSlot> {
        self.slots.iter().find(|s| s.local_id == local_id)
    }

    pub fn get_mut(&mut self, local_id: Uuid) -> Option<&mut ImageSlot> {
        self.slots.iter_mut().find(|s| s.local_id == local_id)
    }

    pub fn remove(&mut self, local_id: Uuid) -> Option<ImageSlot> {
        let idx = self.slots.iter().position(|s| s.local_id == local_id)?;
        Some(self.slots.remove(idx))
    }

    pub fn slots(&self) -> &[ImageSlot] {
        &self.slots
    }

    pub fn is_busy(&self) -> bool {
        self.slots.iter().any(|s| s.state.is_busy())
    }

    /// Insert payloads for every uploaded image, in form order.
    pub fn uploaded_images(&self) -> Vec<NewImage> {
        self.slots
            .iter()
            .filter_map(|s| match &s.state {
                UploadState::Uploaded { url } => Some(NewImage {
                    url: url.clone(),
                    alt_text: s.alt_text.clone(),
                    caption: s.caption.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Run normalise -> compress -> tag -> upload for one slot and return the
    /// public URL. On failure the slot ends in `Failed` and the error is
    /// returned.
    pub async fn process(
        &mut self,
        local_id: Uuid,
        bytes: &[u8],
        options: &PipelineOptions,
        store: &dyn ObjectStore,
    ) -> Result<String, MediaError> {
        let slot = self
            .get_mut(local_id)
            .ok_or(MediaError::UnknownSlot(local_id))?;
        slot.state = UploadState::Uploading;

        match run(slot, bytes, options, store).await {
            Ok(url) => {
                tracing::info!(%local_id, %url, "image uploaded");
                slot.state = UploadState::Uploaded { url: url.clone() };
                Ok(url)
            }
            Err(e) => {
                tracing::error!(%local_id, file = %slot.file_name, "image pipeline failed: {e}");
                slot.state = UploadState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

async fn run(
    slot: &mut ImageSlot,
    bytes: &[u8],
    options: &PipelineOptions,
    store: &dyn ObjectStore,
) -> Result<String, MediaError> {
    let jpeg = compress::normalize_to_jpeg(bytes)?;
    let compressed = compress::compress(&jpeg, options.target)?;
    slot.state = UploadState::Compressed {
        size: compressed.bytes.len(),
        quality: compressed.quality,
    };

    let location = options.location.unwrap_or(options.fallback);
    let tagged = exif::inject_gps(&compressed.bytes, &location)?;
    slot.state = UploadState::ExifTagged;

    let key = format!(
        "{}/{}.jpg",
        options.key_prefix.trim_end_matches('/'),
        slot.local_id
    );
    let uploaded = store.upload(&key, tagged, "image/jpeg").await?;
    Ok(uploaded.url)
}
