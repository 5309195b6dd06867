use std::env;
use std::path::PathBuf;

use bizsite_core::media::{CompressionTarget, GpsCoordinate, PipelineOptions};
use bizsite_core::model::RowId;
use thiserror::Error;

use crate::cache::CacheOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got `{value}`")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend.
    pub api_base_url: String,
    /// Full URL of the content-agent endpoint.
    pub content_agent_url: String,
    /// Endpoint accepting raw image uploads, if the HTTP store is used.
    pub upload_url: Option<String>,
    /// Directory and public URL prefix for uploads when no endpoint is set.
    pub local_upload_dir: PathBuf,
    pub local_upload_url: String,
    /// Tag used for images when the operator has not set a location.
    pub default_location: GpsCoordinate,
    pub page_image_target: CompressionTarget,
    pub library_image_target: CompressionTarget,
    pub cache: CacheOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".to_string(),
            content_agent_url: "http://localhost:3030/api/content-agent".to_string(),
            upload_url: None,
            local_upload_dir: PathBuf::from("uploads"),
            local_upload_url: "/uploads".to_string(),
            default_location: GpsCoordinate::FALLBACK,
            page_image_target: CompressionTarget::PAGE_IMAGE,
            library_image_target: CompressionTarget::LIBRARY,
            cache: CacheOptions::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            }),
        Err(_) => Ok(None),
    }
}

impl ClientConfig {
    /// Load from the environment (and `.env` if present), falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let latitude = parse_var::<f64>("DEFAULT_LATITUDE", "number")?;
        let longitude = parse_var::<f64>("DEFAULT_LONGITUDE", "number")?;
        let default_location = match (latitude, longitude) {
            (None, None) => defaults.default_location,
            (Some(lat), Some(lon)) => {
                GpsCoordinate::new(lat, lon).map_err(|e| ConfigError::Invalid {
                    name: "DEFAULT_LATITUDE/DEFAULT_LONGITUDE",
                    expected: "coordinate",
                    value: e.to_string(),
                })?
            }
            (None, Some(_)) => return Err(ConfigError::Missing("DEFAULT_LATITUDE")),
            (Some(_), None) => return Err(ConfigError::Missing("DEFAULT_LONGITUDE")),
        };

        let page_image_target = parse_var::<usize>("PAGE_IMAGE_TARGET_BYTES", "byte count")?
            .map(CompressionTarget::new)
            .unwrap_or(defaults.page_image_target);
        let library_image_target = parse_var::<usize>("LIBRARY_IMAGE_TARGET_BYTES", "byte count")?
            .map(CompressionTarget::new)
            .unwrap_or(defaults.library_image_target);

        Ok(Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            content_agent_url: env::var("CONTENT_AGENT_URL").unwrap_or(defaults.content_agent_url),
            upload_url: env::var("UPLOAD_BASE_URL").ok(),
            local_upload_dir: env::var("LOCAL_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_upload_dir),
            local_upload_url: env::var("LOCAL_UPLOAD_URL").unwrap_or(defaults.local_upload_url),
            default_location,
            page_image_target,
            library_image_target,
            cache: CacheOptions {
                revalidate_on_focus: parse_var("REVALIDATE_ON_FOCUS", "boolean")?
                    .unwrap_or(defaults.cache.revalidate_on_focus),
                max_entries: parse_var("CACHE_MAX_ENTRIES", "entry count")?
                    .unwrap_or(defaults.cache.max_entries),
            },
        })
    }

    /// Pipeline settings for images attached to pages.
    pub fn page_image_options(&self, website_id: RowId) -> PipelineOptions {
        self.image_options(self.page_image_target, format!("websites/{website_id}/pages"))
    }

    /// Pipeline settings for the website's media library.
    pub fn library_image_options(&self, website_id: RowId) -> PipelineOptions {
        self.image_options(self.library_image_target, format!("websites/{website_id}/library"))
    }

    fn image_options(&self, target: CompressionTarget, key_prefix: String) -> PipelineOptions {
        PipelineOptions {
            target,
            location: None,
            fallback: self.default_location,
            key_prefix,
        }
    }
}
