//! Dashboard-side access to the REST backend and the content agent.
//!
//! Every request goes through [`http::FetchClient`]; writes go through
//! [`mutate::Mutator`], which never returns `Err` and invalidates the read
//! cache on success; reads go through [`hooks::DataReader`], which
//! deduplicates by resolved URL.

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod mutate;
pub mod pages;
pub mod routing;
pub mod storage;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use bizsite_core::context::SessionContext;
use bizsite_core::media::{ImageBatch, MediaError, ObjectStore};
use uuid::Uuid;

pub use agent::{ContentAgentClient, ContentEndpoint, Sequencer};
pub use cache::{CacheOptions, QueryCache};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, HttpError};
pub use hooks::{DataReader, QueryState};
pub use http::{FetchClient, ReqwestTransport, Transport};
pub use mutate::{MutateRequest, MutationOutcome, Mutator};
pub use pages::{CreatePageOutcome, CreatePageRequest, PageService};
pub use routing::{ApiRouter, HttpMethod};
pub use storage::{object_store, HttpObjectStore};
#[cfg(feature = "s3")]
pub use storage::{S3Settings, S3Store};

/// All client services wired to one transport and one cache.
#[derive(Clone)]
pub struct SiteClient {
    pub reader: DataReader,
    pub mutator: Mutator,
    pub pages: PageService,
    pub cache: Arc<QueryCache>,
    /// The content-agent chat, shared so only one request is ever in flight.
    pub agent: Arc<Sequencer>,
    pub images: Arc<dyn ObjectStore>,
    config: ClientConfig,
}

impl SiteClient {
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        images: Arc<dyn ObjectStore>,
    ) -> Self {
        let router = ApiRouter::new(&config.api_base_url);
        let fetch = FetchClient::new(transport);
        let cache = Arc::new(QueryCache::new(config.cache.clone()));
        let mutator = Mutator::new(fetch.clone(), router.clone(), cache.clone());
        let agent = ContentAgentClient::new(fetch.clone(), config.content_agent_url.clone());
        Self {
            reader: DataReader::new(fetch, router, cache.clone()),
            pages: PageService::new(mutator.clone()),
            mutator,
            cache,
            agent: Arc::new(Sequencer::new(Arc::new(agent))),
            images,
            config: config.clone(),
        }
    }

    /// Client over a cookie-carrying `reqwest` transport and the configured
    /// upload backend.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let images = object_store(config).map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self::new(config, Arc::new(ReqwestTransport::new()?), images))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one slot of `batch` through the page-image pipeline and upload it
    /// under the session's website.
    pub async fn upload_page_image(
        &self,
        ctx: &SessionContext,
        batch: &mut ImageBatch,
        local_id: Uuid,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let options = self.config.page_image_options(ctx.website_id);
        batch.process(local_id, bytes, &options, self.images.as_ref()).await
    }

    /// Same as [`Self::upload_page_image`] with the media-library budget.
    pub async fn upload_library_image(
        &self,
        ctx: &SessionContext,
        batch: &mut ImageBatch,
        local_id: Uuid,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let options = self.config.library_image_options(ctx.website_id);
        batch.process(local_id, bytes, &options, self.images.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use bizsite_core::content::ContentRequest;
    use bizsite_core::media::LocalStore;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 13 % 256) as u8, (y * 29 % 256) as u8, ((x ^ y) * 7 % 256) as u8])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn site(transport: Arc<MockTransport>, dir: std::path::PathBuf) -> SiteClient {
        let config = ClientConfig {
            api_base_url: "http://api.local".into(),
            content_agent_url: "http://agent.local/api/content-agent".into(),
            ..ClientConfig::default()
        };
        let images = Arc::new(LocalStore::new(dir, "/uploads"));
        SiteClient::new(&config, transport, images)
    }

    #[tokio::test]
    async fn agent_posts_to_the_configured_endpoint() {
        let transport = MockTransport::new();
        transport.reply_json(200, json!({"step": "ideas_generated", "ideas": []}));
        let site = site(transport.clone(), std::env::temp_dir());

        let response = site
            .agent
            .request_ideas(ContentRequest::for_ideas("Austin", "roofing", "roof repair"))
            .await
            .unwrap();

        assert_eq!(response.step(), "ideas_generated");
        assert_eq!(
            transport.requests()[0].url,
            "http://agent.local/api/content-agent"
        );
        assert_eq!(site.agent.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn page_image_lands_under_the_session_website() {
        let dir = std::env::temp_dir().join(format!("bizsite-site-{}", Uuid::new_v4()));
        let site = site(MockTransport::new(), dir.clone());
        let mut batch = ImageBatch::new();
        let id = batch.add("storefront.png");

        let url = site
            .upload_page_image(&SessionContext::for_website(3), &mut batch, id, &png(24, 24))
            .await
            .unwrap();

        assert_eq!(url, format!("/uploads/websites/3/pages/{id}.jpg"));
        let stored = std::fs::read(dir.join(format!("websites/3/pages/{id}.jpg"))).unwrap();
        assert_eq!(&stored[..2], &[0xFF, 0xD8]);
        assert_eq!(batch.uploaded_images()[0].url, url);

        let library = batch.add("logo.png");
        let url = site
            .upload_library_image(&SessionContext::for_website(3), &mut batch, library, &png(8, 8))
            .await
            .unwrap();
        assert_eq!(url, format!("/uploads/websites/3/library/{library}.jpg"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
