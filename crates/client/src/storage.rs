//! Upload backends for processed images.

use std::sync::Arc;

use async_trait::async_trait;
use bizsite_core::media::{LocalStore, MediaError, ObjectStore, UploadedObject};
use serde::Deserialize;
use url::Url;

use crate::config::{ClientConfig, ConfigError};

/// The configured upload backend: S3 when built with `s3` and `S3_BUCKET`
/// is set, then the HTTP upload endpoint if `UPLOAD_BASE_URL` is set, and
/// files under `LOCAL_UPLOAD_DIR` otherwise.
pub fn object_store(config: &ClientConfig) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    #[cfg(feature = "s3")]
    {
        if std::env::var("S3_BUCKET").is_ok() {
            return Ok(Arc::new(S3Store::new(S3Settings::from_env()?)));
        }
    }
    match config.upload_url.as_deref() {
        Some(endpoint) => Ok(Arc::new(HttpObjectStore::new(endpoint)?)),
        None => {
            tracing::info!(dir = %config.local_upload_dir.display(), "storing uploads on disk");
            Ok(Arc::new(LocalStore::new(
                config.local_upload_dir.clone(),
                config.local_upload_url.clone(),
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Posts raw bytes to an upload endpoint that answers `{"url": ...}`.
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|_| ConfigError::Invalid {
            name: "UPLOAD_BASE_URL",
            expected: "URL",
            value: endpoint.to_string(),
        })?;
        Ok(Self { client, endpoint })
    }

    fn upload_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", key);
        url
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, MediaError> {
        let size = data.len() as u64;
        let response = self
            .client
            .post(self.upload_url(key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| MediaError::Upload(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Upload(format!("upload rejected with {status}: {body}")));
        }
        let UploadResponse { url } = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(format!("upload response was not understood: {e}")))?;

        tracing::debug!(key, size, %url, "object uploaded");
        Ok(UploadedObject {
            key: key.to_string(),
            url,
            size,
        })
    }

    /// The endpoint decides the final URL; this is only where the object
    /// was sent.
    fn public_url(&self, key: &str) -> String {
        self.upload_url(key).to_string()
    }
}

/// S3 connection settings, read from `S3_*` variables.
#[cfg(feature = "s3")]
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_url: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let require = |name: &'static str| std::env::var(name).map_err(|_| ConfigError::Missing(name));
        Ok(Self {
            endpoint: require("S3_ENDPOINT")?,
            bucket: require("S3_BUCKET")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: require("S3_ACCESS_KEY_ID")?,
            secret_access_key: require("S3_SECRET_ACCESS_KEY")?,
            public_url: std::env::var("S3_PUBLIC_URL").ok(),
        })
    }
}

/// S3-compatible bucket store.
#[cfg(feature = "s3")]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Store {
    pub fn new(settings: S3Settings) -> Self {
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "bizsite",
        );
        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(settings.endpoint)
            .region(Region::new(settings.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: settings.bucket,
            public_url: settings.public_url,
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, MediaError> {
        use aws_sdk_s3::primitives::ByteStream;

        let size = data.len() as u64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| MediaError::Upload(format!("S3 upload failed: {e}")))?;

        Ok(UploadedObject {
            key: key.to_string(),
            url: self.public_url(key),
            size,
        })
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}
