use std::sync::Arc;

use bizsite_core::model::{Asset, BlogPost, BusinessListing, Page, RowId, SeoMetadata, User, Website};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{CacheLookup, QueryCache};
use crate::error::ClientError;
use crate::http::FetchClient;
use crate::routing::ApiRouter;

/// Filter for a website's page list, shared by the reader and by writers
/// that must invalidate it.
pub fn pages_query(website_id: RowId) -> String {
    format!("website_id=eq.{website_id}&order=sort_order.asc")
}

pub fn seo_metadata_query(page_id: RowId) -> String {
    format!("page_id=eq.{page_id}")
}

/// Snapshot of one cached read.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<ClientError>,
}

impl<T> QueryState<T> {
    /// No request made.
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::idle()
        }
    }

    pub fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::idle()
        }
    }

    pub fn failed(error: ClientError) -> Self {
        Self {
            error: Some(error),
            ..Self::idle()
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        QueryState {
            data: self.data.map(f),
            is_loading: self.is_loading,
            error: self.error,
        }
    }

    fn from_result(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(data) => Self::ready(data),
            Err(e) => Self::failed(e),
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// Cached, read-only access to the backend. Keys are fully-resolved URLs, so
/// a writer can invalidate exactly what a reader cached by asking for the
/// same key.
#[derive(Clone)]
pub struct DataReader {
    fetch: FetchClient,
    router: ApiRouter,
    cache: Arc<QueryCache>,
}

impl DataReader {
    pub fn new(fetch: FetchClient, router: ApiRouter, cache: Arc<QueryCache>) -> Self {
        Self {
            fetch,
            router,
            cache,
        }
    }

    pub fn pages_key(&self, website_id: RowId) -> String {
        self.router.to_api_url("/page", Some(&pages_query(website_id)))
    }

    pub fn page_key(&self, page_id: RowId) -> String {
        self.router.to_api_url(&format!("/page/{page_id}"), None)
    }

    pub fn seo_metadata_key(&self, page_id: RowId) -> String {
        self.router
            .to_api_url("/seo-metadata", Some(&seo_metadata_query(page_id)))
    }

    pub fn assets_key(&self, website_id: RowId) -> String {
        self.router
            .to_api_url("/asset", Some(&format!("website_id=eq.{website_id}")))
    }

    pub fn business_listing_key(&self, website_id: RowId) -> String {
        self.router.to_api_url(
            "/business-listing",
            Some(&format!("website_id=eq.{website_id}")),
        )
    }

    /// The term is percent-encoded so it cannot add filters of its own.
    pub fn user_search_key(&self, website_id: RowId, term: &str) -> String {
        let term: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
        self.router.to_api_url(
            "/user",
            Some(&format!("website_id=eq.{website_id}&email=like.{term}*")),
        )
    }

    pub fn websites_key(&self) -> String {
        self.router.to_api_url("/website", None)
    }

    pub fn blog_posts_key(&self, website_id: RowId) -> String {
        self.router.to_api_url(
            "/blog-post",
            Some(&format!("website_id=eq.{website_id}&order=created_at.desc")),
        )
    }

    pub async fn pages(&self, website_id: Option<RowId>) -> QueryState<Vec<Page>> {
        self.read(website_id.map(|id| self.pages_key(id))).await
    }

    pub async fn page(&self, page_id: Option<RowId>) -> QueryState<Page> {
        self.read(page_id.map(|id| self.page_key(id))).await
    }

    /// The metadata row for a page, if one exists.
    pub async fn seo_metadata(&self, page_id: Option<RowId>) -> QueryState<Option<SeoMetadata>> {
        self.read::<Vec<SeoMetadata>>(page_id.map(|id| self.seo_metadata_key(id)))
            .await
            .map(|rows| rows.into_iter().next())
    }

    pub async fn assets(&self, website_id: Option<RowId>) -> QueryState<Vec<Asset>> {
        self.read(website_id.map(|id| self.assets_key(id))).await
    }

    pub async fn business_listing(
        &self,
        website_id: Option<RowId>,
    ) -> QueryState<Option<BusinessListing>> {
        self.read::<Vec<BusinessListing>>(website_id.map(|id| self.business_listing_key(id)))
            .await
            .map(|rows| rows.into_iter().next())
    }

    /// Users of a website whose email starts with `term`. A blank term makes
    /// no request.
    pub async fn search_users(&self, website_id: Option<RowId>, term: &str) -> QueryState<Vec<User>> {
        let term = term.trim();
        let key = website_id
            .filter(|_| !term.is_empty())
            .map(|id| self.user_search_key(id, term));
        self.read(key).await
    }

    pub async fn websites(&self) -> QueryState<Vec<Website>> {
        self.read(Some(self.websites_key())).await
    }

    pub async fn blog_posts(&self, website_id: Option<RowId>) -> QueryState<Vec<BlogPost>> {
        self.read(website_id.map(|id| self.blog_posts_key(id))).await
    }

    /// Current state of `key` without issuing a request.
    pub fn state<T: DeserializeOwned>(&self, key: &str) -> QueryState<T> {
        match self.cache.lookup(key) {
            CacheLookup::Missing => QueryState::idle(),
            CacheLookup::Pending => QueryState::loading(),
            CacheLookup::Ready(result) => QueryState::from_result(result.and_then(decode)),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: Option<String>) -> QueryState<T> {
        let Some(key) = key else {
            return QueryState::idle();
        };
        let fetch = &self.fetch;
        let url = key.clone();
        let result = self
            .cache
            .get_or_fetch(&key, || async move {
                Ok(fetch.get(&url).await?.unwrap_or(Value::Null))
            })
            .await;
        QueryState::from_result(result.and_then(decode))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}
