use std::sync::Arc;

use bizsite_core::model::{Resource, SingularLookup};
use serde_json::Value;

use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::http::FetchClient;
use crate::routing::{split_path, ApiRouter, HttpMethod};

/// A write against a logical path.
#[derive(Debug, Clone, PartialEq)]
pub struct MutateRequest {
    pub path: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
    /// Cache key to drop once the write succeeds.
    pub mutate_key: Option<String>,
    pub additional_headers: Vec<(String, String)>,
}

impl MutateRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            payload: None,
            mutate_key: None,
            additional_headers: Vec::new(),
        }
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn invalidates(mut self, key: impl Into<String>) -> Self {
        self.mutate_key = Some(key.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Ask the backend to return the written rows.
    pub fn returning(self) -> Self {
        self.header("Prefer", "return=representation")
    }
}

/// Result of a write. Exactly one of the fields is set on failure; a
/// successful write may still have no response body.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub response: Option<Value>,
    pub error: Option<ClientError>,
}

impl MutationOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<Value>, ClientError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.response),
        }
    }
}

/// Issues writes, resolving ids for "one row per filter" resources and
/// invalidating the read cache afterwards.
#[derive(Clone)]
pub struct Mutator {
    fetch: FetchClient,
    router: ApiRouter,
    cache: Arc<QueryCache>,
}

impl Mutator {
    pub fn new(fetch: FetchClient, router: ApiRouter, cache: Arc<QueryCache>) -> Self {
        Self {
            fetch,
            router,
            cache,
        }
    }

    pub fn router(&self) -> &ApiRouter {
        &self.router
    }

    /// Drop a cache key outside of a write, for writes that stale more than
    /// one read.
    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    /// Uncached GET, for reads that must observe a write just made.
    pub async fn read_through(&self, path: &str) -> Result<Option<Value>, ClientError> {
        self.fetch.get(&self.router.to_api_url(path, None)).await
    }

    /// Never fails; errors come back in the outcome.
    pub async fn mutate(&self, request: MutateRequest) -> MutationOutcome {
        match self.dispatch(&request).await {
            Ok(response) => {
                if let Some(key) = &request.mutate_key {
                    self.cache.invalidate(key);
                }
                MutationOutcome {
                    response,
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(method = %request.method, path = %request.path, "mutation failed: {error}");
                MutationOutcome {
                    response: None,
                    error: Some(error),
                }
            }
        }
    }

    async fn dispatch(&self, request: &MutateRequest) -> Result<Option<Value>, ClientError> {
        let method = request.method.normalize();
        let (path, query) = split_path(&request.path);

        let url = match method {
            HttpMethod::Put => match self.resolve_singular(path, query).await? {
                Some(url) => url,
                None => self.router.to_api_url(path, query),
            },
            _ => self.router.to_api_url(path, query),
        };

        self.fetch
            .request(&url, method, request.payload.as_ref(), &request.additional_headers)
            .await
    }

    /// Id-suffixed URL for an update of a singular resource, or `None` when
    /// the path is not one.
    async fn resolve_singular(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let Some(resource) = Resource::parse(path) else {
            return Ok(None);
        };
        let Some(lookup) = resource.singular_lookup() else {
            return Ok(None);
        };
        let filters = query
            .and_then(|q| bizsite_query::parse(q).ok())
            .unwrap_or_default();

        let id = match (filters.equality_value("id"), lookup) {
            (Some(id), _) => id.to_string(),
            (None, SingularLookup::ById) => {
                return Err(ClientError::InvalidRequest(format!(
                    "updating {resource} requires an id filter"
                )))
            }
            (None, SingularLookup::ByParent { foreign_key }) => {
                let parent = filters.equality_value(foreign_key).ok_or_else(|| {
                    ClientError::InvalidRequest(format!(
                        "updating {resource} requires an id or {foreign_key} filter"
                    ))
                })?;
                self.discover_id(resource, foreign_key, parent).await?
            }
        };

        Ok(Some(format!(
            "{}{}/{}",
            self.router.base_url(),
            resource.api_path(),
            id
        )))
    }

    async fn discover_id(
        &self,
        resource: Resource,
        foreign_key: &str,
        parent: &str,
    ) -> Result<String, ClientError> {
        let rows = self
            .read_through(&format!("{}?{foreign_key}=eq.{parent}", resource.logical_path()))
            .await?;
        let id = rows
            .as_ref()
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("id"))
            .and_then(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            });

        match id {
            Some(id) => {
                tracing::debug!(%resource, foreign_key, parent, %id, "resolved row id for update");
                Ok(id)
            }
            None => Err(ClientError::NotFound(format!(
                "no {resource} row found for {foreign_key}={parent}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn mutator(transport: Arc<MockTransport>) -> (Mutator, Arc<QueryCache>) {
        let cache = Arc::new(QueryCache::default());
        let m = Mutator::new(
            FetchClient::new(transport),
            ApiRouter::new("http://api.local"),
            cache.clone(),
        );
        (m, cache)
    }

    #[tokio::test]
    async fn user_update_is_id_suffixed() {
        let transport = MockTransport::new();
        transport.reply_json(200, json!({"id": 7, "name": "Ann"}));
        let (m, _) = mutator(transport.clone());

        let outcome = m
            .mutate(MutateRequest::new(HttpMethod::Put, "/users?id=eq.7").payload(json!({"name": "Ann"})))
            .await;

        assert!(outcome.is_ok());
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert!(sent.url.ends_with("/7"));
        assert_eq!(sent.url, "http://api.local/users/7");
    }

    #[tokio::test]
    async fn patch_is_sent_as_put() {
        let transport = MockTransport::new();
        transport.reply(200, "");
        let (m, _) = mutator(transport.clone());

        m.mutate(MutateRequest::new(HttpMethod::Patch, "/page/3").payload(json!({"title": "x"})))
            .await;

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.url, "http://api.local/pages/3");
    }

    #[tokio::test]
    async fn business_listing_update_looks_up_id_first() {
        let transport = MockTransport::new();
        transport
            .reply_json(200, json!([{"id": 42, "website_id": 3}]))
            .reply_json(200, json!({"id": 42}));
        let (m, _) = mutator(transport.clone());

        let outcome = m
            .mutate(
                MutateRequest::new(HttpMethod::Patch, "/business-listing?website_id=eq.3")
                    .payload(json!({"phone": "555"})),
            )
            .await;

        assert!(outcome.is_ok());
        let sent = transport.requests();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "http://api.local/business-listings?website_id=3");
        assert_eq!(sent[1].method, HttpMethod::Put);
        assert_eq!(sent[1].url, "http://api.local/business-listings/42");
    }

    #[tokio::test]
    async fn lookup_with_no_rows_returns_error_without_put() {
        let transport = MockTransport::new();
        transport.reply_json(200, json!([]));
        let (m, _) = mutator(transport.clone());

        let outcome = m
            .mutate(MutateRequest::new(HttpMethod::Put, "/business-listing?website_id=eq.9"))
            .await;

        assert_eq!(outcome.response, None);
        assert_eq!(
            outcome.error,
            Some(ClientError::NotFound(
                "no business-listings row found for website_id=9".into()
            ))
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn user_update_without_id_is_rejected() {
        let transport = MockTransport::new();
        let (m, _) = mutator(transport.clone());

        let outcome = m.mutate(MutateRequest::new(HttpMethod::Put, "/user?email=eq.a@b.c")).await;

        assert!(matches!(outcome.error, Some(ClientError::InvalidRequest(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn success_invalidates_key_failure_does_not() {
        let transport = MockTransport::new();
        transport.reply_json(201, json!([{"id": 1}])).reply(500, "boom");
        let (m, cache) = mutator(transport);
        let key = "http://api.local/pages?website_id=3";

        cache.get_or_fetch(key, || async { Ok(json!([])) }).await.unwrap();
        let outcome = m
            .mutate(MutateRequest::new(HttpMethod::Post, "/page").payload(json!({})).invalidates(key))
            .await;
        assert!(outcome.is_ok());
        assert!(cache.is_empty());

        cache.get_or_fetch(key, || async { Ok(json!([])) }).await.unwrap();
        let outcome = m
            .mutate(MutateRequest::new(HttpMethod::Post, "/page").payload(json!({})).invalidates(key))
            .await;
        assert_eq!(outcome.error.and_then(|e| e.status()), Some(500));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_are_captured() {
        let transport = MockTransport::new();
        transport.fail(ClientError::Network("connection refused".into()));
        let (m, _) = mutator(transport);

        let outcome = m.mutate(MutateRequest::new(HttpMethod::Delete, "/image/4")).await;
        assert_eq!(
            outcome.into_result(),
            Err(ClientError::Network("connection refused".into()))
        );
    }
}
