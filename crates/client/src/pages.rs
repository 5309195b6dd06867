use bizsite_core::context::SessionContext;
use bizsite_core::model::{ImageLink, ImageOwnerKind, NewImage, NewPage, NewSeoMetadata, RowId, SeoOwner};
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::hooks::{pages_query, seo_metadata_query};
use crate::mutate::{MutateRequest, MutationOutcome, Mutator};
use crate::routing::HttpMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePageRequest {
    pub page: NewPage,
    pub images: Vec<NewImage>,
    /// Join table the images are linked through.
    pub link: ImageOwnerKind,
}

impl CreatePageRequest {
    pub fn new(page: NewPage) -> Self {
        Self {
            page,
            images: Vec::new(),
            link: ImageOwnerKind::Page,
        }
    }

    pub fn with_images(mut self, images: Vec<NewImage>) -> Self {
        self.images = images;
        self
    }
}

/// How far a page creation got. The steps are separate writes, so a failure
/// after the page insert leaves the page in place; `partial_success` says so
/// and `page_id` names it for a retry through [`PageService::attach_images`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePageOutcome {
    pub success: bool,
    pub partial_success: bool,
    pub page_id: Option<RowId>,
    pub image_ids: Vec<RowId>,
    pub error: Option<ClientError>,
}

impl CreatePageOutcome {
    fn failed(error: ClientError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    fn partial(page_id: Option<RowId>, error: ClientError) -> Self {
        Self {
            partial_success: true,
            page_id,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Multi-step page and SEO writes on top of [`Mutator`].
#[derive(Clone)]
pub struct PageService {
    mutator: Mutator,
}

impl PageService {
    pub fn new(mutator: Mutator) -> Self {
        Self { mutator }
    }

    fn pages_key(&self, website_id: RowId) -> String {
        self.mutator
            .router()
            .to_api_url("/page", Some(&pages_query(website_id)))
    }

    /// Insert a page, then its images, then the join rows, strictly in that
    /// order. The page always lands on the session's website.
    pub async fn create_page(
        &self,
        ctx: &SessionContext,
        request: CreatePageRequest,
    ) -> CreatePageOutcome {
        let CreatePageRequest {
            mut page,
            images,
            link,
        } = request;
        page.website_id = ctx.website_id;

        let payload = match to_payload(&page) {
            Ok(p) => p,
            Err(e) => return CreatePageOutcome::failed(e),
        };
        let created = self
            .mutator
            .mutate(
                MutateRequest::new(HttpMethod::Post, "/page")
                    .payload(payload)
                    .returning()
                    .invalidates(self.pages_key(ctx.website_id)),
            )
            .await;
        let response = match created.into_result() {
            Ok(r) => r,
            Err(e) => return CreatePageOutcome::failed(e),
        };

        let page_id = match response.as_ref().and_then(|r| row_ids(r).first().copied()) {
            Some(id) => id,
            None => match self.latest_page_id(ctx.website_id).await {
                Ok(id) => id,
                Err(e) => return CreatePageOutcome::partial(None, e),
            },
        };
        tracing::info!(page_id, website_id = ctx.website_id, "page created");

        if images.is_empty() {
            return CreatePageOutcome {
                success: true,
                page_id: Some(page_id),
                ..CreatePageOutcome::default()
            };
        }

        match self.attach_images(link, page_id, &images).await {
            Ok(image_ids) => CreatePageOutcome {
                success: true,
                page_id: Some(page_id),
                image_ids,
                ..CreatePageOutcome::default()
            },
            Err(e) => {
                tracing::warn!(page_id, "page created without its images: {e}");
                CreatePageOutcome::partial(Some(page_id), e)
            }
        }
    }

    /// The newest page of a website, for backends that do not return the
    /// inserted row.
    async fn latest_page_id(&self, website_id: RowId) -> Result<RowId, ClientError> {
        let rows = self
            .mutator
            .read_through(&format!(
                "/page?website_id=eq.{website_id}&order=created_at.desc&limit=1"
            ))
            .await?;
        rows.as_ref()
            .and_then(|r| row_ids(r).first().copied())
            .ok_or_else(|| {
                ClientError::UnexpectedResponse(format!(
                    "created page not found for website {website_id}"
                ))
            })
    }

    /// Insert image rows in one request and link each to `owner_id` in list
    /// order. Also the retry step after a partial page creation.
    pub async fn attach_images(
        &self,
        kind: ImageOwnerKind,
        owner_id: RowId,
        images: &[NewImage],
    ) -> Result<Vec<RowId>, ClientError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = self
            .mutator
            .mutate(
                MutateRequest::new(HttpMethod::Post, "/image")
                    .payload(to_payload(images)?)
                    .returning(),
            )
            .await
            .into_result()?;
        let image_ids = inserted.as_ref().map(row_ids).unwrap_or_default();
        if image_ids.len() != images.len() {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected {} image ids, backend returned {}",
                images.len(),
                image_ids.len()
            )));
        }

        let links: Vec<ImageLink> = image_ids
            .iter()
            .enumerate()
            .map(|(order, &image_id)| ImageLink::new(kind, owner_id, image_id, order as i32))
            .collect();
        self.mutator
            .mutate(
                MutateRequest::new(HttpMethod::Post, kind.join_resource().logical_path())
                    .payload(to_payload(&links)?),
            )
            .await
            .into_result()?;

        Ok(image_ids)
    }

    pub async fn create_seo_metadata(&self, metadata: &NewSeoMetadata) -> MutationOutcome {
        let payload = match to_payload(metadata) {
            Ok(p) => p,
            Err(e) => return error_outcome(e),
        };
        let mut request = MutateRequest::new(HttpMethod::Post, "/seo-metadata")
            .payload(payload)
            .returning();
        if let Some(key) = self.seo_key(metadata.owner) {
            request = request.invalidates(key);
        }
        self.mutator.mutate(request).await
    }

    pub async fn update_seo_metadata(&self, id: RowId, metadata: &NewSeoMetadata) -> MutationOutcome {
        let payload = match to_payload(metadata) {
            Ok(p) => p,
            Err(e) => return error_outcome(e),
        };
        let mut request =
            MutateRequest::new(HttpMethod::Put, format!("/seo-metadata/{id}")).payload(payload);
        if let Some(key) = self.seo_key(metadata.owner) {
            request = request.invalidates(key);
        }
        self.mutator.mutate(request).await
    }

    /// Partial update of a page row. Drops both the page and its website's
    /// page list from the cache.
    pub async fn update_page(
        &self,
        ctx: &SessionContext,
        page_id: RowId,
        changes: Value,
    ) -> MutationOutcome {
        let outcome = self
            .mutator
            .mutate(
                MutateRequest::new(HttpMethod::Patch, format!("/page/{page_id}"))
                    .payload(changes)
                    .invalidates(self.pages_key(ctx.website_id)),
            )
            .await;
        if outcome.is_ok() {
            let page_key = self
                .mutator
                .router()
                .to_api_url(&format!("/page/{page_id}"), None);
            self.mutator.invalidate(&page_key);
        }
        outcome
    }

    fn seo_key(&self, owner: SeoOwner) -> Option<String> {
        match owner {
            SeoOwner::Page(page_id) => Some(
                self.mutator
                    .router()
                    .to_api_url("/seo-metadata", Some(&seo_metadata_query(page_id))),
            ),
            SeoOwner::BlogPost(_) => None,
        }
    }
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::InvalidRequest(e.to_string()))
}

fn error_outcome(error: ClientError) -> MutationOutcome {
    MutationOutcome {
        response: None,
        error: Some(error),
    }
}

/// Ids of the rows in a representation response, which may be a single
/// object or an array.
fn row_ids(value: &Value) -> Vec<RowId> {
    let id_of = |row: &Value| row.get("id").and_then(Value::as_i64);
    match value {
        Value::Array(rows) => rows.iter().filter_map(id_of).collect(),
        Value::Object(_) => id_of(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::http::FetchClient;
    use crate::mock::MockTransport;
    use crate::routing::ApiRouter;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn service(transport: Arc<MockTransport>) -> PageService {
        PageService::new(Mutator::new(
            FetchClient::new(transport),
            ApiRouter::new("http://api.local"),
            Arc::new(QueryCache::default()),
        ))
    }

    fn image(url: &str) -> NewImage {
        NewImage {
            url: url.to_string(),
            alt_text: None,
            caption: None,
        }
    }

    fn request() -> CreatePageRequest {
        CreatePageRequest::new(NewPage::draft(99, "Plumbing", "plumbing"))
    }

    #[tokio::test]
    async fn creates_page_images_and_links() {
        let transport = MockTransport::new();
        transport
            .reply_json(201, json!([{"id": 12, "website_id": 3}]))
            .reply_json(201, json!([{"id": 40, "url": "a"}, {"id": 41, "url": "b"}]))
            .reply_json(201, json!([]));
        let svc = service(transport.clone());

        let outcome = svc
            .create_page(
                &SessionContext::for_website(3),
                request().with_images(vec![image("a"), image("b")]),
            )
            .await;

        assert!(outcome.success);
        assert!(!outcome.partial_success);
        assert_eq!(outcome.page_id, Some(12));
        assert_eq!(outcome.image_ids, vec![40, 41]);

        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].url, "http://api.local/pages");
        assert_eq!(sent[0].header("Prefer"), Some("return=representation"));
        assert_eq!(sent[0].body.as_ref().unwrap()["website_id"], json!(3));
        assert_eq!(sent[1].url, "http://api.local/images");
        assert_eq!(sent[2].url, "http://api.local/page-images");

        let links = sent[2].body.as_ref().unwrap().as_array().unwrap();
        assert_eq!(links.len(), 2);
        for (i, link) in links.iter().enumerate() {
            assert_eq!(link["page_id"], json!(12));
            assert_eq!(link["image_id"], json!(40 + i as i64));
            assert_eq!(link["order"], json!(i));
        }
    }

    #[tokio::test]
    async fn falls_back_to_latest_page_lookup() {
        let transport = MockTransport::new();
        transport
            .reply(201, "")
            .reply_json(200, json!([{"id": 77, "website_id": 3}]));
        let svc = service(transport.clone());

        let outcome = svc.create_page(&SessionContext::for_website(3), request()).await;

        assert!(outcome.success);
        assert_eq!(outcome.page_id, Some(77));
        assert!(outcome.image_ids.is_empty());
        assert_eq!(
            transport.requests()[1].url,
            "http://api.local/pages?website_id=3&_sort=created_at&_order=desc&_limit=1"
        );
    }

    #[tokio::test]
    async fn image_failure_is_partial_success() {
        let transport = MockTransport::new();
        transport
            .reply_json(201, json!({"id": 12}))
            .reply(500, "disk full");
        let svc = service(transport.clone());

        let outcome = svc
            .create_page(
                &SessionContext::for_website(3),
                request().with_images(vec![image("a")]),
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.partial_success);
        assert_eq!(outcome.page_id, Some(12));
        assert!(outcome.image_ids.is_empty());
        assert_eq!(outcome.error.and_then(|e| e.status()), Some(500));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn page_failure_is_total_failure() {
        let transport = MockTransport::new();
        transport.reply(409, "duplicate slug");
        let svc = service(transport.clone());

        let outcome = svc
            .create_page(
                &SessionContext::for_website(3),
                request().with_images(vec![image("a")]),
            )
            .await;

        assert!(!outcome.success);
        assert!(!outcome.partial_success);
        assert_eq!(outcome.page_id, None);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn attach_images_links_blog_posts() {
        let transport = MockTransport::new();
        transport
            .reply_json(201, json!({"id": 5}))
            .reply(201, "");
        let svc = service(transport.clone());

        let ids = assert_ok!(svc.attach_images(ImageOwnerKind::BlogPost, 8, &[image("a")]).await);

        assert_eq!(ids, vec![5]);
        let sent = transport.requests();
        assert_eq!(sent[1].url, "http://api.local/blog-post-images");
        assert_eq!(sent[1].body.as_ref().unwrap()[0]["blog_post_id"], json!(8));
    }

    #[tokio::test]
    async fn seo_metadata_writes_a_single_owner_column() {
        let transport = MockTransport::new();
        transport.reply_json(201, json!({"id": 1})).reply(200, "");
        let svc = service(transport.clone());
        let meta = NewSeoMetadata {
            owner: SeoOwner::Page(4),
            meta_title: "Title".into(),
            meta_description: "Description".into(),
            keywords: "a, b, c".into(),
        };

        assert!(svc.create_seo_metadata(&meta).await.is_ok());
        assert!(svc.update_seo_metadata(1, &meta).await.is_ok());

        let sent = transport.requests();
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["page_id"], json!(4));
        assert!(body.get("blog_post_id").is_none());
        assert_eq!(sent[1].method, HttpMethod::Put);
        assert_eq!(sent[1].url, "http://api.local/seo-metadata/1");
    }
}
