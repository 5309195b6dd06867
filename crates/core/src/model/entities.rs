use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row identifiers as issued by the backend.
pub type RowId = i64;

/// Root tenant. Every other record is scoped by `website_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub id: RowId,
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A content page. `parent_id` is a back-reference into the page tree, not
/// ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: RowId,
    pub website_id: RowId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<RowId>,
    #[serde(default)]
    pub is_main_nav: bool,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a page. New pages always start as drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
    pub website_id: RowId,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RowId>,
    pub is_main_nav: bool,
    pub is_published: bool,
    pub sort_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,
}

impl NewPage {
    pub fn draft(website_id: RowId, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            website_id,
            title: title.into(),
            slug: slug.into(),
            content: String::new(),
            page_type: None,
            template_type: None,
            parent_id: None,
            is_main_nav: false,
            is_published: false,
            sort_order: 0,
            meta_description: None,
            meta_keywords: None,
        }
    }

    pub fn with_content(mut self, markdown: impl Into<String>) -> Self {
        self.content = markdown.into();
        self
    }
}

/// The content row a piece of SEO metadata belongs to. Exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoOwner {
    Page(RowId),
    BlogPost(RowId),
}

impl SeoOwner {
    pub fn column(&self) -> &'static str {
        match self {
            SeoOwner::Page(_) => "page_id",
            SeoOwner::BlogPost(_) => "blog_post_id",
        }
    }

    pub fn id(&self) -> RowId {
        match self {
            SeoOwner::Page(id) | SeoOwner::BlogPost(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub id: RowId,
    #[serde(default)]
    pub page_id: Option<RowId>,
    #[serde(default)]
    pub blog_post_id: Option<RowId>,
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub keywords: String,
}

impl SeoMetadata {
    pub fn owner(&self) -> Option<SeoOwner> {
        match (self.page_id, self.blog_post_id) {
            (Some(id), None) => Some(SeoOwner::Page(id)),
            (None, Some(id)) => Some(SeoOwner::BlogPost(id)),
            _ => None,
        }
    }
}

/// Insert payload for SEO metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeoMetadata {
    pub owner: SeoOwner,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: String,
}

impl Serialize for NewSeoMetadata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(self.owner.column(), &self.owner.id())?;
        map.serialize_entry("meta_title", &self.meta_title)?;
        map.serialize_entry("meta_description", &self.meta_description)?;
        map.serialize_entry("keywords", &self.keywords)?;
        map.end()
    }
}

/// An uploaded image. Immutable; `url` points at object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: RowId,
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Which join table links images to a content entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwnerKind {
    Page,
    BlogPost,
    Service,
}

impl ImageOwnerKind {
    /// Foreign-key column on the join row.
    pub fn foreign_key(&self) -> &'static str {
        match self {
            ImageOwnerKind::Page => "page_id",
            ImageOwnerKind::BlogPost => "blog_post_id",
            ImageOwnerKind::Service => "service_id",
        }
    }

    pub fn join_resource(&self) -> super::Resource {
        match self {
            ImageOwnerKind::Page => super::Resource::PageImages,
            ImageOwnerKind::BlogPost => super::Resource::BlogPostImages,
            ImageOwnerKind::Service => super::Resource::ServiceImages,
        }
    }
}

/// Join row between a content entity and an image. Append-only; only
/// `order` changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    pub image_id: RowId,
    pub order: i32,
    /// The owner foreign key (`page_id`, `blog_post_id` or `service_id`).
    #[serde(flatten)]
    pub owner: serde_json::Map<String, serde_json::Value>,
}

impl ImageLink {
    pub fn new(kind: ImageOwnerKind, owner_id: RowId, image_id: RowId, order: i32) -> Self {
        let mut owner = serde_json::Map::new();
        owner.insert(kind.foreign_key().to_string(), owner_id.into());
        Self {
            id: None,
            image_id,
            order,
            owner,
        }
    }

    pub fn owner_id(&self, kind: ImageOwnerKind) -> Option<RowId> {
        self.owner.get(kind.foreign_key()).and_then(|v| v.as_i64())
    }
}

/// Business profile listing. Treated as one per website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessListing {
    pub id: RowId,
    pub website_id: RowId,
    pub business_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Dashboard operator account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RowId,
    pub website_id: RowId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Media library entry listed in the asset browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: RowId,
    pub website_id: RowId,
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: RowId,
    pub website_id: RowId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
