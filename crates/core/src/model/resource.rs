/// Backend resources and the logical paths the dashboard uses for them.
///
/// The dashboard addresses resources by singular logical paths (`/page`,
/// `/business-listing`); the REST backend serves plural collections
/// (`/pages`, `/business-listings`). Either spelling parses.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Pages,
    Websites,
    BusinessListings,
    Images,
    Users,
    PageImages,
    BlogPostImages,
    ServiceImages,
    SeoMetadata,
    Assets,
    BlogPosts,
    Services,
}

/// How the row targeted by an update on a singular resource is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularLookup {
    /// The row id is given directly as `id=eq.N`.
    ById,
    /// Only the parent foreign key is known; the row id must be discovered
    /// with a preliminary read.
    ByParent { foreign_key: &'static str },
}

const ALL: [Resource; 12] = [
    Resource::Pages,
    Resource::Websites,
    Resource::BusinessListings,
    Resource::Images,
    Resource::Users,
    Resource::PageImages,
    Resource::BlogPostImages,
    Resource::ServiceImages,
    Resource::SeoMetadata,
    Resource::Assets,
    Resource::BlogPosts,
    Resource::Services,
];

impl Resource {
    /// Resolve a path segment such as `/page`, `page` or `/pages`.
    pub fn parse(path: &str) -> Option<Self> {
        let segment = path.trim_matches('/');
        ALL.into_iter().find(|r| {
            r.logical_path().trim_start_matches('/') == segment
                || r.api_path().trim_start_matches('/') == segment
        })
    }

    /// Path used by the dashboard code.
    pub fn logical_path(&self) -> &'static str {
        match self {
            Resource::Pages => "/page",
            Resource::Websites => "/website",
            Resource::BusinessListings => "/business-listing",
            Resource::Images => "/image",
            Resource::Users => "/user",
            Resource::PageImages => "/page-image",
            Resource::BlogPostImages => "/blog-post-image",
            Resource::ServiceImages => "/service-image",
            Resource::SeoMetadata => "/seo-metadata",
            Resource::Assets => "/asset",
            Resource::BlogPosts => "/blog-post",
            Resource::Services => "/service",
        }
    }

    /// Path of the backend collection.
    pub fn api_path(&self) -> &'static str {
        match self {
            Resource::Pages => "/pages",
            Resource::Websites => "/websites",
            Resource::BusinessListings => "/business-listings",
            Resource::Images => "/images",
            Resource::Users => "/users",
            Resource::PageImages => "/page-images",
            Resource::BlogPostImages => "/blog-post-images",
            Resource::ServiceImages => "/service-images",
            Resource::SeoMetadata => "/seo-metadata",
            Resource::Assets => "/assets",
            Resource::BlogPosts => "/blog-posts",
            Resource::Services => "/services",
        }
    }

    /// Resources the dashboard updates as "the one row" for a filter rather
    /// than through an explicit id-suffixed path.
    pub fn singular_lookup(&self) -> Option<SingularLookup> {
        match self {
            Resource::Users => Some(SingularLookup::ById),
            Resource::BusinessListings => Some(SingularLookup::ByParent {
                foreign_key: "website_id",
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_path().trim_start_matches('/'))
    }
}
