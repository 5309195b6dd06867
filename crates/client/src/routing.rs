use bizsite_core::model::Resource;
use bizsite_query::translate_query;
use serde::{Deserialize, Serialize};

/// Verbs the dashboard issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    /// The backend has no PATCH; partial updates go out as PUT.
    pub fn normalize(self) -> Self {
        match self {
            HttpMethod::Patch => HttpMethod::Put,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `"/page?id=eq.1"` into path and query.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    }
}

/// Maps logical dashboard paths onto backend URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRouter {
    base_url: String,
}

impl ApiRouter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/page/5` -> `/pages/5`. Paths outside the resource map are returned
    /// unchanged.
    pub fn map_path(path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        let (head, rest) = match trimmed.split_once('/') {
            Some((h, r)) => (h, Some(r)),
            None => (trimmed, None),
        };
        match Resource::parse(head) {
            Some(resource) => match rest {
                Some(rest) => format!("{}/{rest}", resource.api_path()),
                None => resource.api_path().to_string(),
            },
            None => path.to_string(),
        }
    }

    /// Fully-qualified backend URL for a logical path and optional query.
    /// The path may carry its own query string; an explicit `query` is
    /// appended after it. Already absolute URLs keep their host.
    pub fn to_api_url(&self, path: &str, query: Option<&str>) -> String {
        let (path, inline_query) = split_path(path);
        let raw_query = [inline_query, query]
            .into_iter()
            .flatten()
            .map(|q| q.trim_start_matches('?'))
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>()
            .join("&");
        let query = translate_query(&raw_query);

        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, Self::map_path(path))
        };
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}
