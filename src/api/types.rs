use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feed::{Page, Record};

/// One community post as returned by the collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub post_type: PostType,
    pub author_profile: Option<AuthorRef>,
    pub created_at: Option<String>,
    pub likes_count: Option<u32>,
    pub comments_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Fields the loader does not look at, kept so JSON output is lossless.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Record for Post {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

impl Post {
    /// Display name of the author, if the profile was embedded.
    pub fn author_name(&self) -> Option<String> {
        match self.author_profile.as_ref()? {
            AuthorRef::Embedded(profile) => Some(profile.display_name()),
            AuthorRef::Id(_) => None,
        }
    }
}

/// `authorProfile` is inlined when the request asked for `embed=authorProfile`,
/// otherwise it is a bare profile id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Embedded(AuthorProfile),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(rename = "avatarURL", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl AuthorProfile {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    Survey,
    Project,
    Inquiry,
    Fundraiser,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Survey => "SURVEY",
            PostType::Project => "PROJECT",
            PostType::Inquiry => "INQUIRY",
            PostType::Fundraiser => "FUNDRAISER",
            PostType::Unknown => "UNKNOWN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostType::Survey => "Survey",
            PostType::Project => "Project",
            PostType::Inquiry => "Inquiry",
            PostType::Fundraiser => "Fundraiser",
            PostType::Unknown => "Post",
        }
    }

    pub fn all() -> &'static [PostType] {
        &[
            PostType::Survey,
            PostType::Project,
            PostType::Inquiry,
            PostType::Fundraiser,
        ]
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostType::all()
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                format!("Invalid post type: {s}. Use survey, project, inquiry or fundraiser")
            })
    }
}

/// The active search/category/type constraints narrowing the collection.
///
/// Empty values are treated as absent and never sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    search: Option<String>,
    category: Option<String>,
    post_type: Option<String>,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    (!value.is_empty()).then_some(value)
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = non_empty(search);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_empty(category);
        self
    }

    pub fn with_type(mut self, post_type: PostType) -> Self {
        self.post_type = Some(post_type.as_str().to_string());
        self
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn post_type(&self) -> Option<&str> {
        self.post_type.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.category.is_none() && self.post_type.is_none()
    }

    /// Query parameters for the collection endpoint, absent keys omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("search", self.search()),
            ("categoryIds", self.category()),
            ("type", self.post_type()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("all posts");
        }
        let parts: Vec<String> = self
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Wire body of `GET /posts`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<Post>,
    /// Kept loose so a bad value never costs the page its posts.
    pub total_pages: Option<serde_json::Value>,
}

/// Page count from loosely typed metadata: a whole number (or a string
/// holding one) of at least 1. Anything else counts as a single page.
fn page_count(value: Option<&serde_json::Value>) -> usize {
    let count = match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n >= 1)
        .unwrap_or(1)
}

impl From<PostsResponse> for Page<Post> {
    fn from(resp: PostsResponse) -> Self {
        Page {
            total_pages: page_count(resp.total_pages.as_ref()),
            records: resp.posts,
        }
    }
}

/// Wire body of `GET /categories`.
#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedCategories>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedCategories {
    pub category_list: Option<Vec<Category>>,
}
