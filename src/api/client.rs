use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{CategoriesResponse, Category, Post, PostsResponse};
use crate::feed::{Page, PageRequest, PageSource};

pub const DEFAULT_EMBED: &str = "authorProfile";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Related data to inline into each post; empty disables `embed`.
    pub embed: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl ClientConfig {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            embed: DEFAULT_EMBED.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// REST client for the community backend.
#[derive(Clone)]
pub struct PostsClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl PostsClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("base URL '{}': {e}", config.base_url)))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let request = self.http.get(url);
        match self.config.token.as_deref() {
            Some(token) => {
                let token = token.strip_prefix("Bearer ").unwrap_or(token);
                request.bearer_auth(token)
            }
            None => request,
        }
    }

    /// Fetches one page of posts. Single attempt, no retry.
    pub async fn fetch_posts(&self, request: &PageRequest) -> Result<Page<Post>, ApiError> {
        let page = request.page_index.to_string();
        let size = request.page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![("page", page.as_str()), ("size", size.as_str())];
        if !self.config.embed.is_empty() {
            query.push(("embed", &self.config.embed));
        }
        query.extend(request.filters.query_pairs());

        debug!(page = request.page_index, size = request.page_size, filters = %request.filters, "GET /posts");
        let response = self.get("/posts").query(&query).send().await?;
        let body: PostsResponse = read_json(response).await?;
        Ok(body.into())
    }

    /// Fetches one page, retrying transient failures with exponential backoff.
    pub async fn fetch_posts_with_retry(
        &self,
        request: &PageRequest,
    ) -> Result<Page<Post>, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            match self.fetch_posts(request).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self
                        .config
                        .retry_backoff
                        .saturating_mul(1 << attempt.min(16));
                    warn!(
                        page = request.page_index,
                        attempt = attempt + 1,
                        ?delay,
                        error = %e,
                        "page fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self.get("/categories").send().await?;
        let body: Option<CategoriesResponse> = read_optional_json(response).await?;
        body.and_then(|b| b.embedded)
            .and_then(|e| e.category_list)
            .ok_or_else(|| ApiError::Parse("invalid response structure".into()))
    }
}

impl PageSource<Post> for PostsClient {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Page<Post>, ApiError>> {
        let client = self.clone();
        async move { client.fetch_posts_with_retry(&request).await }.boxed()
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("API request failed")
        .to_string();
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ => fallback,
    };
    ApiError::HttpStatus(status.as_u16(), message)
}

/// Decodes a JSON body; `None` for 204 or an empty body.
async fn read_optional_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

async fn read_json<T: DeserializeOwned + Default>(response: Response) -> Result<T, ApiError> {
    Ok(read_optional_json(response).await?.unwrap_or_default())
}
