//! Test data builders and a scripted page source.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;

use crate::api::{ApiError, AuthorProfile, AuthorRef, Category, Post, PostType};
use crate::feed::{Page, PageRequest, PageSource};

/// Fixed "now" for deterministic age formatting: 2024-03-04 12:00:00 UTC,
/// three days after the `created_at` used by sample data.
pub const TEST_NOW: &str = "2024-03-04T12:00:00Z";

pub struct PostBuilder {
    id: String,
    title: String,
    description: String,
    post_type: PostType,
    author: Option<AuthorRef>,
    created_at: Option<String>,
    likes: Option<u32>,
    comments: Option<u32>,
    categories: Vec<Category>,
}

impl Default for PostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PostBuilder {
    pub fn new() -> Self {
        Self {
            id: "p0".to_string(),
            title: "Test Post".to_string(),
            description: String::new(),
            post_type: PostType::Project,
            author: None,
            created_at: Some("2024-03-01T12:00:00Z".to_string()),
            likes: None,
            comments: None,
            categories: vec![],
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn post_type(mut self, post_type: PostType) -> Self {
        self.post_type = post_type;
        self
    }

    pub fn author(mut self, first: &str, last: &str) -> Self {
        self.author = Some(AuthorRef::Embedded(AuthorProfile {
            id: format!("a-{first}"),
            username: first.to_lowercase(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            avatar_url: None,
        }));
        self
    }

    pub fn author_id(mut self, id: &str) -> Self {
        self.author = Some(AuthorRef::Id(id.to_string()));
        self
    }

    pub fn created_at(mut self, created_at: &str) -> Self {
        self.created_at = Some(created_at.to_string());
        self
    }

    pub fn likes(mut self, likes: u32) -> Self {
        self.likes = Some(likes);
        self
    }

    pub fn comments(mut self, comments: u32) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn category(mut self, id: &str, name: &str) -> Self {
        self.categories.push(Category {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            description: self.description,
            post_type: self.post_type,
            author_profile: self.author,
            created_at: self.created_at,
            likes_count: self.likes,
            comments_count: self.comments,
            categories: self.categories,
            extra: serde_json::Map::new(),
        }
    }
}

/// Posts with ids `p{n}` for each `n` in the range.
pub fn posts(ids: Range<usize>) -> Vec<Post> {
    ids.map(|n| {
        PostBuilder::new()
            .id(&format!("p{n}"))
            .title(&format!("Post {n}"))
            .build()
    })
    .collect()
}

pub fn sample_posts() -> Vec<Post> {
    vec![
        PostBuilder::new()
            .id("s1")
            .title("Which trees should we plant on Elm Street?")
            .description("Vote for the species the neighbourhood association should order this spring.")
            .post_type(PostType::Survey)
            .author("Ada", "Lovelace")
            .likes(12)
            .comments(3)
            .category("c1", "Environment")
            .build(),
        PostBuilder::new()
            .id("s2")
            .title("Repair cafe every first Saturday")
            .post_type(PostType::Project)
            .author_id("a-42")
            .created_at("2024-03-04T09:00:00Z")
            .build(),
        PostBuilder::new()
            .id("s3")
            .title("New playground equipment fund")
            .post_type(PostType::Fundraiser)
            .author("Grace", "Hopper")
            .likes(40)
            .build(),
    ]
}

/// Page source answering from a script, recording every request.
///
/// When gated, each page's fetch waits until that page is released with
/// [`release_page`](Self::release_page) or every page is released with
/// [`release`](Self::release).
#[derive(Default)]
pub struct ScriptedSource {
    responses: HashMap<usize, Result<Page<Post>, ApiError>>,
    requests: Mutex<Vec<PageRequest>>,
    gated: bool,
    gates: Mutex<Gates>,
}

#[derive(Default)]
struct Gates {
    pages: HashMap<usize, Arc<Semaphore>>,
    all_open: bool,
}

const OPEN_PERMITS: usize = 1024;

impl Gates {
    fn for_page(&mut self, page_index: usize) -> Arc<Semaphore> {
        let permits = if self.all_open { OPEN_PERMITS } else { 0 };
        self.pages
            .entry(page_index)
            .or_insert_with(|| Arc::new(Semaphore::new(permits)))
            .clone()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page_index: usize, records: Vec<Post>, total_pages: usize) -> Self {
        self.responses
            .insert(page_index, Ok(Page::new(records, total_pages)));
        self
    }

    pub fn failing(mut self, page_index: usize, error: ApiError) -> Self {
        self.responses.insert(page_index, Err(error));
        self
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// Lets every waiting and future fetch complete.
    pub fn release(&self) {
        let mut gates = self.gates.lock().unwrap();
        gates.all_open = true;
        for gate in gates.pages.values() {
            gate.add_permits(OPEN_PERMITS);
        }
    }

    /// Lets fetches of one page complete.
    pub fn release_page(&self, page_index: usize) {
        self.gates
            .lock()
            .unwrap()
            .for_page(page_index)
            .add_permits(OPEN_PERMITS);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PageSource<Post> for ScriptedSource {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Page<Post>, ApiError>> {
        let response = self
            .responses
            .get(&request.page_index)
            .cloned()
            .unwrap_or_else(|| Ok(Page::new(Vec::new(), 1)));
        let gate = self
            .gated
            .then(|| self.gates.lock().unwrap().for_page(request.page_index));
        self.requests.lock().unwrap().push(request);
        async move {
            if let Some(gate) = gate {
                let _permit = gate.acquire_owned().await;
            }
            response
        }
        .boxed()
    }
}
