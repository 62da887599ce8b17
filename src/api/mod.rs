mod client;
mod error;
mod types;

pub use client::{ClientConfig, DEFAULT_EMBED, PostsClient};
pub use error::ApiError;
pub use types::{FilterSet, Post, PostType};
#[cfg(test)]
pub use types::{AuthorProfile, AuthorRef, Category};
