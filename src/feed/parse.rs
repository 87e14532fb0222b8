use thiserror::Error;

use super::model::PostsResp;
use crate::html;
use crate::model::NewStory;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("feed payload is not the expected post list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a raw posts payload into stories, keeping payload order.
///
/// Duplicate IDs are passed through; the store decides what to do with them.
pub fn parse(raw: &str) -> Result<Vec<NewStory>, ParseError> {
    let resp: PostsResp = serde_json::from_str(raw)?;
    let stories = resp
        .into_posts()
        .into_iter()
        .enumerate()
        .map(|(i, post)| {
            let category = post.category_slug();
            let body = post
                .content
                .filter(|c| !c.trim().is_empty())
                .or(post.excerpt)
                .unwrap_or_default();
            NewStory {
                id: post.id,
                title: html::to_plain_text(&post.title),
                body,
                image_url: post.featured_image.filter(|u| !u.trim().is_empty()),
                category,
                position: i as i64,
            }
        })
        .collect();
    Ok(stories)
}
