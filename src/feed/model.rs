use serde::Deserialize;
use serde_json::Value;

/// Post object as returned by `GET /sites/{site}/posts` with a field selection.
#[derive(Deserialize, Debug)]
pub struct Post {
    #[serde(rename = "ID")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    /// Keyed by category name. Empty maps come back as `[]` from some sites,
    /// so this stays untyped.
    #[serde(default)]
    pub categories: Option<Value>,
}

impl Post {
    /// Lexically first category slug, if any.
    pub fn category_slug(&self) -> Option<String> {
        let Some(Value::Object(map)) = &self.categories else {
            return None;
        };
        map.values()
            .filter_map(|c| c.get("slug").and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .min()
            .map(str::to_string)
    }
}

/// The endpoint wraps posts in `{"found": n, "posts": [...]}`; a bare array
/// is accepted as well.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PostsResp {
    Envelope { posts: Vec<Post> },
    Bare(Vec<Post>),
}

impl PostsResp {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            PostsResp::Envelope { posts } => posts,
            PostsResp::Bare(posts) => posts,
        }
    }
}
