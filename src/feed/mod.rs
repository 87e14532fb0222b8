use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod model;
pub mod parse;

pub use parse::{parse, ParseError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed URL: {0}")]
    Url(String),
    #[error("failed to reach feed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned {0}")]
    Status(StatusCode),
}

/// Source of the raw posts payload.
///
/// `Ok(None)` means the server answered with an empty body, which is not a
/// transport failure.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_feed(&self) -> Result<Option<String>, FeedError>;
}

/// Fixed query sent to the posts endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub site_id: String,
    pub category: String,
    pub number: u32,
    pub fields: String,
}

impl FeedQuery {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            site_id: cfg.feed.site_id.clone(),
            category: cfg.feed.category.clone(),
            number: cfg.feed.number,
            fields: cfg.feed.fields_csv(),
        }
    }
}

/// `<base>/<site_id>/posts?fields=..&category=..&number=..`
pub fn build_url(base: &Url, query: &FeedQuery) -> Result<Url, FeedError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FeedError::Url(base.to_string()))?
        .pop_if_empty()
        .push(&query.site_id)
        .push("posts");
    url.query_pairs_mut()
        .clear()
        .append_pair("fields", &query.fields)
        .append_pair("category", &query.category)
        .append_pair("number", &query.number.to_string());
    Ok(url)
}

/// WordPress.com REST client for the story feed.
#[derive(Clone)]
pub struct WordPressClient {
    http: Client,
    url: Url,
}

impl fmt::Debug for WordPressClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPressClient")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl WordPressClient {
    pub fn new(base_url: &str, query: &FeedQuery) -> Result<Self, FeedError> {
        let base = Url::parse(base_url).map_err(|e| FeedError::Url(format!("{base_url}: {e}")))?;
        let url = build_url(&base, query)?;
        let http = Client::builder()
            .user_agent(concat!("storybox/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;
        Ok(Self { http, url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, FeedError> {
        Self::new(&cfg.feed.base_url, &FeedQuery::from_config(cfg))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl FeedClient for WordPressClient {
    async fn fetch_feed(&self) -> Result<Option<String>, FeedError> {
        info!(url = %self.url, "fetching story feed");
        // The response owns the connection; every return below drops it.
        let res = self.http.get(self.url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            warn!(%status, "feed request failed");
            return Err(FeedError::Status(status));
        }
        let body = res.text().await?;
        // Whitespace is still a body; the parser rejects it.
        if body.is_empty() {
            warn!("feed returned an empty body");
            return Ok(None);
        }
        debug!(bytes = body.len(), "feed body received");
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> FeedQuery {
        FeedQuery {
            site_id: "113100833".into(),
            category: "historias-infantis-abobrinha".into(),
            number: 100,
            fields: "ID,title,content".into(),
        }
    }

    #[test]
    fn build_url_appends_segments_and_params() {
        let base = Url::parse("https://public-api.wordpress.com/rest/v1.1/sites/").unwrap();
        let url = build_url(&base, &query()).unwrap();
        assert_eq!(url.path(), "/rest/v1.1/sites/113100833/posts");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("fields".into(), "ID,title,content".into()),
                ("category".into(), "historias-infantis-abobrinha".into()),
                ("number".into(), "100".into()),
            ]
        );
    }

    #[test]
    fn build_url_without_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:8080/sites").unwrap();
        let url = build_url(&base, &query()).unwrap();
        assert_eq!(url.path(), "/sites/113100833/posts");
    }

    #[test]
    fn from_config_uses_feed_section() {
        let cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        let client = WordPressClient::from_config(&cfg).unwrap();
        assert!(client
            .url()
            .as_str()
            .starts_with("https://public-api.wordpress.com/rest/v1.1/sites/113100833/posts?"));
        assert!(client.url().as_str().contains("number=100"));
    }

    #[test]
    fn rejects_cannot_be_a_base_url() {
        assert!(matches!(
            WordPressClient::new("mailto:someone@example.com", &query()),
            Err(FeedError::Url(_))
        ));
    }
}
