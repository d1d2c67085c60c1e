use serde::{Deserialize, Serialize};
use url::Url;

/// A normalized feed entry as handed over by the feed collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            summary: String::new(),
            content: None,
            published: String::new(),
            updated: String::new(),
            id: String::new(),
            image_url: None,
            source_title: None,
            source_url: None,
        }
    }

    /// Published date, or the updated date when the feed left it blank
    pub fn published_or_updated(&self) -> &str {
        if self.published.is_empty() {
            &self.updated
        } else {
            &self.published
        }
    }

    fn is_trending(&self) -> bool {
        let src = self.source_url.as_deref().unwrap_or("").to_lowercase();
        let title = self.source_title.as_deref().unwrap_or("").to_lowercase();
        src.contains("githubtrendingrss") || title.contains("github trending")
    }
}

/// Articles believed to report the same story. The first member is the anchor.
pub type ArticleGroup = Vec<ArticleRecord>;

/// Summarized story, one per surviving group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub title: String,
    pub url: String,
    pub urls: Vec<String>,
    pub summary: String,
    pub image_url: Option<String>,
    pub score: i64,
    pub source_title: String,
    pub source_url: String,
    pub published: String,
}

impl SummaryResult {
    /// Build a result from a group's anchor plus the parsed model output.
    ///
    /// Returns `None` for an empty group.
    pub fn from_group(group: &[ArticleRecord], summary: String, score: i64) -> Option<Self> {
        let anchor = group.first()?;
        let urls: Vec<String> = group.iter().map(|a| a.link.clone()).collect();

        Some(Self {
            title: anchor.title.clone(),
            url: anchor.link.clone(),
            urls,
            summary,
            image_url: anchor.image_url.clone(),
            score,
            source_title: anchor
                .source_title
                .clone()
                .unwrap_or_else(|| "Unknown Source".to_string()),
            source_url: anchor
                .source_url
                .clone()
                .unwrap_or_else(|| anchor.link.clone()),
            published: anchor.published_or_updated().to_string(),
        })
    }

    /// Stand-in hero used when no general story survived
    pub fn placeholder_hero() -> Self {
        Self {
            title: "No news today".to_string(),
            url: "#".to_string(),
            urls: Vec::new(),
            summary: String::new(),
            image_url: None,
            score: 0,
            source_title: "System".to_string(),
            source_url: "#".to_string(),
            published: String::new(),
        }
    }

    /// Display name of the publishing source
    pub fn source_name(&self) -> String {
        if !self.source_title.is_empty() && self.source_title != "Unknown Source" {
            return self.source_title.clone();
        }

        Url::parse(&self.url)
            .ok()
            .filter(|u| u.scheme() == "http" || u.scheme() == "https")
            .and_then(|u| u.host_str().map(|h| h.replace("www.", "")))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Split the flat article list into the general and trending streams,
/// preserving input order within each.
pub fn split_streams(articles: Vec<ArticleRecord>) -> (Vec<ArticleRecord>, Vec<ArticleRecord>) {
    articles.into_iter().partition(|a| !a.is_trending())
}
