pub mod arxiv;

pub use arxiv::ArxivClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search query is empty")]
    EmptyQuery,
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse search response: {0}")]
    Parse(String),
}

/// Provider-native orderings exposed to callers. `Recency` is descending
/// publication date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortMode {
    Relevance,
    Recency,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::Relevance => f.write_str("relevance"),
            SortMode::Recency => f.write_str("recency"),
        }
    }
}

/// One bibliographic search hit, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    /// The provider's abstract text.
    pub summary: String,
    pub pdf_url: String,
    pub published: NaiveDate,
    pub authors: Vec<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        sort: SortMode,
    ) -> Result<Vec<PaperRecord>, SearchError>;
}
