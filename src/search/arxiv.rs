use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{PaperRecord, SearchError, SearchProvider, SortMode};

const USER_AGENT: &str = "paper-scout/0.1 (https://github.com/paper-scout)";

/// Client for the arXiv Atom query API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

// Atom feed shape, only the fields we consume. Unknown elements are ignored.
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default, rename = "entry")]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    #[serde(default)]
    summary: String,
    published: String,
    #[serde(default, rename = "author")]
    authors: Vec<EntryAuthor>,
    #[serde(default, rename = "link")]
    links: Vec<EntryLink>,
}

#[derive(Debug, Deserialize)]
struct EntryAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EntryLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@type")]
    content_type: Option<String>,
}

impl ArxivClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for ArxivClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        sort: SortMode,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = build_query_url(&self.base_url, query, max_results, sort);
        tracing::debug!(%url, "arxiv query");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

fn build_query_url(base_url: &str, query: &str, max_results: u32, sort: SortMode) -> String {
    let sort_by = match sort {
        SortMode::Relevance => "relevance",
        SortMode::Recency => "submittedDate",
    };
    format!(
        "{}?search_query=all:{}&start=0&max_results={}&sortBy={}&sortOrder=descending",
        base_url,
        urlencoding::encode(query),
        max_results,
        sort_by,
    )
}

fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>, SearchError> {
    let feed: Feed =
        quick_xml::de::from_str(xml).map_err(|e| SearchError::Parse(e.to_string()))?;

    feed.entries
        .into_iter()
        .map(|entry| {
            let published = parse_published(&entry.published)?;
            let pdf_url = entry
                .links
                .iter()
                .find(|l| {
                    l.title.as_deref() == Some("pdf")
                        || l.content_type.as_deref() == Some("application/pdf")
                })
                .map(|l| l.href.clone())
                .unwrap_or_else(|| abs_url_to_pdf(&entry.id));

            Ok(PaperRecord {
                title: normalize_whitespace(&entry.title),
                summary: normalize_whitespace(&entry.summary),
                pdf_url,
                published,
                authors: entry.authors.into_iter().map(|a| a.name).collect(),
            })
        })
        .collect()
}

fn parse_published(raw: &str) -> Result<NaiveDate, SearchError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|e| SearchError::Parse(format!("bad published date {:?}: {}", raw, e)))
}

/// arXiv entry ids are abs URLs like `http://arxiv.org/abs/2301.07041v1`.
fn abs_url_to_pdf(id_url: &str) -> String {
    let arxiv_id = id_url.rsplit("/abs/").next().unwrap_or(id_url);
    format!("https://arxiv.org/pdf/{}", arxiv_id)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
