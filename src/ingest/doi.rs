use serde::Deserialize;
use thiserror::Error;

const CROSSREF_BASE: &str = "https://api.crossref.org";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("DOI lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("DOI {doi:?} not found or CrossRef error (status {status})")]
    NotFound { doi: String, status: u16 },
}

/// Bibliographic metadata for one DOI, as CrossRef reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    /// First full-text link served as `application/pdf`, when CrossRef has one.
    pub pdf_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default, rename = "author")]
    authors: Vec<WorksAuthor>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default, rename = "link")]
    links: Vec<WorksLink>,
}

#[derive(Debug, Deserialize)]
struct WorksAuthor {
    family: Option<String>,
    given: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksLink {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
}

impl CrossrefClient {
    pub fn new() -> Self {
        Self::with_base_url(CROSSREF_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn lookup(&self, doi: &str) -> Result<PaperMetadata, LookupError> {
        let doi = doi.trim();
        let url = format!("{}/works/{}", self.base_url, doi);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::NotFound {
                doi: doi.to_string(),
                status: status.as_u16(),
            });
        }

        let works: WorksResponse = response.json().await?;
        Ok(metadata_from_message(works.message))
    }
}

impl Default for CrossrefClient {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata_from_message(message: WorksMessage) -> PaperMetadata {
    let authors = message
        .authors
        .into_iter()
        .filter_map(|a| match (a.family, a.given) {
            (Some(family), Some(given)) => Some(format!("{}, {}", family, given)),
            (Some(family), None) => Some(family),
            (None, Some(given)) => Some(given),
            (None, None) => None,
        })
        .collect();

    let pdf_link = message
        .links
        .into_iter()
        .find(|l| l.content_type.as_deref() == Some("application/pdf"))
        .map(|l| l.url);

    PaperMetadata {
        title: message.title.into_iter().next().unwrap_or_default(),
        authors,
        abstract_text: message
            .abstract_text
            .unwrap_or_else(|| "Abstract not available".to_string()),
        pdf_link,
    }
}
