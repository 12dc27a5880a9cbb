pub mod doi;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to download PDF: {0}")]
    Download(#[from] reqwest::Error),
    #[error("download failed with status {0}")]
    DownloadStatus(u16),
    #[error("URL did not return a PDF (content-type {content_type:?})")]
    NotPdf { content_type: String },
    #[error("failed to extract text from PDF: {0}")]
    Extract(String),
}

/// Extracts plain text from in-memory PDF bytes. Malformed or non-PDF input
/// surfaces as `Extract`.
pub fn extract_text(bytes: &[u8]) -> Result<String, IngestError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Extract(e.to_string()))
}

/// Downloads a direct PDF link. Anything that is not served as
/// `application/pdf` is rejected.
pub async fn download_pdf(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, IngestError> {
    let response = client
        .get(url)
        .header("User-Agent", "Mozilla/5.0")
        .header("Accept", "application/pdf")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::DownloadStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("application/pdf") {
        return Err(IngestError::NotPdf { content_type });
    }

    Ok(response.bytes().await?.to_vec())
}

pub async fn extract_text_from_url(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, IngestError> {
    let bytes = download_pdf(client, url).await?;
    extract_text(&bytes)
}
