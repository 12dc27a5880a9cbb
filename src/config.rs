use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Character budget applied to paper text before it enters a prompt.
    pub prompt_char_budget: usize,
    /// Token ceiling stated in the summarization template.
    pub summary_max_tokens: u32,
    pub arxiv_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY must be set")?,
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-pro-latest".into()),
            temperature: std::env::var("GEMINI_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".into())
                .parse()
                .context("GEMINI_TEMPERATURE must be a number")?,
            prompt_char_budget: std::env::var("PROMPT_CHAR_BUDGET")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .context("PROMPT_CHAR_BUDGET must be a number")?,
            summary_max_tokens: std::env::var("SUMMARY_MAX_TOKENS")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .context("SUMMARY_MAX_TOKENS must be a number")?,
            arxiv_base_url: std::env::var("ARXIV_BASE_URL")
                .unwrap_or_else(|_| "https://export.arxiv.org/api/query".into()),
        })
    }
}
