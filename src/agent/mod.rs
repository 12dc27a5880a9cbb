pub mod classifier;
pub mod summarizer;
pub mod synthesizer;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{CompletionService, GeminiClient};
use crate::search::{ArxivClient, PaperRecord, SearchError, SearchProvider, SortMode};

use classifier::Classifier;
use summarizer::Summarizer;
use synthesizer::{SynthesisError, SynthesisPipeline, SynthesisResult};

/// Wires the prompt-owning components to the concrete providers.
pub struct Assistant {
    pub summarizer: Summarizer,
    pub classifier: Classifier,
    pipeline: SynthesisPipeline,
    search: Arc<dyn SearchProvider>,
}

impl Assistant {
    pub fn new(config: &Config) -> Self {
        let llm: Arc<dyn CompletionService> = Arc::new(GeminiClient::new(
            &config.gemini_api_key,
            &config.gemini_base_url,
        ));
        let search: Arc<dyn SearchProvider> = Arc::new(ArxivClient::new(&config.arxiv_base_url));

        let summarizer = Summarizer::new(llm.clone(), config);
        let pipeline = SynthesisPipeline::new(search.clone(), summarizer.clone(), llm.clone(), config);

        Self {
            summarizer,
            classifier: Classifier::new(llm, config),
            pipeline,
            search,
        }
    }

    pub async fn search_papers(
        &self,
        query: &str,
        max_results: u32,
        sort: SortMode,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        self.search.search(query, max_results, sort).await
    }

    pub async fn synthesize_topic(
        &self,
        topic: &str,
        num_papers: u32,
        sort: SortMode,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.pipeline.run(topic, num_papers, sort, cancel).await
    }
}

/// Cuts `s` to at most `max_chars` characters without splitting a code point.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
