use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{CompletionError, CompletionService};
use crate::search::{PaperRecord, SearchError, SearchProvider, SortMode};

use super::summarizer::Summarizer;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("paper search failed: {0}")]
    Search(#[from] SearchError),
    #[error("no papers found for topic {0:?}")]
    NoResults(String),
    #[error("all {attempted} summarization calls failed; nothing to synthesize")]
    NoUsableSummaries { attempted: usize },
    #[error("synthesis completion failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("synthesis cancelled")]
    Cancelled,
}

/// Bibliographic reference to a paper that contributed to a synthesis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperRef {
    pub title: String,
    pub url: String,
    pub authors: Vec<String>,
    pub published: NaiveDate,
}

impl From<&PaperRecord> for PaperRef {
    fn from(record: &PaperRecord) -> Self {
        Self {
            title: record.title.clone(),
            url: record.pdf_url.clone(),
            authors: record.authors.clone(),
            published: record.published,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    pub narrative: String,
    /// Order-preserving subsequence of the search results: exactly the papers
    /// whose summarization succeeded.
    pub papers_used: Vec<PaperRef>,
    /// Papers dropped because their summarization call failed.
    pub skipped: usize,
}

/// The cross-topic pipeline: one search, a per-paper summarization fan-out, one
/// reduction call over the surviving summaries.
pub struct SynthesisPipeline {
    search: Arc<dyn SearchProvider>,
    summarizer: Summarizer,
    llm: Arc<dyn CompletionService>,
    model: String,
    temperature: f32,
}

impl SynthesisPipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        summarizer: Summarizer,
        llm: Arc<dyn CompletionService>,
        config: &Config,
    ) -> Self {
        Self {
            search,
            summarizer,
            llm,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub async fn run(
        &self,
        topic: &str,
        num_papers: u32,
        sort: SortMode,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SynthesisError::EmptyTopic);
        }

        let search_start = Instant::now();
        let papers = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
            res = self.search.search(topic, num_papers, sort) => res?,
        };
        tracing::info!(
            topic,
            hits = papers.len(),
            elapsed_ms = search_start.elapsed().as_millis() as u64,
            "search complete"
        );

        if papers.is_empty() {
            return Err(SynthesisError::NoResults(topic.to_string()));
        }

        // Independent reads, so fan out; join_all keeps outcomes in input
        // order regardless of completion order. Dropping the join on cancel
        // aborts the in-flight requests.
        let summarize_start = Instant::now();
        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
            res = futures::future::join_all(
                papers.iter().map(|p| self.summarizer.summarize(&p.summary)),
            ) => res,
        };

        let mut summaries = Vec::new();
        let mut papers_used = Vec::new();
        let mut skipped = 0usize;
        for (paper, outcome) in papers.iter().zip(outcomes) {
            match outcome {
                Ok(summary) => {
                    summaries.push(summary);
                    papers_used.push(PaperRef::from(paper));
                }
                Err(error) => {
                    skipped += 1;
                    tracing::warn!(title = %paper.title, %error, "summarization failed, dropping paper");
                }
            }
        }
        tracing::info!(
            summarized = summaries.len(),
            skipped,
            elapsed_ms = summarize_start.elapsed().as_millis() as u64,
            "per-paper summarization complete"
        );

        if summaries.is_empty() {
            return Err(SynthesisError::NoUsableSummaries {
                attempted: papers.len(),
            });
        }

        let prompt = build_synthesis_prompt(topic, &summaries);
        let reduce_start = Instant::now();
        let completion = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
            res = self.llm.complete(&self.model, self.temperature, &prompt) => res?,
        };
        tracing::info!(
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            elapsed_ms = reduce_start.elapsed().as_millis() as u64,
            "synthesis reduction complete"
        );

        Ok(SynthesisResult {
            narrative: completion.text,
            papers_used,
            skipped,
        })
    }
}

fn build_synthesis_prompt(topic: &str, summaries: &[String]) -> String {
    let combined = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Paper {}: {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI research summarizer. You have been given summaries of multiple \
         research papers on the topic of '{topic}'.\n\n\
         Your job is to:\n\
         - Identify common themes\n\
         - Point out differences in approach or findings\n\
         - Provide a 2-3 paragraph synthesis that gives the reader a clear overview of \
         what the research landscape looks like for this topic.\n\n\
         === PAPER SUMMARIES ===\n\
         {combined}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::llm::Completion;

    fn test_config() -> Config {
        Config {
            gemini_api_key: "test-key".into(),
            gemini_base_url: "http://127.0.0.1:1".into(),
            model: "test-model".into(),
            temperature: 0.7,
            prompt_char_budget: 5000,
            summary_max_tokens: 1000,
            arxiv_base_url: "http://127.0.0.1:1".into(),
        }
    }

    fn record(n: usize) -> PaperRecord {
        PaperRecord {
            title: format!("Paper Title {n}"),
            summary: format!("A{n}"),
            pdf_url: format!("https://arxiv.org/pdf/000{n}.0000{n}"),
            published: NaiveDate::from_ymd_opt(2023, 1, n as u32).unwrap(),
            authors: vec![format!("Author {n}")],
        }
    }

    /// Search stub that records how it was invoked.
    struct StubSearch {
        records: Vec<PaperRecord>,
        calls: AtomicUsize,
        requested: Mutex<Option<(String, u32, SortMode)>>,
    }

    impl StubSearch {
        fn returning(records: Vec<PaperRecord>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
                requested: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(
            &self,
            query: &str,
            max_results: u32,
            sort: SortMode,
        ) -> Result<Vec<PaperRecord>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.requested.lock().unwrap() = Some((query.to_string(), max_results, sort));
            Ok(self.records.clone())
        }
    }

    /// Deterministic completion stub: a summarize prompt embedding abstract
    /// `An` yields `Sn` (or fails if `An` is marked), the reduction prompt
    /// yields `SYNTH`. Keyed on prompt content so concurrent call order does
    /// not matter.
    struct StubCompletion {
        summarize_calls: AtomicUsize,
        reduce_calls: AtomicUsize,
        fail_on: Vec<&'static str>,
        last_reduce_prompt: Mutex<Option<String>>,
    }

    impl StubCompletion {
        fn new(fail_on: Vec<&'static str>) -> Self {
            Self {
                summarize_calls: AtomicUsize::new(0),
                reduce_calls: AtomicUsize::new(0),
                fail_on,
                last_reduce_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionService for StubCompletion {
        async fn complete(
            &self,
            _model: &str,
            _temperature: f32,
            prompt: &str,
        ) -> Result<Completion, CompletionError> {
            if prompt.contains("=== PAPER SUMMARIES ===") {
                self.reduce_calls.fetch_add(1, Ordering::SeqCst);
                *self.last_reduce_prompt.lock().unwrap() = Some(prompt.to_string());
                return Ok(Completion {
                    text: "SYNTH".into(),
                    input_tokens: 0,
                    output_tokens: 0,
                });
            }

            self.summarize_calls.fetch_add(1, Ordering::SeqCst);
            for marker in &self.fail_on {
                if prompt.contains(marker) {
                    return Err(CompletionError::Api {
                        status: 500,
                        body: "stubbed failure".into(),
                    });
                }
            }
            for n in 1..=10 {
                if prompt.contains(&format!("A{n}\n")) {
                    return Ok(Completion {
                        text: format!("S{n}"),
                        input_tokens: 0,
                        output_tokens: 0,
                    });
                }
            }
            Ok(Completion {
                text: "S?".into(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn pipeline(
        search: Arc<StubSearch>,
        completion: Arc<StubCompletion>,
    ) -> SynthesisPipeline {
        let config = test_config();
        let llm: Arc<dyn CompletionService> = completion;
        SynthesisPipeline::new(
            search,
            Summarizer::new(llm.clone(), &config),
            llm,
            &config,
        )
    }

    fn count_occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[tokio::test]
    async fn three_papers_all_succeed() {
        let search = Arc::new(StubSearch::returning(vec![record(1), record(2), record(3)]));
        let completion = Arc::new(StubCompletion::new(vec![]));
        let pipeline = pipeline(search.clone(), completion.clone());

        let result = pipeline
            .run("Contrastive Learning", 3, SortMode::Relevance, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.narrative, "SYNTH");
        assert_eq!(result.skipped, 0);
        assert_eq!(
            result.papers_used,
            vec![
                PaperRef::from(&record(1)),
                PaperRef::from(&record(2)),
                PaperRef::from(&record(3)),
            ]
        );

        // Exactly one search call requesting n results, at most n summarize calls.
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        let (query, n, sort) = search.requested.lock().unwrap().clone().unwrap();
        assert_eq!(query, "Contrastive Learning");
        assert_eq!(n, 3);
        assert_eq!(sort, SortMode::Relevance);
        assert_eq!(completion.summarize_calls.load(Ordering::SeqCst), 3);
        assert_eq!(completion.reduce_calls.load(Ordering::SeqCst), 1);

        let prompt = completion.last_reduce_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("'Contrastive Learning'"));
        assert_eq!(count_occurrences(&prompt, "Paper 1: S1"), 1);
        assert_eq!(count_occurrences(&prompt, "Paper 2: S2"), 1);
        assert_eq!(count_occurrences(&prompt, "Paper 3: S3"), 1);
    }

    #[tokio::test]
    async fn one_failure_drops_that_paper_only() {
        let search = Arc::new(StubSearch::returning(vec![record(1), record(2), record(3)]));
        let completion = Arc::new(StubCompletion::new(vec!["A2"]));
        let pipeline = pipeline(search.clone(), completion.clone());

        let result = pipeline
            .run("Contrastive Learning", 3, SortMode::Relevance, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.narrative, "SYNTH");
        assert_eq!(result.skipped, 1);
        assert_eq!(
            result.papers_used,
            vec![PaperRef::from(&record(1)), PaperRef::from(&record(3))]
        );

        // Survivors are relabeled 1..k in request order; S2 never appears.
        let prompt = completion.last_reduce_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(count_occurrences(&prompt, "Paper 1: S1"), 1);
        assert_eq!(count_occurrences(&prompt, "Paper 2: S3"), 1);
        assert_eq!(count_occurrences(&prompt, "S2"), 0);
    }

    #[tokio::test]
    async fn all_failures_yield_empty_result_without_reduction() {
        let search = Arc::new(StubSearch::returning(vec![record(1), record(2)]));
        let completion = Arc::new(StubCompletion::new(vec!["A1", "A2"]));
        let pipeline = pipeline(search.clone(), completion.clone());

        let err = pipeline
            .run("Contrastive Learning", 2, SortMode::Relevance, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::NoUsableSummaries { attempted: 2 }));
        assert_eq!(completion.reduce_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_topic_is_rejected_before_search() {
        let search = Arc::new(StubSearch::returning(vec![record(1)]));
        let completion = Arc::new(StubCompletion::new(vec![]));
        let pipeline = pipeline(search.clone(), completion);

        let err = pipeline
            .run("   ", 3, SortMode::Relevance, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::EmptyTopic));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_search_hits_is_a_distinct_failure() {
        let search = Arc::new(StubSearch::returning(vec![]));
        let completion = Arc::new(StubCompletion::new(vec![]));
        let pipeline = pipeline(search, completion.clone());

        let err = pipeline
            .run("unheard-of topic", 3, SortMode::Recency, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::NoResults(_)));
        assert_eq!(completion.summarize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_without_provider_calls() {
        let search = Arc::new(StubSearch::returning(vec![record(1)]));
        let completion = Arc::new(StubCompletion::new(vec![]));
        let pipeline = pipeline(search.clone(), completion);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline
            .run("Contrastive Learning", 3, SortMode::Relevance, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::Cancelled));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summarization_is_idempotent_under_a_deterministic_service() {
        let llm: Arc<dyn CompletionService> = Arc::new(StubCompletion::new(vec![]));
        let summarizer = Summarizer::new(llm, &test_config());

        let paper = record(1);
        let first = summarizer.summarize(&paper.summary).await.unwrap();
        let second = summarizer.summarize(&paper.summary).await.unwrap();

        assert_eq!(first, "S1");
        assert_eq!(first, second);
    }

    #[test]
    fn synthesis_prompt_labels_summaries_by_position() {
        let summaries = vec!["S1".to_string(), "S3".to_string()];
        let prompt = build_synthesis_prompt("Graph Neural Networks", &summaries);

        assert!(prompt.contains("'Graph Neural Networks'"));
        assert_eq!(count_occurrences(&prompt, "Paper 1: S1"), 1);
        assert_eq!(count_occurrences(&prompt, "Paper 2: S3"), 1);
        assert!(prompt.contains("Identify common themes"));
        assert!(prompt.contains("2-3 paragraph synthesis"));
    }
}
