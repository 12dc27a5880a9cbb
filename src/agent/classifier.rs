use std::sync::Arc;

use crate::config::Config;
use crate::llm::{CompletionError, CompletionService};

use super::truncate_chars;

/// Asks the completion service which of the candidate topics fit a paper, then
/// keeps only labels that were actually offered. The service is a best-effort
/// oracle: anything it invents is discarded.
#[derive(Clone)]
pub struct Classifier {
    llm: Arc<dyn CompletionService>,
    model: String,
    temperature: f32,
    char_budget: usize,
}

impl Classifier {
    pub fn new(llm: Arc<dyn CompletionService>, config: &Config) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            temperature: config.temperature,
            char_budget: config.prompt_char_budget,
        }
    }

    pub async fn classify(
        &self,
        text: &str,
        topics: &[String],
    ) -> Result<Vec<String>, CompletionError> {
        let prompt = build_classify_prompt(text, topics, self.char_budget);
        let completion = self
            .llm
            .complete(&self.model, self.temperature, &prompt)
            .await?;
        Ok(filter_recognized(&completion.text, topics))
    }
}

fn build_classify_prompt(text: &str, topics: &[String], char_budget: usize) -> String {
    format!(
        "You are a research assistant.\n\
         Given the content of a research academic paper, classify it into one or more \
         of the following topics.\n\n\
         {}\n\n\
         Only return the relevant topic names that match the content of the paper.\n\n\
         Here is the paper content.\n\
         {}",
        topics.join(", "),
        truncate_chars(text, char_budget),
    )
}

/// Keeps candidate labels the reply mentions, in candidate order, case-insensitively.
fn filter_recognized(reply: &str, topics: &[String]) -> Vec<String> {
    let reply = reply.to_lowercase();
    topics
        .iter()
        .filter(|t| !t.trim().is_empty() && reply.contains(&t.to_lowercase()))
        .cloned()
        .collect()
}
