use std::sync::Arc;

use crate::config::Config;
use crate::llm::{CompletionError, CompletionService};

use super::truncate_chars;

/// Produces a short summary of one paper's text via a single completion call.
#[derive(Clone)]
pub struct Summarizer {
    llm: Arc<dyn CompletionService>,
    model: String,
    temperature: f32,
    char_budget: usize,
    max_tokens: u32,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn CompletionService>, config: &Config) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            temperature: config.temperature,
            char_budget: config.prompt_char_budget,
            max_tokens: config.summary_max_tokens,
        }
    }

    pub async fn summarize(&self, text: &str) -> Result<String, CompletionError> {
        let prompt = build_summarize_prompt(text, self.char_budget, self.max_tokens);
        let completion = self
            .llm
            .complete(&self.model, self.temperature, &prompt)
            .await?;
        Ok(completion.text)
    }
}

fn build_summarize_prompt(text: &str, char_budget: usize, max_tokens: u32) -> String {
    format!(
        "You are an expert AI researcher. Summarize the following academic paper text \
         in a clear, concise way:\n\
         ===\n\
         {}\n\
         ===\n\
         Provide a crisp summary under {} tokens.",
        truncate_chars(text, char_budget),
        max_tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_truncated_text_and_token_ceiling() {
        let text = "x".repeat(6000);
        let prompt = build_summarize_prompt(&text, 5000, 1000);

        assert!(prompt.contains(&"x".repeat(5000)));
        assert!(!prompt.contains(&"x".repeat(5001)));
        assert!(prompt.contains("under 1000 tokens"));
        assert!(prompt.starts_with("You are an expert AI researcher."));
    }

    #[test]
    fn short_text_passes_through_unchanged() {
        let prompt = build_summarize_prompt("a tiny abstract", 5000, 1000);
        assert!(prompt.contains("a tiny abstract"));
    }
}
