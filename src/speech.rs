use thiserror::Error;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
/// The endpoint rejects long inputs, so text is split into chunks below this.
const MAX_CHUNK_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("speech API error (status {0})")]
    Api(u16),
    #[error("no text to render")]
    EmptyText,
}

/// Renders text to MP3 via the Google Translate TTS endpoint.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
}

impl SpeechClient {
    pub fn new() -> Self {
        Self::with_base_url(TTS_ENDPOINT)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// One GET per chunk; MP3 segments concatenate into a playable stream.
    pub async fn render(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let mut audio = Vec::new();
        for chunk in &chunks {
            let url = format!(
                "{}?ie=UTF-8&client=tw-ob&tl=en&q={}",
                self.base_url,
                urlencoding::encode(chunk),
            );
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SpeechError::Api(status.as_u16()));
            }
            audio.extend_from_slice(&response.bytes().await?);
        }
        Ok(audio)
    }
}

impl Default for SpeechClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits at whitespace into chunks of at most `max_chars` characters. A
/// single word longer than the budget gets its own chunk.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if count > 0 && count + 1 + word_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        if count > 0 {
            current.push(' ');
            count += 1;
        }
        current.push_str(word);
        count += word_chars;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
