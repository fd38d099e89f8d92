//! Generative fallback backend (Ollama) and its answer parser

use crate::extractor::{LlmAnswer, LlmProvider, LlmRequest};
use async_trait::async_trait;
use namescreen_core::{Error, NameCategory, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Confidence assigned to a name stated by the model
pub const LLM_NAME_CONFIDENCE: f32 = 0.85;
/// Confidence assigned to an explicit "no name" answer
pub const LLM_NO_NAME_CONFIDENCE: f32 = 0.9;

const PROMPT_TEMPLATE: &str = "<start_of_turn>user
Проаналізуй український платіжний коментар і визнач, чи містить він ПІБ (прізвище, ім'я, по батькові) людини.
ІГНОРУЙ ці слова як НЕ імена: зарплата, премія, аванс, виплата, переказ, податки, поповнення, рахунок, оплата, послуги, товари.

Відповідь ТІЛЬКИ в одному з форматів:
1. \"ПОВНЕ_ПІБ | Прізвище Ім'я По-батькові\" - якщо є всі три частини
2. \"ПРІЗВИЩЕ_ІМЯ | Прізвище Ім'я\" - якщо є прізвище та ім'я
3. \"ТІЛЬКИ_ПРІЗВИЩЕ | Прізвище\" - якщо є тільки прізвище
4. \"ТІЛЬКИ_ІМЯ | Ім'я\" - якщо є тільки ім'я
5. \"НЕМАЄ_ПІБ\" - якщо ПІБ відсутнє
{hint}
Коментар: {comment}<end_of_turn>
<start_of_turn>model
";

/// Render the prompt for one request
pub fn build_prompt(request: &LlmRequest) -> String {
    let hint = request
        .hint
        .as_ref()
        .map(|entity| format!("Можливе ім'я (неточно): {}\n", entity.text))
        .unwrap_or_default();

    PROMPT_TEMPLATE
        .replace("{hint}", &hint)
        .replace("{comment}", &request.comment)
}

fn name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"[А-ЯІЇЄҐ][а-яіїєґ'’]+(?:\s+[А-ЯІЇЄҐ][а-яіїєґ'’]+)*")
            .expect("static name regex is valid")
    })
}

/// Parse a model completion into a structured answer
pub fn parse_llm_output(output: &str) -> Result<LlmAnswer> {
    let output = output.trim();

    if output.contains("НЕМАЄ_ПІБ") || output.to_lowercase().contains("немає") {
        return Ok(LlmAnswer {
            name: None,
            category: Some(NameCategory::None),
            confidence: LLM_NO_NAME_CONFIDENCE,
        });
    }

    if let Some((label, name)) = output.split_once('|') {
        let name = name.lines().next().unwrap_or_default().trim().trim_matches('"').trim();
        let category = if label.contains("ПОВНЕ_ПІБ") {
            Some(NameCategory::FullTriple)
        } else if label.contains("ПРІЗВИЩЕ_ІМЯ") {
            Some(NameCategory::GivenPlusSurname)
        } else if label.contains("ТІЛЬКИ_ПРІЗВИЩЕ") {
            Some(NameCategory::SurnameOnly)
        } else if label.contains("ТІЛЬКИ_ІМЯ") {
            Some(NameCategory::GivenNameOnly)
        } else {
            None
        };

        if !name.is_empty() {
            return Ok(LlmAnswer {
                name: Some(name.to_string()),
                category,
                confidence: LLM_NAME_CONFIDENCE,
            });
        }
    }

    match name_regex().find(output) {
        Some(m) => Ok(LlmAnswer {
            name: Some(m.as_str().to_string()),
            category: None,
            confidence: LLM_NAME_CONFIDENCE,
        }),
        None => Err(Error::provider(format!("unparseable model output: {}", output))),
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Settings for the Ollama backend
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mamaylm:latest".to_string(),
            temperature: 0.1,
            max_tokens: 150,
        }
    }
}

/// Ollama-backed generative provider
///
/// The call itself carries no timeout: the fallback gate owns the budget.
pub struct OllamaLlm {
    settings: OllamaSettings,
    client: reqwest::Client,
}

impl OllamaLlm {
    /// Create a new provider
    pub fn new(settings: OllamaSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn infer(&self, request: &LlmRequest) -> Result<LlmAnswer> {
        let url = format!("{}/api/generate", self.settings.base_url.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.settings.model,
            prompt: build_prompt(request),
            stream: false,
            options: GenerateOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(format!("ollama returned {}", status)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("ollama: invalid response: {}", e)))?;

        debug!(output = %generated.response.trim(), "LLM output");
        parse_llm_output(&generated.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
