//! Interpretation service.
//!
//! A reading is condensed into an `InterpretationRequest` and handed to an
//! `Interpreter`, which returns free-form commentary. The bundled
//! implementation talks to an OpenAI-compatible chat completions endpoint.
//! Failures never affect the reading itself; callers show `APOLOGY_MESSAGE`.

use crate::config::InterpretationConfig;
use crate::types::{HexagramRecord, Reading};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The parts of a hexagram an interpreter needs
#[derive(Clone, Debug, PartialEq)]
pub struct HexagramSummary {
    pub number: u8,
    pub name_en: String,
    pub name_zh: String,
    pub judgment_en: String,
    pub judgment_zh: String,
}

impl From<&HexagramRecord> for HexagramSummary {
    fn from(record: &HexagramRecord) -> Self {
        HexagramSummary {
            number: record.number,
            name_en: record.name_en.clone(),
            name_zh: record.name_zh.clone(),
            judgment_en: record.judgment_en.clone(),
            judgment_zh: record.judgment_zh.clone(),
        }
    }
}

/// A changing line, numbered 1-6 from the bottom
#[derive(Clone, Debug, PartialEq)]
pub struct ChangingLine {
    pub line_number: usize,
    pub text_en: String,
    pub text_zh: String,
}

/// Everything sent to the interpretation service for one reading
#[derive(Clone, Debug, PartialEq)]
pub struct InterpretationRequest {
    pub question: String,
    pub primary: HexagramSummary,
    pub changing_lines: Vec<ChangingLine>,
    pub secondary: Option<HexagramSummary>,
}

impl From<&Reading> for InterpretationRequest {
    fn from(reading: &Reading) -> Self {
        InterpretationRequest {
            question: reading.question.clone(),
            primary: HexagramSummary::from(&reading.primary),
            changing_lines: reading
                .changing_line_texts()
                .into_iter()
                .map(|(position, text)| ChangingLine {
                    line_number: position + 1,
                    text_en: text.line_en.clone(),
                    text_zh: text.line_zh.clone(),
                })
                .collect(),
            secondary: reading.secondary.as_ref().map(HexagramSummary::from),
        }
    }
}

/// Something that can comment on a reading
pub trait Interpreter {
    fn interpret(&self, request: &InterpretationRequest) -> Result<String>;
}

/// Guidance sent as the system message
pub fn system_prompt() -> &'static str {
    "You are a thoughtful and compassionate interpreter of the I Ching, the Book of Changes.\n\
     \n\
     Keep every interpretation safe and supportive:\n\
     - Do not predict specific events, outcomes or timelines.\n\
     - Do not give financial, legal or medical advice; speak to reflection and personal growth.\n\
     - Present the reading as a tool for insight, never as fate. Emphasise the person's own \
     agency and choices.\n\
     - Never produce hateful, violent, sexual or manipulative content, and never encourage \
     self-harm or dangerous acts.\n\
     - Frame difficult hexagrams as opportunities to learn rather than as threats.\n\
     - Stay grounded in the hexagrams, lines and judgments provided; do not invent sources."
}

/// The user message describing the reading
pub fn user_prompt(request: &InterpretationRequest) -> String {
    let primary = &request.primary;
    let mut prompt = format!(
        "Someone has come to the oracle with this question: \"{}\"\n\n\
         Their reading:\n\
         - Primary hexagram: {}. {} ({}), the present state of things.\n\
         - Judgment: {}\n\n",
        request.question, primary.number, primary.name_en, primary.name_zh, primary.judgment_en
    );

    if request.changing_lines.is_empty() {
        prompt.push_str("No lines are changing.\n");
    } else {
        prompt.push_str("These lines are changing:\n");
        for line in &request.changing_lines {
            prompt.push_str(&format!("- Line {}: {}\n", line.line_number, line.text_en));
        }
    }

    if let Some(secondary) = &request.secondary {
        prompt.push_str(&format!(
            "\nThe reading evolves into:\n\
             - Evolving hexagram: {}. {} ({}), the direction of change.\n\
             - Judgment: {}\n",
            secondary.number, secondary.name_en, secondary.name_zh, secondary.judgment_en
        ));
    }

    prompt.push_str(
        "\nWrite a contemplative interpretation in four sections, using these bold titles exactly:\n\
         **The Present Situation:** the primary hexagram and its judgment in light of the question.\n\
         **The Dynamics of Change:** what the changing lines signify, or that the situation is stable.\n\
         **The Emerging Direction:** the evolving hexagram; omit this section if there is none.\n\
         **Guidance for Reflection:** practical, supportive advice and questions to sit with.\n\
         Keep the tone calm, insightful and encouraging.",
    );

    prompt
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Interpreter backed by an OpenAI-compatible chat completions API
pub struct OpenAiInterpreter {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiInterpreter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Interpretation(format!("building HTTP client: {}", e)))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build an interpreter from configuration
    ///
    /// Returns `None` when interpretation is disabled or no API key is set
    /// in the configured environment variable.
    pub fn from_config(config: &InterpretationConfig) -> Result<Option<Self>> {
        if !config.enabled {
            tracing::info!("Interpretation disabled in config");
            return Ok(None);
        }

        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::info!(
                    "No API key in ${}, interpretation unavailable",
                    config.api_key_env
                );
                return Ok(None);
            }
        };

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Interpreter for OpenAiInterpreter {
    fn interpret(&self, request: &InterpretationRequest) -> Result<String> {
        let user = user_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        tracing::info!(
            "Requesting interpretation of hexagram {} from {}",
            request.primary.number,
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Interpretation(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::Interpretation(format!("service returned error: {}", e)))?
            .json::<ChatResponse>()
            .map_err(|e| Error::Interpretation(format!("unreadable response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Interpretation("response contained no text".into()))
    }
}
