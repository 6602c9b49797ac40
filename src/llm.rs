//! LLM-backed question generation and freeform grading, with deterministic
//! offline fallbacks so the tool works without an API key.

use crate::config::LlmConfig;
use crate::models::{Question, QuestionSource, QuestionType, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Overlap ratio of significant words at or above which a freeform answer
/// is graded correct by the offline heuristic.
const OVERLAP_THRESHOLD: f64 = 0.4;

/// Words longer than this count as significant for the overlap heuristic.
const SIGNIFICANT_WORD_LEN: usize = 3;

/// LLM boundary errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unusable LLM response: {0}")]
    BadResponse(String),
}

/// Grading verdict for a freeform answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub explanation: String,
}

/// A newly generated question awaiting user review.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
    pub reference_answer: Option<String>,
}

impl GeneratedQuestion {
    /// Convert an accepted spec into a persistent question, re-running full
    /// validation.
    pub fn into_question(self, topic: &str) -> Result<Question, ValidationError> {
        match self.question_type {
            QuestionType::Mcq => Question::multiple_choice(
                topic,
                self.text,
                QuestionSource::Llm,
                self.options,
                self.correct_index.ok_or(ValidationError::NoCorrectIndex)?,
            ),
            QuestionType::Freeform => Question::freeform(
                topic,
                self.text,
                QuestionSource::Llm,
                self.reference_answer.unwrap_or_default(),
            ),
        }
    }
}

const GENERATE_INSTRUCTIONS: &str = "You generate beginner-friendly study questions. \
Return ONLY JSON, no extra text: a list of objects, each with question_type \
('mcq' or 'freeform'), text (string), options (list of strings, mcq only), \
correct_option_index (integer, mcq only), reference_answer (string, freeform only).";

const GRADE_INSTRUCTIONS: &str = "You are a strict but fair grader for short-answer \
questions. Consider semantic meaning, not exact wording. Return ONLY JSON with keys \
'correct' (true/false) and 'explanation' (short string).";

/// Client for an OpenAI-compatible chat-completions backend. Without an API
/// key every operation uses a built-in offline fallback.
pub struct LlmClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl LlmClient {
    /// Build a client from config. The API key is resolved by the caller
    /// and passed in; this module never reads the environment.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        if api_key.is_none() {
            warn!("no API key configured, using offline generation and grading");
        }
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            http,
            runtime,
        })
    }

    /// Whether a real backend is configured.
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate study questions for a topic.
    pub fn generate_questions(
        &self,
        topic: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, LlmError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LlmError::InvalidArgument("topic must not be empty".into()));
        }
        if count == 0 {
            return Err(LlmError::InvalidArgument(
                "number of questions must be positive".into(),
            ));
        }

        if !self.is_available() {
            return Ok(fallback_generate(topic, count));
        }

        let prompt = format!(
            "Create {count} simple questions to help a beginner learn about: {topic}. \
             Include at least one multiple-choice question and one freeform question."
        );
        let content = self.chat(GENERATE_INSTRUCTIONS, &prompt)?;
        parse_generated(&content)
    }

    /// Grade a freeform answer against its reference answer.
    pub fn grade_freeform(
        &self,
        question_text: &str,
        reference_answer: &str,
        user_answer: &str,
    ) -> Result<Verdict, LlmError> {
        let question_text = question_text.trim();
        let reference_answer = reference_answer.trim();
        let user_answer = user_answer.trim();
        if question_text.is_empty() || reference_answer.is_empty() {
            return Err(LlmError::InvalidArgument(
                "question text and reference answer must not be empty".into(),
            ));
        }

        if !self.is_available() {
            return Ok(fallback_grade(reference_answer, user_answer));
        }

        let prompt = format!(
            "Question: {question_text}\nReference answer: {reference_answer}\nStudent answer: {user_answer}\n"
        );
        let content = self.chat(GRADE_INSTRUCTIONS, &prompt)?;
        parse_verdict(&content)
    }

    fn chat(&self, instructions: &str, prompt: &str) -> Result<String, LlmError> {
        let Some(api_key) = &self.api_key else {
            return Err(LlmError::BadResponse("no backend configured".into()));
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.3,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!(%url, model = %self.model, "sending chat completion request");

        let response: ChatResponse = self.runtime.block_on(async {
            self.http
                .post(&url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
        })?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::BadResponse("response contained no choices".into()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Built-in generator: one generic MCQ plus freeform stubs, all guaranteed
/// to convert into valid questions.
fn fallback_generate(topic: &str, count: usize) -> Vec<GeneratedQuestion> {
    let mut specs = Vec::with_capacity(count);
    specs.push(GeneratedQuestion {
        question_type: QuestionType::Mcq,
        text: format!("Which statement best describes {topic}?"),
        options: vec![
            format!("{topic} is a concept worth studying on its own terms."),
            format!("{topic} is a type of database engine."),
            format!("{topic} is a graphical design tool."),
            format!("{topic} is a brand of computer hardware."),
        ],
        correct_index: Some(0),
        reference_answer: None,
    });
    for idx in 1..count {
        specs.push(GeneratedQuestion {
            question_type: QuestionType::Freeform,
            text: format!("In your own words, explain what '{topic}' means (variation {idx})."),
            options: Vec::new(),
            correct_index: None,
            reference_answer: Some(format!("A clear, concise explanation of {topic}.")),
        });
    }
    specs
}

fn significant_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > SIGNIFICANT_WORD_LEN)
        .map(str::to_string)
        .collect()
}

/// Keyword-overlap grading heuristic.
fn fallback_grade(reference_answer: &str, user_answer: &str) -> Verdict {
    let reference_words = significant_words(reference_answer);
    let user_words = significant_words(user_answer);

    if reference_words.is_empty() {
        return Verdict {
            correct: false,
            explanation: "No reference words to compare against.".into(),
        };
    }

    let mut shared: Vec<&String> = reference_words.intersection(&user_words).collect();
    shared.sort();
    let ratio = shared.len() as f64 / reference_words.len() as f64;

    let matched = if shared.is_empty() {
        "no significant matches".to_string()
    } else {
        shared
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    Verdict {
        correct: ratio >= OVERLAP_THRESHOLD,
        explanation: format!("Overlap ratio {ratio:.2} based on key words: {matched}."),
    }
}

/// Lenient parse of a generated-question list: unusable items are skipped,
/// zero usable items is an error.
fn parse_generated(content: &str) -> Result<Vec<GeneratedQuestion>, LlmError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|err| LlmError::BadResponse(format!("invalid JSON: {err}")))?;
    let serde_json::Value::Array(items) = value else {
        return Err(LlmError::BadResponse("expected a JSON list of questions".into()));
    };

    let mut specs = Vec::new();
    for item in items {
        let Some(object) = item.as_object() else {
            continue;
        };
        let text = object
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }

        let is_mcq = object
            .get("question_type")
            .and_then(|v| v.as_str())
            .map(|s| s.eq_ignore_ascii_case("mcq"))
            .unwrap_or(false);

        let spec = if is_mcq {
            let options: Vec<String> = object
                .get("options")
                .and_then(|v| v.as_array())
                .map(|opts| {
                    opts.iter()
                        .filter_map(|o| o.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let correct_index = object
                .get("correct_option_index")
                .and_then(|v| v.as_u64())
                .map(|i| i as usize)
                .unwrap_or(0);
            GeneratedQuestion {
                question_type: QuestionType::Mcq,
                text: text.to_string(),
                options,
                correct_index: Some(correct_index),
                reference_answer: None,
            }
        } else {
            GeneratedQuestion {
                question_type: QuestionType::Freeform,
                text: text.to_string(),
                options: Vec::new(),
                correct_index: None,
                reference_answer: object
                    .get("reference_answer")
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_string()),
            }
        };
        specs.push(spec);
    }

    if specs.is_empty() {
        return Err(LlmError::BadResponse(
            "no usable questions in response".into(),
        ));
    }
    Ok(specs)
}

fn parse_verdict(content: &str) -> Result<Verdict, LlmError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|err| LlmError::BadResponse(format!("invalid JSON: {err}")))?;
    let Some(object) = value.as_object() else {
        return Err(LlmError::BadResponse("expected a JSON object".into()));
    };

    let correct = object.get("correct").and_then(|v| v.as_bool()).unwrap_or(false);
    let explanation = object
        .get("explanation")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No explanation provided.")
        .to_string();
    Ok(Verdict { correct, explanation })
}
