//! Oracle backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Candidate, Oracle, OracleError};

const INSTRUCTIONS: &str = "Gegeben sind der Titel einer namentlichen Abstimmung im Bundestag \
und eine Liste von Drucksachen mit Index und Titel. Bestimme die Drucksache, über die \
tatsächlich abgestimmt wird. Meist ist es die zuerst genannte, und sie hat in der Regel \
denselben Typ (Gesetzentwurf, Antrag, Beschlussempfehlung usw.). Antworte ausschließlich \
mit JSON der Form {\"index\": <Index>}.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Answer {
    index: usize,
}

#[derive(Serialize)]
struct OfferedCandidate<'a> {
    index: usize,
    title: &'a str,
}

/// Chat-completions client that answers the "best match" question.
pub struct LlmOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmOracle {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1` (no trailing slash needed).
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn prompt(target: &str, candidates: &[Candidate]) -> Result<String, OracleError> {
        let offered: Vec<OfferedCandidate> = candidates
            .iter()
            .map(|c| OfferedCandidate {
                index: c.index,
                title: &c.title,
            })
            .collect();
        Ok(format!(
            "Titel: {target}\nDrucksachen: {}",
            serde_json::to_string(&offered)?
        ))
    }
}

/// Parse a `{"index": n}` answer and check it names one of the candidates.
pub fn parse_answer(content: &str, candidates: &[Candidate]) -> Result<usize, OracleError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let answer: Answer = serde_json::from_str(trimmed)
        .map_err(|e| OracleError::MalformedAnswer(format!("{e}: {content}")))?;
    if candidates.iter().any(|c| c.index == answer.index) {
        Ok(answer.index)
    } else {
        Err(OracleError::IndexOutOfRange {
            index: answer.index,
            len: candidates.len(),
        })
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn match_best_candidate(
        &self,
        target: &str,
        candidates: &[Candidate],
    ) -> Result<usize, OracleError> {
        if candidates.is_empty() {
            return Err(OracleError::NoCandidates);
        }
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                Message {
                    role: "system".into(),
                    content: INSTRUCTIONS.into(),
                },
                Message {
                    role: "user".into(),
                    content: Self::prompt(target, candidates)?,
                },
            ],
        };

        info!(url = %url, model = %self.model, candidates = candidates.len(), "asking LLM for entrypoint");
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::MalformedAnswer("response has no choices".into()))?;
        debug!(answer = %content, "LLM answered");
        parse_answer(&content, candidates)
    }
}
