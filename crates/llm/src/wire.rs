//! JSON bodies exchanged with OpenAI-compatible `/chat/completions` endpoints.

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

use super::provider::{EmptyCompletionSnafu, ProviderResult, ResponseParseSnafu};

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatCompletionBody<'a> {
    pub fn single_user_turn(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pulls `choices[0].message.content` out of a completion payload.
pub(crate) fn extract_reply(payload: &str) -> ProviderResult<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(payload).context(ResponseParseSnafu {
        stage: "parse-completion-response",
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .context(EmptyCompletionSnafu {
            stage: "extract-completion-reply",
        })
}
