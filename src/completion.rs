//! Building OpenAI-shaped completions from raw CLI output.

use chrono::Utc;
use uuid::Uuid;

use crate::openai::types::{
    AssistantMessage, CHAT_COMPLETION_OBJECT, ChatCompletionChoice, ChatCompletionResponse,
    FINISH_REASON_STOP, Usage,
};

/// Empirical tokens-per-word ratio for English text.
const TOKENS_PER_WORD: f64 = 1.3;

/// Rough token count: whitespace-separated words times [`TOKENS_PER_WORD`],
/// truncated, never below 1.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    let estimate = (words as f64 * TOKENS_PER_WORD) as u32;
    estimate.max(1)
}

/// Fresh completion id, `chatcmpl-` plus eight hex digits.
pub fn completion_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &uuid[..8])
}

/// Wrap CLI output into a completion response.
///
/// `model` is the client's model name, echoed back unchanged; `prompt` is the
/// flattened prompt actually sent, used only for the usage estimate.
pub fn assemble(model: &str, prompt: &str, content: String) -> ChatCompletionResponse {
    let usage = Usage::new(estimate_tokens(prompt), estimate_tokens(&content));

    ChatCompletionResponse {
        id: completion_id(),
        object: CHAT_COMPLETION_OBJECT.to_string(),
        created: Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: FINISH_REASON_STOP.to_string(),
        }],
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_floor_is_one() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("   "), 1);
        assert_eq!(estimate_tokens("4"), 1);
    }

    #[test]
    fn test_estimate_scales_with_words() {
        assert_eq!(estimate_tokens("one two"), 2);
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
    }

    #[test]
    fn test_estimate_is_monotonic() {
        let mut text = String::new();
        let mut previous = estimate_tokens(&text);
        for i in 0..200 {
            text.push_str(&format!("w{i} "));
            let current = estimate_tokens(&text);
            assert!(current >= previous, "{current} < {previous} at {i}");
            assert!(current >= 1);
            previous = current;
        }
    }

    #[test]
    fn test_completion_id_shape() {
        let id = completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_eq!(id.len(), "chatcmpl-".len() + 8);
        assert_ne!(id, completion_id());
    }

    #[test]
    fn test_assemble() {
        let response = assemble("gpt-4o", "Human: 2+2?\n\nAssistant:", "4".to_string());
        assert_eq!(response.model, "gpt-4o");
        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.content(), Some("4"));
        assert_eq!(response.choices[0].finish_reason, "stop");
        assert_eq!(response.choices[0].message.role, "assistant");
        assert_eq!(
            response.usage.total_tokens,
            response.usage.prompt_tokens + response.usage.completion_tokens
        );
    }
}
