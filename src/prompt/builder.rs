use std::borrow::Cow;

use crate::openai::types::OpenAIMessage;

/// Trailing cue that tells the CLI to produce the assistant turn.
pub const ASSISTANT_MARKER: &str = "Assistant:";

const TURN_SEPARATOR: &str = "\n\n";

/// Conversation roles understood by the prompt format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a wire role. Anything else (`tool`, `function`, ...) is `None`.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Transcript label for this role.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

/// Flatten a message history into a single transcript prompt.
///
/// Each recognized message becomes `"<Label>: <content>"`, turns are separated
/// by a blank line, and the result always ends with [`ASSISTANT_MARKER`].
/// Messages with unknown roles are skipped.
pub fn build_prompt(messages: &[OpenAIMessage]) -> String {
    let turns: Vec<(Role, Cow<'_, str>)> = messages
        .iter()
        .filter_map(|m| Role::parse(&m.role).map(|role| (role, m.text())))
        .collect();

    // An empty trailing assistant turn already cues the reply.
    let cued = matches!(turns.last(), Some((Role::Assistant, text)) if text.is_empty());

    let mut prompt = turns
        .iter()
        .map(|(role, text)| format!("{}: {}", role.label(), text))
        .collect::<Vec<_>>()
        .join(TURN_SEPARATOR);

    if cued {
        // Drop the space after the bare label.
        prompt.pop();
    } else if !prompt.ends_with(ASSISTANT_MARKER) {
        prompt.push_str(TURN_SEPARATOR);
        prompt.push_str(ASSISTANT_MARKER);
    }

    prompt
}
