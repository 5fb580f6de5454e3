//! External model identifiers and their CLI equivalents.

/// Model used when nothing else is configured.
pub const DEFAULT_CLI_MODEL: &str = "claude-3-sonnet-20240229";

const HAIKU: &str = "claude-3-haiku-20240307";
const SONNET: &str = "claude-3-sonnet-20240229";
const SONNET_3_5: &str = "claude-3-5-sonnet-20241022";
const OPUS: &str = "claude-3-opus-20240229";
const SONNET_4: &str = "claude-4-sonnet-20250514";

/// Advertised model ids, in listing order, with the CLI model each maps to.
const MODEL_TABLE: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", HAIKU),
    ("gpt-3.5-turbo-16k", HAIKU),
    ("gpt-4", SONNET),
    ("gpt-4-turbo", SONNET),
    ("gpt-4o", SONNET_3_5),
    ("gpt-4o-mini", HAIKU),
    ("gpt-4-32k", OPUS),
    ("claude-sonnet", SONNET_3_5),
    ("claude-haiku", HAIKU),
    ("claude-4-sonnet", SONNET_4),
];

/// Maps client-facing model names onto models the CLI accepts.
///
/// Lookup never fails: unknown names resolve to the fallback model so that
/// clients configured for some other provider keep working.
#[derive(Debug, Clone)]
pub struct ModelMapper {
    fallback: String,
}

impl ModelMapper {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    /// CLI model for `external`, or the fallback.
    pub fn map<'a>(&'a self, external: &str) -> &'a str {
        MODEL_TABLE
            .iter()
            .find(|&&(name, _)| name == external)
            .map_or(self.fallback.as_str(), |&(_, internal)| internal)
    }

    /// Whether `external` is one of the advertised model ids.
    pub fn is_known(&self, external: &str) -> bool {
        MODEL_TABLE.iter().any(|(name, _)| *name == external)
    }

    /// Advertised model ids.
    pub fn known_models(&self) -> impl Iterator<Item = &'static str> {
        MODEL_TABLE.iter().map(|(name, _)| *name)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for ModelMapper {
    fn default() -> Self {
        Self::new(DEFAULT_CLI_MODEL)
    }
}
