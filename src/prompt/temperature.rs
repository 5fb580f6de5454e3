//! Temperature emulation.
//!
//! The CLI has no sampling flag, so the requested temperature is expressed as
//! an instruction placed right before the final assistant cue.

use super::builder::ASSISTANT_MARKER;

pub const PRECISE_INSTRUCTION: &str = "Please be precise, focused, and concise in your response.";
pub const CREATIVE_INSTRUCTION: &str =
    "Please be creative, varied, and expressive in your response.";
pub const BALANCED_INSTRUCTION: &str = "Please provide a balanced and natural response.";

const NEUTRAL: f64 = 1.0;
const PRECISE_BELOW: f64 = 0.3;
const CREATIVE_ABOVE: f64 = 0.7;

/// Steering instruction for a temperature value.
pub fn instruction_for(temperature: f64) -> &'static str {
    if temperature < PRECISE_BELOW {
        PRECISE_INSTRUCTION
    } else if temperature > CREATIVE_ABOVE {
        CREATIVE_INSTRUCTION
    } else {
        BALANCED_INSTRUCTION
    }
}

/// Insert the temperature instruction into `prompt`.
///
/// The neutral temperature returns the prompt unchanged.
#[allow(clippy::float_cmp)]
pub fn apply_temperature(prompt: String, temperature: f64) -> String {
    if temperature == NEUTRAL {
        return prompt;
    }

    let instruction = instruction_for(temperature);
    match prompt.strip_suffix(ASSISTANT_MARKER) {
        Some(head) => format!("{head}{instruction}\n\n{ASSISTANT_MARKER}"),
        None => format!("{prompt}\n\n{instruction}\n\n{ASSISTANT_MARKER}"),
    }
}
