//! Tone-decorated prompt templates.

const BASE_TEMPLATE: &str = "You are a helpful AI assistant. Provide responses in a natural \
conversational tone in plain text only, formatted as if for a text-to-speech system. Now, \
respond to the following prompt: ";

const FORMAL_PREAMBLE: &str = "You are a highly knowledgeable and articulate AI assistant. \
Provide a well-structured, formal response and maintain a professional tone.";

const CASUAL_PREAMBLE: &str = "Hey! Can you explain this in a fun and easy way? Maybe use an \
example or analogy if it makes sense. Keep it light and simple. 😊";

const FRIENDLY_PREAMBLE: &str = "You are a friendly AI assistant. Keep responses polite, \
cheerful, and encouraging. Use positive language, add a touch of humor if needed, and keep \
explanations clear and concise.";

/// Wrap `utterance` in the prompt template for `tone`.
///
/// `Formal`, `Casual` and `Friendly` (exact labels) prepend a preamble and a
/// blank line. Any other label yields the base template unchanged.
/// Callers pass the canonical label from `Tone::label`, not raw user input.
pub fn tone_prompt(utterance: &str, tone: &str) -> String {
    let template = format!("{}{}", BASE_TEMPLATE, utterance);
    let preamble = match tone {
        "Formal" => FORMAL_PREAMBLE,
        "Casual" => CASUAL_PREAMBLE,
        "Friendly" => FRIENDLY_PREAMBLE,
        _ => return template,
    };
    format!("{}\n\n{}", preamble, template)
}
