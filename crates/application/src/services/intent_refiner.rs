//! Intent refiner - decides what the synthesizer should actually say
//!
//! A JSON-mode classifier call separates "say this verbatim" (DIRECT) from
//! "answer this" (REPLY). The refiner never fails: any reasoning problem,
//! timeouts included, degrades to speaking the original text.

use std::fmt;
use std::sync::Arc;

use domain::{Intent, PARALINGUISTIC_TAGS, RefinedContent};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::ports::ReasoningPort;
use crate::services::paralinguistics::{self, MAX_MARKERS};

#[derive(Debug, Deserialize)]
struct ClassifierReply {
    intent: Intent,
    content: String,
}

/// Classifies user text into speakable content
pub struct IntentRefiner {
    reasoning: Arc<dyn ReasoningPort>,
}

impl fmt::Debug for IntentRefiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRefiner").finish_non_exhaustive()
    }
}

impl IntentRefiner {
    pub fn new(reasoning: Arc<dyn ReasoningPort>) -> Self {
        Self { reasoning }
    }

    /// Classify `text` and return content ready for synthesis
    #[instrument(skip(self, text, system_instruction), fields(text_len = text.len()))]
    pub async fn classify(&self, text: &str, system_instruction: Option<&str>) -> RefinedContent {
        let style = system_instruction
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let system = classifier_prompt(style.as_deref());
        let user = format!("Prompt: {text}");

        let raw = match self.reasoning.classify_json(&system, &user).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Intent classification unavailable, speaking text verbatim");
                return RefinedContent::direct(text).with_style(style);
            },
        };

        match parse_reply(&raw) {
            Some(reply) => {
                let content = paralinguistics::sanitize(&reply.content, reply.intent, text);
                if content.is_empty() {
                    warn!("Classifier returned empty content, speaking text verbatim");
                    return RefinedContent::direct(text).with_style(style);
                }
                debug!(intent = ?reply.intent, content_len = content.len(), "Intent classified");
                RefinedContent {
                    intent: reply.intent,
                    content,
                    style_instruction: style,
                }
            },
            None => {
                warn!(raw_len = raw.len(), "Unparsable classifier output, speaking text verbatim");
                RefinedContent::direct(text).with_style(style)
            },
        }
    }
}

/// Accept bare JSON or JSON wrapped in a markdown fence
fn parse_reply(raw: &str) -> Option<ClassifierReply> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).ok()
}

fn classifier_prompt(style: Option<&str>) -> String {
    let tags = PARALINGUISTIC_TAGS.join(", ");
    let mut prompt = format!(
        "You classify requests for a speech synthesizer and extract the words to speak.\n\
         Respond with one JSON object only: {{\"intent\": \"DIRECT\" or \"REPLY\", \"content\": \"...\"}}\n\
         \n\
         Intent:\n\
         - REPLY is the default. The user wants a spoken answer.\n\
         - DIRECT only when the user explicitly asks for exact or verbatim speech \
         (\"say exactly\", \"read this as-is\", \"repeat after me\").\n\
         \n\
         DIRECT content: only the words to be spoken, with the command phrasing removed \
         and the wording unchanged. Punctuation may be adjusted for natural pauses. \
         Do not add markers the user did not write.\n\
         \n\
         REPLY content: a short, natural, conversational answer in plain spoken language. \
         No lists, markdown, emojis or stage directions.\n\
         \n\
         Allowed paralinguistic markers: {tags}\n\
         - At most {MAX_MARKERS} per response, and only where they fit the emotion.\n\
         - Only at the start or end of a sentence, never mid-clause.\n\
         - Never place two markers next to each other.\n\
         - Use no marker when none is needed."
    );
    if let Some(style) = style {
        prompt.push_str(&format!("\n\nUser's style instruction: {style}"));
    }
    prompt
}
