//! Result of intent classification

use serde::{Deserialize, Serialize};

/// Paralinguistic markers the synthesis model understands
pub const PARALINGUISTIC_TAGS: [&str; 9] = [
    "[clear throat]",
    "[sigh]",
    "[shush]",
    "[cough]",
    "[groan]",
    "[sniff]",
    "[gasp]",
    "[chuckle]",
    "[laugh]",
];

/// Whether the user wants their words spoken or answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    /// Speak the supplied text verbatim
    Direct,
    /// Speak a newly generated reply
    Reply,
}

/// Text ready for synthesis plus optional delivery style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedContent {
    pub intent: Intent,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_instruction: Option<String>,
}

impl RefinedContent {
    /// Speak the given text as-is
    pub fn direct(text: impl Into<String>) -> Self {
        Self {
            intent: Intent::Direct,
            content: text.into(),
            style_instruction: None,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style_instruction = style;
        self
    }
}
