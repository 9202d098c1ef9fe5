//! Post-processing of generated text

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A whole response wrapped in one fenced block, optional language tag.
static FENCED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```[\w+-]*[ \t]*\r?\n?(.*?)\s*```\z").expect("fence pattern is valid")
});

/// Strip a single enclosing code fence, then surrounding whitespace.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(inner) = FENCED.captures(trimmed).and_then(|c| c.get(1)) {
        let inner = inner.as_str().trim();
        // A line opening with a fence means several blocks, not one enclosing fence
        let nested = inner.lines().any(|line| line.trim_start().starts_with("```"));
        if !inner.is_empty() && !nested {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// A cited web resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// Raw grounding chunk as the authority returns it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Keep only chunks that point at a web resource. Empty means `None`.
pub fn extract_sources(chunks: &[GroundingChunk]) -> Option<Vec<Source>> {
    let sources: Vec<Source> = chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref()?.trim();
            if uri.is_empty() {
                return None;
            }
            Some(Source {
                uri: uri.to_string(),
                title: web.title.clone().unwrap_or_default(),
            })
        })
        .collect();

    (!sources.is_empty()).then_some(sources)
}
