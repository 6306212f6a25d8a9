use regex::Regex;
use std::borrow::Cow;

/// Strips volatile tokens from fetched content before comparison.
///
/// Documentation hosts inject a fresh CSP nonce into every response, so two
/// byte-identical pages fetched seconds apart would otherwise register as a
/// change on every run. Normalization runs before every comparison and the
/// persisted snapshot keeps the normalized form.
pub struct ContentNormalizer {
    markup_probe: Regex,
    nonce_attr: Regex,
}

impl ContentNormalizer {
    pub fn new() -> Self {
        Self {
            // A tag carrying at least one attribute; plain markdown or prose
            // does not match and passes through untouched.
            markup_probe: Regex::new(r#"<[a-zA-Z][a-zA-Z0-9-]*\s+[a-zA-Z-]+=""#)
                .expect("markup probe pattern"),
            nonce_attr: Regex::new(r#"\s+nonce="[^"]*""#).expect("nonce attribute pattern"),
        }
    }

    /// Normalize content for comparison and storage.
    ///
    /// Inputs that do not look like markup are returned unchanged. For markup,
    /// every `nonce="..."` attribute is removed; all other attributes and
    /// structure are preserved. Idempotent.
    pub fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.markup_probe.is_match(text) {
            return Cow::Borrowed(text);
        }
        self.nonce_attr.replace_all(text, "")
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
