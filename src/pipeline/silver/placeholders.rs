use once_cell::sync::Lazy;

/// Textual spellings of "no value" seen in landed extracts. Matching is
/// case-sensitive and exact, applied only after trimming and unquoting.
pub static STANDARD_PLACEHOLDERS: Lazy<PlaceholderSet> = Lazy::new(|| {
    PlaceholderSet::new([
        "[NULL]", "[null]", "NULL", "null", "None", "none", "N/A", "n/a", "NA", "na", "NaN",
        "nan", "", " ", "  ", "-", "--", ".", "undefined",
    ])
});

/// Trims surrounding whitespace, then removes one layer of matching
/// enclosing quotes. `"  \"NULL\"  "` becomes `NULL`; an unpaired or inner
/// quote is left alone.
pub fn scrub_raw_text(text: &str) -> &str {
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// The set of tokens that mean "absent". Immutable after construction and
/// shared read-only across runs; tests substitute their own sets.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    tokens: Vec<String>,
}

impl PlaceholderSet {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn standard() -> &'static PlaceholderSet {
        &STANDARD_PLACEHOLDERS
    }

    /// Exact-match membership. `"null-ish"` is not a placeholder.
    pub fn contains(&self, value: &str) -> bool {
        self.tokens.iter().any(|t| t == value)
    }

    /// Uppercased view of the token list, used by the comment categorizer
    /// to recognize placeholder spellings after its own uppercasing step.
    pub fn uppercased_tokens(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.to_uppercase()).collect()
    }

    /// Resolves one raw cell to either its scrubbed text or the absent
    /// marker. Pure; any input survives.
    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let scrubbed = scrub_raw_text(raw?);
        if self.contains(scrubbed) {
            None
        } else {
            Some(scrubbed.to_string())
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
