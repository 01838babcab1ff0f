//! Candidate detection predicate.

/// Name fragments that suggest a saved web page.
const WEB_NAME_INDICATORS: &[&str] = &["http", "www.", ".com", ".org", ".net", "article", "blog"];

/// Case-insensitive substring patterns that mark a document as a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePatterns {
    patterns: Vec<String>,
    web_names: bool,
}

impl SourcePatterns {
    /// Build from configured patterns. Blank patterns are dropped.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            patterns,
            web_names: false,
        }
    }

    /// Also accept names that look like saved web pages.
    #[must_use]
    pub const fn with_web_names(mut self, enabled: bool) -> Self {
        self.web_names = enabled;
        self
    }

    /// Returns true if `display_name` contains any pattern.
    #[must_use]
    pub fn matches(&self, display_name: &str) -> bool {
        let name = display_name.to_lowercase();
        self.patterns.iter().any(|p| name.contains(p.as_str()))
            || (self.web_names && WEB_NAME_INDICATORS.iter().any(|i| name.contains(i)))
    }

    /// Returns true if nothing can ever match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && !self.web_names
    }
}
