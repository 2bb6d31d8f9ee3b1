//! Regex extraction of model replies.

use once_cell::sync::Lazy;
use regex::Regex;

static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<<<TOPIC>>>(.*?)<<<TOPIC>>>.*?<<<SUMMARY_START>>>(.*?)<<<SUMMARY_END>>>")
        .expect("summary pattern is valid")
});

static ANY_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\n?(.*?)```").expect("fence pattern is valid"));

const SUMMARY_LINE_PREFIX: &str = "[Summary Sentence";

/// Parsed title and summary lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSummary {
    pub topic: String,
    pub summary: Vec<String>,
}

/// Why a summary reply could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParseError {
    MissingDelimiters,
    EmptyTopic,
    NoSummarySentences,
}

impl std::fmt::Display for SummaryParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDelimiters => write!(f, "Could not find expected delimiters in response."),
            Self::EmptyTopic => write!(f, "Topic section was empty."),
            Self::NoSummarySentences => write!(f, "No summary sentences found in response."),
        }
    }
}

/// Extract the title and `[Summary Sentence ...]` lines from a summary reply.
pub fn parse_summary(text: &str) -> Result<ParsedSummary, SummaryParseError> {
    let caps = SUMMARY_RE
        .captures(text)
        .ok_or(SummaryParseError::MissingDelimiters)?;

    let topic = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
    if topic.is_empty() {
        return Err(SummaryParseError::EmptyTopic);
    }

    let summary: Vec<String> = caps
        .get(2)
        .map_or("", |m| m.as_str())
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(SUMMARY_LINE_PREFIX))
        .map(String::from)
        .collect();
    if summary.is_empty() {
        return Err(SummaryParseError::NoSummarySentences);
    }

    Ok(ParsedSummary { topic, summary })
}

/// Extract the first fenced code block, preferring one tagged with `language`.
///
/// Returns `Ok(None)` when the reply holds no fence at all, and `Err` when the
/// language tag cannot be turned into a pattern.
pub fn extract_code(text: &str, language: &str) -> Result<Option<String>, regex::Error> {
    let tagged = Regex::new(&format!(r"(?s)```{}(.*?)```", regex::escape(language)))?;
    let found = tagged
        .captures(text)
        .or_else(|| ANY_FENCE_RE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|code| !code.is_empty());
    Ok(found)
}
