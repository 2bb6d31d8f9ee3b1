//! Slide outline text → title plus slide blocks.
//!
//! Outline text looks like:
//!
//! ```text
//! Title: Deck title
//! ---
//! Slide 1: First slide
//! - a bullet
//! Image Suggestion: something to search for
//! ---
//! ```

use crate::photos::suggestions;
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Title:\s*(.*)").expect("title pattern is valid"));
static SLIDE_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Slide\s*\d+:\s*(.*)").expect("slide title pattern is valid"));
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z]*\n(.*?)```").expect("code pattern is valid"));

/// Default title for a block without a `Slide N:` line.
pub const UNTITLED_SLIDE: &str = "Slide";

/// A line of slide body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLine {
    /// `- text`, dash stripped
    Bullet(String),
    /// Any other non-empty line
    Text(String),
}

impl ContentLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Bullet(t) | Self::Text(t) => t,
        }
    }
}

/// One `---` separated unit of outline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideBlock {
    pub title: String,
    pub lines: Vec<ContentLine>,
    /// Body of the first fenced code block, if any
    pub code: Option<String>,
    /// Every image suggestion in the block, in order
    pub image_suggestions: Vec<String>,
}

/// Parsed outline: deck title plus renderable blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckOutline {
    pub title: Option<String>,
    pub blocks: Vec<SlideBlock>,
}

impl DeckOutline {
    /// Parse outline text.
    ///
    /// Blocks are delimited by lines consisting of `---`. Text with no
    /// separator line yields no blocks, only the deck title. Blocks that are
    /// empty once `Title:` lines are removed are dropped.
    pub fn parse(text: &str) -> Self {
        let title = TITLE_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());

        let chunks = split_blocks(text);
        if chunks.len() < 2 {
            return Self {
                title,
                blocks: Vec::new(),
            };
        }

        let blocks = chunks
            .into_iter()
            .filter_map(|chunk| parse_block(&chunk))
            .collect();

        Self { title, blocks }
    }

    /// Total image suggestions across all blocks.
    pub fn suggestion_count(&self) -> usize {
        self.blocks.iter().map(|b| b.image_suggestions.len()).sum()
    }
}

fn is_separator(line: &str) -> bool {
    line.trim() == "---"
}

fn split_blocks(text: &str) -> Vec<String> {
    let mut chunks = vec![String::new()];
    for line in text.lines() {
        if is_separator(line) {
            chunks.push(String::new());
        } else if let Some(current) = chunks.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    chunks
}

fn parse_block(chunk: &str) -> Option<SlideBlock> {
    let has_content = chunk
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("Title:"));
    if !has_content {
        return None;
    }

    let title = SLIDE_TITLE_RE
        .captures(chunk)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_SLIDE.to_string());

    let code = CODE_RE
        .captures(chunk)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty());

    Some(SlideBlock {
        title,
        lines: content_lines(chunk),
        code,
        image_suggestions: suggestions(chunk),
    })
}

fn content_lines(chunk: &str) -> Vec<ContentLine> {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for line in chunk.lines().map(str::trim) {
        if line.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence
            || line.is_empty()
            || (line.starts_with("Slide") && line.contains(':'))
            || line.starts_with("Title:")
            || line.starts_with("Image Suggestion:")
        {
            continue;
        }

        if let Some(rest) = line.strip_prefix('-') {
            let rest = rest.trim();
            if !rest.is_empty() {
                lines.push(ContentLine::Bullet(rest.to_string()));
            }
        } else {
            lines.push(ContentLine::Text(line.to_string()));
        }
    }
    lines
}
