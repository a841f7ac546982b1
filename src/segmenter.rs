/*!
 * Markdown segmentation and placeholder protection.
 *
 * This module decomposes a Markdown document into ordered structural blocks
 * that can be translated independently and reassembled losslessly. It also
 * implements the reversible placeholder substitution used to shield code,
 * links, and other non-translatable spans from the translation models, and
 * the number/link extraction used for cross-stage validation.
 *
 * Round-trip guarantee: every block records its trailing line separator in
 * `meta`, so `reconstruct(segment(text)) == text` byte-for-byte.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::ConfigError;

/// Meta key holding the separator that followed the block in the source
pub const META_SUFFIX: &str = "suffix";
/// Meta key holding the heading level for heading blocks
pub const META_LEVEL: &str = "level";
/// Meta key holding the list marker for list-item blocks
pub const META_MARKER: &str = "marker";

// Built-in protected spans, tried in this order. Overlaps resolve
// leftmost-longest, so the image pattern wins over the plain link pattern
// at the same span start.
static BUILTIN_PROTECTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)```.*?```",                               // fenced code
        r"`[^`\n]+`",                                   // inline code
        r"!\[[^\]\n]*\]\([^)\n]*\)",                    // images
        r"\[[^\]\n]*\]\([^)\n]*\)",                     // links
        r"https?://[^\s<>\[\]()]+",                     // bare URLs
        r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>\n]*)?/?>",  // HTML-like tags
        r"\{[^{}\n]+\}",                                // template placeholders
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid built-in protection pattern"))
    .collect()
});

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:[.,:/-]\d+)*").expect("Invalid number regex")
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[^\s<>\[\]()]+").expect("Invalid URL regex")
});

static LINK_TARGET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\]\(([^)\s]+)\)").expect("Invalid link target regex")
});

static LIST_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)([-*+]|\d{1,9}[.)])(\s+|$)").expect("Invalid list marker regex")
});

/// Structural kind of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Ordinary prose paragraph
    Paragraph,
    /// ATX heading (`#` through `######`)
    Heading,
    /// Single list item line (plus indented continuations)
    ListItem,
    /// Fenced code block, kept byte-identical
    CodeBlock,
    /// YAML frontmatter at document start, kept byte-identical
    Frontmatter,
    /// Run of blank lines, preserved exactly
    Blank,
    /// Consecutive `>`-prefixed lines
    Blockquote,
}

/// An ordered structural unit of a Markdown document
#[derive(Debug, Clone, Serialize)]
pub struct TextBlock {
    /// Structural kind
    pub kind: BlockKind,
    /// Raw content, inclusive of Markdown syntax
    pub text: String,
    /// Opaque annotations (trailing separator, heading level, list marker)
    pub meta: HashMap<String, String>,
}

impl TextBlock {
    /// Whether this block's text may be sent to the translation models
    pub fn is_translatable(&self) -> bool {
        !matches!(
            self.kind,
            BlockKind::CodeBlock | BlockKind::Frontmatter | BlockKind::Blank
        )
    }

    /// Replace the block text, keeping kind and meta
    pub fn with_text(&self, text: String) -> Self {
        Self {
            kind: self.kind,
            text,
            meta: self.meta.clone(),
        }
    }
}

/// Bijective placeholder view of a block's text
///
/// Protected spans are replaced by unique tokens chosen to be absent from
/// the source text and inert under translation (no natural-language
/// characters). `restore` is the exact inverse over the substituted text.
#[derive(Debug, Clone)]
pub struct ProtectedText {
    /// Text with protected spans replaced by placeholder tokens
    pub text: String,
    /// Token -> original substring, in order of first occurrence
    pub placeholders: Vec<(String, String)>,
}

impl ProtectedText {
    /// Replace every placeholder token found in `candidate` with its
    /// original substring; everything else is left untouched
    pub fn restore(&self, candidate: &str) -> String {
        let mut restored = candidate.to_string();
        for (token, original) in &self.placeholders {
            restored = restored.replace(token, original);
        }
        restored
    }

    /// Iterate over the placeholder tokens
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(|(token, _)| token.as_str())
    }
}

/// Reversible Markdown block segmenter with placeholder protection
#[derive(Debug, Default, Clone)]
pub struct MarkdownSegmenter;

impl MarkdownSegmenter {
    /// Create a new segmenter
    pub fn new() -> Self {
        Self
    }

    /// Split a document into ordered structural blocks
    ///
    /// Code fences and frontmatter are never split internally. Blank runs
    /// become `Blank` blocks preserving the exact whitespace. A document
    /// with no recognizable structure yields a single paragraph block.
    pub fn segment(&self, text: &str) -> Vec<TextBlock> {
        let mut blocks = Vec::new();
        if text.is_empty() {
            return blocks;
        }

        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut i = 0;

        // Frontmatter only counts when it opens the document and is closed.
        if content_of(lines[0]) == "---" {
            if let Some(close) = lines
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, l)| content_of(l) == "---")
                .map(|(idx, _)| idx)
            {
                blocks.push(make_block(BlockKind::Frontmatter, &lines[0..=close], None));
                i = close + 1;
            }
        }

        while i < lines.len() {
            let line = lines[i];

            if is_blank(line) {
                let start = i;
                while i < lines.len() && is_blank(lines[i]) {
                    i += 1;
                }
                blocks.push(make_block(BlockKind::Blank, &lines[start..i], None));
                continue;
            }

            if let Some((fence_char, fence_len)) = opening_fence(line) {
                let start = i;
                i += 1;
                while i < lines.len() && !closes_fence(lines[i], fence_char, fence_len) {
                    i += 1;
                }
                // Unterminated fences run to end-of-document.
                if i < lines.len() {
                    i += 1;
                }
                blocks.push(make_block(BlockKind::CodeBlock, &lines[start..i], None));
                continue;
            }

            if let Some(level) = heading_level(line) {
                let meta = vec![(META_LEVEL.to_string(), level.to_string())];
                blocks.push(make_block(BlockKind::Heading, &lines[i..=i], Some(meta)));
                i += 1;
                continue;
            }

            if is_blockquote(line) {
                let start = i;
                while i < lines.len() && is_blockquote(lines[i]) {
                    i += 1;
                }
                blocks.push(make_block(BlockKind::Blockquote, &lines[start..i], None));
                continue;
            }

            if let Some(marker) = list_marker(line) {
                let start = i;
                i += 1;
                // Indented continuation lines belong to the item.
                while i < lines.len() && is_continuation(lines[i]) {
                    i += 1;
                }
                let meta = vec![(META_MARKER.to_string(), marker)];
                blocks.push(make_block(BlockKind::ListItem, &lines[start..i], Some(meta)));
                continue;
            }

            // Paragraph: gather until the next structural boundary.
            let start = i;
            i += 1;
            while i < lines.len() && !starts_new_block(lines[i]) {
                i += 1;
            }
            blocks.push(make_block(BlockKind::Paragraph, &lines[start..i], None));
        }

        debug!("Segmented document into {} blocks", blocks.len());
        blocks
    }

    /// Inverse of `segment`: concatenate block texts with the separators
    /// recorded in each block's meta
    pub fn reconstruct(&self, blocks: &[TextBlock]) -> String {
        let mut out = String::new();
        for block in blocks {
            out.push_str(&block.text);
            if let Some(suffix) = block.meta.get(META_SUFFIX) {
                out.push_str(suffix);
            }
        }
        out
    }

    /// Replace protected spans with unique placeholder tokens
    ///
    /// Applies the built-in protections (code, links, URLs, HTML-like tags,
    /// template placeholders) followed by `extra_patterns`. Overlapping
    /// matches resolve leftmost-longest; a span already protected is never
    /// re-matched by a later pattern.
    ///
    /// # Errors
    /// `ConfigError::InvalidPattern` if an extra pattern fails to compile.
    /// Protection itself never fails: worst case, zero spans are protected.
    pub fn protect_text(
        &self,
        text: &str,
        extra_patterns: &[String],
    ) -> Result<ProtectedText, ConfigError> {
        let extras = compile_patterns(extra_patterns)?;

        let mut spans: Vec<(usize, usize)> = Vec::new();
        for pattern in BUILTIN_PROTECTIONS.iter().chain(extras.iter()) {
            for m in pattern.find_iter(text) {
                spans.push((m.start(), m.end()));
            }
        }

        // Leftmost-longest: earliest start wins, longest match breaks ties.
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut selected: Vec<(usize, usize)> = Vec::new();
        let mut last_end = 0;
        for (start, end) in spans {
            if start >= last_end {
                selected.push((start, end));
                last_end = end;
            }
        }

        let prefix = token_prefix(text);
        let mut protected = String::with_capacity(text.len());
        let mut placeholders = Vec::with_capacity(selected.len());
        let mut cursor = 0;
        for (idx, (start, end)) in selected.iter().enumerate() {
            let token = format!("{}{}⟧", prefix, idx);
            protected.push_str(&text[cursor..*start]);
            protected.push_str(&token);
            placeholders.push((token, text[*start..*end].to_string()));
            cursor = *end;
        }
        protected.push_str(&text[cursor..]);

        Ok(ProtectedText {
            text: protected,
            placeholders,
        })
    }

    /// Extract all numeric literals from `text`, order-independent
    ///
    /// Used purely for cross-stage validation; the pipeline compares the
    /// results as multisets.
    pub fn extract_numbers(&self, text: &str) -> Vec<String> {
        NUMBER_REGEX
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract all URLs and Markdown link targets from `text`
    pub fn extract_links(&self, text: &str) -> Vec<String> {
        let mut links: Vec<String> = URL_REGEX
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        for cap in LINK_TARGET_REGEX.captures_iter(text) {
            if let Some(target) = cap.get(1) {
                links.push(target.as_str().to_string());
            }
        }
        links
    }
}

/// Compile user-supplied protection patterns, failing fast on the first bad one
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Pick a placeholder token prefix guaranteed absent from the source text.
///
/// Starts at `⟦P` and widens with extra brackets until the prefix no longer
/// occurs, so generated tokens like `⟦P0⟧` can never collide with content.
fn token_prefix(text: &str) -> String {
    let mut prefix = String::from("⟦P");
    while text.contains(prefix.as_str()) {
        prefix.insert(0, '⟦');
    }
    prefix
}

fn make_block(
    kind: BlockKind,
    lines: &[&str],
    meta_extra: Option<Vec<(String, String)>>,
) -> TextBlock {
    let mut text: String = lines.concat();
    let suffix = if text.ends_with("\r\n") {
        text.truncate(text.len() - 2);
        "\r\n"
    } else if text.ends_with('\n') {
        text.truncate(text.len() - 1);
        "\n"
    } else {
        ""
    };

    let mut meta = HashMap::new();
    meta.insert(META_SUFFIX.to_string(), suffix.to_string());
    if let Some(extra) = meta_extra {
        meta.extend(extra);
    }

    TextBlock { kind, text, meta }
}

/// Line content without its end-of-line sequence
fn content_of(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

fn is_blank(line: &str) -> bool {
    content_of(line).trim().is_empty()
}

fn opening_fence(line: &str) -> Option<(char, usize)> {
    let content = content_of(line);
    let trimmed = content.trim_start();
    if content.len() - trimmed.len() > 3 {
        return None;
    }
    for fence_char in ['`', '~'] {
        let len = trimmed.chars().take_while(|&c| c == fence_char).count();
        if len >= 3 {
            return Some((fence_char, len));
        }
    }
    None
}

fn closes_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = content_of(line).trim();
    trimmed.len() >= fence_len && trimmed.chars().all(|c| c == fence_char)
}

fn heading_level(line: &str) -> Option<usize> {
    let content = content_of(line);
    let trimmed = content.trim_start();
    if content.len() - trimmed.len() > 3 {
        return None;
    }
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&level) {
        match trimmed.as_bytes().get(level) {
            None | Some(b' ') | Some(b'\t') => Some(level),
            _ => None,
        }
    } else {
        None
    }
}

fn is_blockquote(line: &str) -> bool {
    let content = content_of(line);
    let trimmed = content.trim_start();
    content.len() - trimmed.len() <= 3 && trimmed.starts_with('>')
}

fn list_marker(line: &str) -> Option<String> {
    LIST_MARKER_REGEX
        .captures(content_of(line))
        .map(|cap| cap[2].to_string())
}

/// An indented, non-blank line continues the preceding list item
fn is_continuation(line: &str) -> bool {
    !is_blank(line)
        && line.starts_with(char::is_whitespace)
        && opening_fence(line).is_none()
        && heading_level(line).is_none()
        && list_marker(line).is_none()
        && !is_blockquote(line)
}

fn starts_new_block(line: &str) -> bool {
    is_blank(line)
        || opening_fence(line).is_some()
        || heading_level(line).is_some()
        || list_marker(line).is_some()
        || is_blockquote(line)
}
