/*!
 * Unit tests for Markdown segmentation and placeholder protection
 */

use mdtrans::segmenter::{BlockKind, MarkdownSegmenter};

use crate::common::sample_document;

#[test]
fn test_segment_withSampleDocument_shouldRoundTripByteForByte() {
    let segmenter = MarkdownSegmenter::new();
    let text = sample_document();

    let blocks = segmenter.segment(text);
    let rebuilt = segmenter.reconstruct(&blocks);

    assert_eq!(rebuilt, text);
}

#[test]
fn test_segment_withSampleDocument_shouldClassifyAllKinds() {
    let segmenter = MarkdownSegmenter::new();

    let blocks = segmenter.segment(sample_document());
    let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();

    assert!(kinds.contains(&BlockKind::Frontmatter));
    assert!(kinds.contains(&BlockKind::Heading));
    assert!(kinds.contains(&BlockKind::Paragraph));
    assert!(kinds.contains(&BlockKind::ListItem));
    assert!(kinds.contains(&BlockKind::Blockquote));
    assert!(kinds.contains(&BlockKind::CodeBlock));
    assert!(kinds.contains(&BlockKind::Blank));
}

#[test]
fn test_segment_withCrlfLineEndings_shouldRoundTrip() {
    let segmenter = MarkdownSegmenter::new();
    let text = "# Title\r\n\r\nBody one.\r\nBody two.\r\n";

    let blocks = segmenter.segment(text);

    assert_eq!(segmenter.reconstruct(&blocks), text);
}

#[test]
fn test_segment_withNoTrailingNewline_shouldRoundTrip() {
    let segmenter = MarkdownSegmenter::new();
    let text = "Paragraph without trailing newline";

    let blocks = segmenter.segment(text);

    assert_eq!(segmenter.reconstruct(&blocks), text);
}

#[test]
fn test_segment_withUnterminatedFence_shouldKeepRestAsCodeBlock() {
    let segmenter = MarkdownSegmenter::new();
    let text = "Intro.\n\n```\ncode that never closes\nmore code\n";

    let blocks = segmenter.segment(text);

    let last = blocks.last().unwrap();
    assert_eq!(last.kind, BlockKind::CodeBlock);
    assert_eq!(segmenter.reconstruct(&blocks), text);
}

#[test]
fn test_segment_withFrontmatterMidDocument_shouldNotTreatAsFrontmatter() {
    let segmenter = MarkdownSegmenter::new();
    let text = "Intro paragraph.\n\n---\nnot: frontmatter\n---\n";

    let blocks = segmenter.segment(text);

    assert!(blocks.iter().all(|b| b.kind != BlockKind::Frontmatter));
    assert_eq!(segmenter.reconstruct(&blocks), text);
}

#[test]
fn test_protectText_shouldReplaceCodeAndUrls() {
    let segmenter = MarkdownSegmenter::new();
    let text = "Use `cargo build` then visit https://example.com today.";

    let protected = segmenter.protect_text(text, &[]).unwrap();

    assert!(!protected.text.contains("cargo build"));
    assert!(!protected.text.contains("https://example.com"));
    assert_eq!(protected.placeholders.len(), 2);
    assert_eq!(protected.restore(&protected.text), text);
}

#[test]
fn test_protectText_withImageAndLink_shouldPreferLeftmostLongest() {
    let segmenter = MarkdownSegmenter::new();
    // The image span contains a link-shaped suffix; the whole image must
    // win over the inner link match.
    let text = "See ![alt](https://example.com/img.png) here.";

    let protected = segmenter.protect_text(text, &[]).unwrap();

    assert_eq!(protected.placeholders.len(), 1);
    assert_eq!(
        protected.placeholders[0].1,
        "![alt](https://example.com/img.png)"
    );
}

#[test]
fn test_protectText_withCustomPattern_shouldProtectMatches() {
    let segmenter = MarkdownSegmenter::new();
    let patterns = vec![r"\bACME-\d+\b".to_string()];

    let protected = segmenter
        .protect_text("Ticket ACME-1234 is open.", &patterns)
        .unwrap();

    assert!(!protected.text.contains("ACME-1234"));
    assert_eq!(protected.restore(&protected.text), "Ticket ACME-1234 is open.");
}

#[test]
fn test_protectText_withInvalidPattern_shouldFail() {
    let segmenter = MarkdownSegmenter::new();

    let result = segmenter.protect_text("text", &["(unclosed".to_string()]);

    assert!(result.is_err());
}

#[test]
fn test_protectText_withTokenLookalikeInSource_shouldStayBijective() {
    let segmenter = MarkdownSegmenter::new();
    // Source already contains text shaped like a placeholder token; the
    // prefix must be bumped so restoration stays exact.
    let text = "Weird input ⟦P0⟧ plus `code`.";

    let protected = segmenter.protect_text(text, &[]).unwrap();

    assert_eq!(protected.restore(&protected.text), text);
}

#[test]
fn test_extractNumbers_shouldKeepCompoundLiteralsWhole() {
    let segmenter = MarkdownSegmenter::new();

    let numbers = segmenter.extract_numbers("v1.2.3 released 2024-06-01 at 10:30, 42 fixes");

    assert!(numbers.contains(&"1.2.3".to_string()));
    assert!(numbers.contains(&"2024-06-01".to_string()));
    assert!(numbers.contains(&"10:30".to_string()));
    assert!(numbers.contains(&"42".to_string()));
}

#[test]
fn test_extractLinks_shouldFindTargetsAndBareUrls() {
    let segmenter = MarkdownSegmenter::new();

    let links = segmenter.extract_links("A [link](https://a.example/x) and https://b.example/y.");

    assert!(links.iter().any(|l| l.contains("a.example")));
    assert!(links.iter().any(|l| l.contains("b.example")));
}
