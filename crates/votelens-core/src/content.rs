//! Body text extraction for the documents that end up being voted on.

use std::sync::LazyLock;

use regex::Regex;

use crate::DocumentType;
use crate::block::{Block, collapse_whitespace};

/// Content above this many characters is dropped from the votes table.
pub const MAX_CONTENT_CHARS: usize = 58_000 * 3;

static RUNNING_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Deutscher Bundestag\s+–\s+\d+\.\s+Wahlperiode\s+–\s*\d+\s*–\s+Drucksache\s+\d+/\d+")
        .unwrap()
});

static FIRST_PAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Deutscher Bundestag\s+Drucksache\s+\d+/\d+\s+\d+\.\s+Wahlperiode\s+\d+\.\d+\.\d+")
        .unwrap()
});

/// Join the blocks from the first one starting with `start_mark` up to, but
/// excluding, the first later one starting with `end_mark`.
///
/// With `end_mark` set, both marks must be present.
fn span(blocks: &[Block], start_mark: &str, end_mark: Option<&str>) -> Option<String> {
    let start = blocks
        .iter()
        .position(|b| b.text.trim().starts_with(start_mark))?;
    let end = match end_mark {
        Some(mark) => {
            start
                + 1
                + blocks[start + 1..]
                    .iter()
                    .position(|b| b.text.trim().starts_with(mark))?
        }
        None => blocks.len(),
    };
    Some(join(&blocks[start..end]))
}

fn join(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Problem statement and solution of a law draft: sections `A.` and `B.`.
pub fn law_draft(blocks: &[Block]) -> Option<String> {
    span(blocks, "A.", Some("C."))
}

/// Motion text up to its justification.
pub fn motion(blocks: &[Block]) -> Option<String> {
    if blocks.is_empty() {
        return None;
    }
    let end = blocks
        .iter()
        .position(|b| b.text.trim().starts_with("Begründung"))
        .unwrap_or(blocks.len());
    Some(join(&blocks[..end]))
}

/// Extract and clean the body text for a document type.
///
/// Returns `None` for types that carry no votable body, or when the expected
/// structure is missing.
pub fn extract(doc_type: &DocumentType, blocks: &[Block]) -> Option<String> {
    let raw = match doc_type {
        DocumentType::Gesetzentwurf => law_draft(blocks)?,
        t if t.is_motion() => motion(blocks)?,
        _ => return None,
    };
    Some(clean(&raw))
}

/// Strip repeated page headers and collapse whitespace.
pub fn clean(text: &str) -> String {
    let text = RUNNING_HEADER.replace_all(text, "");
    let text = FIRST_PAGE_HEADER.replace_all(&text, "");
    collapse_whitespace(&text)
}

/// Whether content fits the length budget.
pub fn within_budget(content: &str) -> bool {
    content.chars().count() < MAX_CONTENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Block::new(0, i as f32, *t))
            .collect()
    }

    #[test]
    fn law_draft_between_a_and_c() {
        let b = blocks(&[
            "Gesetzentwurf der Bundesregierung",
            "A. Problem und Ziel",
            "Das Recht ist veraltet.",
            "B. Lösung",
            "C. Alternativen",
            "Keine.",
        ]);
        assert_eq!(
            extract(&DocumentType::Gesetzentwurf, &b).unwrap(),
            "A. Problem und Ziel Das Recht ist veraltet. B. Lösung"
        );
    }

    #[test]
    fn law_draft_without_c_has_no_content() {
        let b = blocks(&["A. Problem", "B. Lösung"]);
        assert!(law_draft(&b).is_none());
    }

    #[test]
    fn motion_stops_at_justification() {
        let b = blocks(&["Antrag der Fraktion", "Der Bundestag fordert", "Begründung", "Weil."]);
        assert_eq!(
            extract(&DocumentType::Antrag, &b).unwrap(),
            "Antrag der Fraktion Der Bundestag fordert"
        );
    }

    #[test]
    fn motion_without_justification_is_whole_document() {
        let b = blocks(&["Entschließungsantrag", "Text"]);
        assert_eq!(
            extract(&DocumentType::Entschliessungsantrag, &b).unwrap(),
            "Entschließungsantrag Text"
        );
    }

    #[test]
    fn other_types_have_no_content() {
        let b = blocks(&["Bericht", "A. x", "C. y"]);
        assert!(extract(&DocumentType::Bericht, &b).is_none());
        assert!(extract(&DocumentType::Beschlussempfehlung, &b).is_none());
    }

    #[test]
    fn clean_strips_page_headers() {
        let text = "Satz eins. Deutscher Bundestag – 20. Wahlperiode – 3 – Drucksache 20/100 Satz zwei.";
        assert_eq!(clean(text), "Satz eins. Satz zwei.");

        let text = "Deutscher Bundestag Drucksache 20/100 20. Wahlperiode 15.01.2025 Antrag";
        assert_eq!(clean(text), "Antrag");
    }

    #[test]
    fn budget() {
        assert!(within_budget("kurz"));
        assert!(!within_budget(&"x".repeat(MAX_CONTENT_CHARS)));
    }
}
