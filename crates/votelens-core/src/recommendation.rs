//! Beschlussempfehlung parsing.
//!
//! A recommendation document lists the proposals it covers inside the
//! resolution section, which opens with "Der Bundestag wolle beschließen" and
//! closes at the "Berlin, den ..." signature line. Each proposal appears as
//! `Drucksache <id> ... anzunehmen` or `Drucksache <id> ... abzulehnen`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::block::Block;
use crate::{CoreError, DocumentId, VoteId};

pub const SECTION_START: &str = "Der Bundestag wolle beschließen";
pub const SECTION_END: &str = "Berlin, den";

const ADOPT_VERB: &str = "anzunehmen";
const REJECT_VERB: &str = "abzulehnen";

static DRUCKSACHE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Drucksache\s+(\d+/\d+)").unwrap());

/// Recommended disposition of an underlying proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Adopt,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::Reject => "reject",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "adopt" => Some(Self::Adopt),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    fn from_verb(word: &str) -> Option<Self> {
        if word.starts_with(ADOPT_VERB) {
            Some(Self::Adopt)
        } else if word.starts_with(REJECT_VERB) {
            Some(Self::Reject)
        } else {
            None
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One underlying proposal named by a recommendation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub vote_id: VoteId,
    pub document_id: DocumentId,
    pub action: Recommendation,
}

/// Join the text of the resolution section.
///
/// Starts at the first block containing [`SECTION_START`] and stops before the
/// first later block containing [`SECTION_END`]; without a closing line the
/// section runs to the end of the document.
pub fn section_text(document: &DocumentId, blocks: &[Block]) -> Result<String, CoreError> {
    let start = blocks
        .iter()
        .position(|b| b.text.contains(SECTION_START))
        .ok_or_else(|| CoreError::SectionNotFound(document.to_string()))?;
    let end = blocks[start + 1..]
        .iter()
        .position(|b| b.text.contains(SECTION_END))
        .map_or(blocks.len(), |offset| start + 1 + offset);
    Ok(blocks[start..end]
        .iter()
        .map(|b| b.text.trim())
        .collect::<Vec<_>>()
        .join(" "))
}

fn is_plain_word(c: char) -> bool {
    c.is_ascii_alphabetic() || "ÄÖÜäöüß".contains(c)
}

/// Scan forward from just after a Drucksache id for its disposition verb.
///
/// Only whitespace-separated plain words may sit between the id and the verb;
/// anything else (digits, punctuation, another id) ends the clause. Returns
/// the verb and the byte offset just past it.
fn find_disposition(rest: &str) -> Option<(Recommendation, usize)> {
    let mut pos = 0;
    loop {
        let tail = &rest[pos..];
        let trimmed = tail.trim_start();
        if trimmed.len() == tail.len() {
            return None;
        }
        pos += tail.len() - trimmed.len();

        let word_len = trimmed
            .char_indices()
            .find(|&(_, c)| !is_plain_word(c))
            .map_or(trimmed.len(), |(i, _)| i);
        if word_len == 0 {
            return None;
        }
        let word = &trimmed[..word_len];
        if let Some(action) = Recommendation::from_verb(word) {
            let verb_len = match action {
                Recommendation::Adopt => ADOPT_VERB.len(),
                Recommendation::Reject => REJECT_VERB.len(),
            };
            return Some((action, pos + verb_len));
        }
        if word_len < trimmed.len() && !trimmed[word_len..].starts_with(char::is_whitespace) {
            return None;
        }
        pos += word_len;
    }
}

/// Extract every `Drucksache <id> ... <verb>` clause from a section, in order.
pub fn parse_section(vote_id: &VoteId, text: &str) -> Vec<RecommendationEntry> {
    let mut entries = Vec::new();
    let mut cursor = 0;
    while let Some(caps) = DRUCKSACHE_REF.captures_at(text, cursor) {
        let Some(whole) = caps.get(0) else { break };
        let id_match = &caps[1];
        match find_disposition(&text[whole.end()..]) {
            Some((action, consumed)) => {
                if let Ok(document_id) = id_match.parse() {
                    entries.push(RecommendationEntry {
                        vote_id: vote_id.clone(),
                        document_id,
                        action,
                    });
                }
                cursor = whole.end() + consumed;
            }
            None => cursor = whole.start() + 1,
        }
    }
    entries
}

/// Expand a recommendation document into the proposals it decides on.
///
/// A missing resolution section is logged and yields no entries.
pub fn parse(vote_id: &VoteId, document: &DocumentId, blocks: &[Block]) -> Vec<RecommendationEntry> {
    let text = match section_text(document, blocks) {
        Ok(text) => text,
        Err(e) => {
            error!(vote_id = %vote_id, document = %document, "{e}");
            return Vec::new();
        }
    };
    let entries = parse_section(vote_id, &text);
    if entries.is_empty() {
        warn!(vote_id = %vote_id, document = %document, "no proposals found in recommendation");
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote() -> VoteId {
        "20250129_1".parse().unwrap()
    }

    fn doc() -> DocumentId {
        "20/999".parse().unwrap()
    }

    fn blocks(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Block::new(0, i as f32, *t))
            .collect()
    }

    fn ids(entries: &[RecommendationEntry]) -> Vec<(String, Recommendation)> {
        entries
            .iter()
            .map(|e| (e.document_id.to_string(), e.action))
            .collect()
    }

    #[test]
    fn adopt_and_reject_in_document_order() {
        let b = blocks(&[
            "Beschlussempfehlung und Bericht",
            "Der Bundestag wolle beschließen,",
            "a) den Gesetzentwurf auf Drucksache 20/100 unverändert anzunehmen;",
            "b) den Antrag auf Drucksache 20/200 abzulehnen.",
            "Berlin, den 15. Januar 2025",
            "Drucksache 20/300 anzunehmen",
        ]);
        let entries = parse(&vote(), &doc(), &b);
        assert_eq!(
            ids(&entries),
            vec![
                ("20/100".into(), Recommendation::Adopt),
                ("20/200".into(), Recommendation::Reject),
            ]
        );
        assert!(entries.iter().all(|e| e.vote_id == vote()));
    }

    #[test]
    fn missing_start_marker_yields_nothing() {
        let b = blocks(&["Antrag", "Drucksache 20/100 anzunehmen"]);
        assert!(parse(&vote(), &doc(), &b).is_empty());
        assert!(matches!(
            section_text(&doc(), &b),
            Err(CoreError::SectionNotFound(_))
        ));
    }

    #[test]
    fn section_without_end_runs_to_last_block() {
        let b = blocks(&["Der Bundestag wolle beschließen,", "Drucksache 20/5 abzulehnen"]);
        let text = section_text(&doc(), &b).unwrap();
        assert!(text.ends_with("abzulehnen"));
    }

    #[test]
    fn end_marker_in_start_block_is_ignored() {
        let b = blocks(&[
            "Der Bundestag wolle beschließen, Berlin, den Antrag auf Drucksache 20/1 abzulehnen",
            "Berlin, den 1. März 2025",
        ]);
        assert_eq!(ids(&parse(&vote(), &doc(), &b)), vec![("20/1".into(), Recommendation::Reject)]);
    }

    #[test]
    fn no_matches_is_empty_not_error() {
        let b = blocks(&["Der Bundestag wolle beschließen,", "den Bericht zur Kenntnis zu nehmen."]);
        assert!(parse(&vote(), &doc(), &b).is_empty());
    }

    #[test]
    fn intervening_words_are_skipped() {
        let entries = parse_section(
            &vote(),
            "Drucksache 20/100 in der aus der Beschlussempfehlung ersichtlichen Fassung anzunehmen",
        );
        assert_eq!(ids(&entries), vec![("20/100".into(), Recommendation::Adopt)]);
    }

    #[test]
    fn punctuation_breaks_the_clause() {
        // The verb belongs to a different clause after the comma.
        let entries = parse_section(&vote(), "Drucksache 20/100 zur Kenntnis, den Antrag abzulehnen");
        assert!(entries.is_empty());
    }

    #[test]
    fn verb_of_next_reference_is_not_borrowed() {
        let entries = parse_section(
            &vote(),
            "Drucksache 20/100 und Drucksache 20/200 abzulehnen",
        );
        assert_eq!(ids(&entries), vec![("20/200".into(), Recommendation::Reject)]);
    }

    #[test]
    fn verb_followed_by_punctuation() {
        let entries = parse_section(&vote(), "Drucksache 20/7 anzunehmen; Drucksache 20/8 abzulehnen.");
        assert_eq!(
            ids(&entries),
            vec![
                ("20/7".into(), Recommendation::Adopt),
                ("20/8".into(), Recommendation::Reject),
            ]
        );
    }

    #[test]
    fn umlauts_count_as_word_characters() {
        let entries = parse_section(&vote(), "Drucksache 20/9 für erledigt gemäß abzulehnen");
        assert_eq!(ids(&entries), vec![("20/9".into(), Recommendation::Reject)]);
    }

    #[test]
    fn recommendation_strings() {
        assert_eq!(Recommendation::from_str_opt("reject"), Some(Recommendation::Reject));
        assert_eq!(Recommendation::from_str_opt("Ablehnung"), None);
        assert_eq!(Recommendation::Adopt.to_string(), "adopt");
    }
}
