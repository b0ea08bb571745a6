//! Drucksache type vocabulary and title classification.
//!
//! Titles start with a type phrase, optionally preceded by one ordinal
//! ("Zweite Beschlussempfehlung ..."). The phrases are tried in the order of
//! [`TYPE_RULES`], most specific first, and each rule names the canonical tag
//! the phrase collapses to.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Ordinal prefixes, both grammatical genders.
pub const ORDINALS: &[&str] = &[
    "Erste", "Zweite", "Dritte", "Vierte", "Fünfte", "Sechste", "Siebte", "Achte", "Neunte",
    "Zehnte", "Erster", "Zweiter", "Dritter", "Vierter", "Fünfter", "Sechster", "Siebter",
    "Achter", "Neunter", "Zehnter",
];

/// A type phrase and the canonical tag it classifies to.
#[derive(Debug, Clone, Copy)]
pub struct TypeRule {
    pub phrase: &'static str,
    pub tag: &'static str,
}

const fn rule(phrase: &'static str, tag: &'static str) -> TypeRule {
    TypeRule { phrase, tag }
}

/// Type phrases in priority order.
///
/// A phrase that is a prefix of another must come after it.
pub const TYPE_RULES: &[TypeRule] = &[
    rule("Beschlussempfehlung und Bericht", "Beschlussempfehlung"),
    rule("Beschlussempfehlung", "Beschlussempfehlung"),
    rule("Gesetzentwurf", "Gesetzentwurf"),
    rule("Gesetzesentwurf", "Gesetzentwurf"),
    rule("Antrag", "Antrag"),
    rule("Änderungsantrag", "Änderungsantrag"),
    rule("Entschließungsantrag", "Entschließungsantrag"),
    rule("Bericht", "Bericht"),
    rule("Unterrichtung", "Unterrichtung"),
    rule("Ergänzung zu den Beschlussempfehlungen", "Ergänzung"),
    rule("Kleine Anfrage", "Kleine"),
    rule("Verordnung", "Verordnung"),
    rule("Antwort", "Antwort"),
    rule("Große Anfrage", "Große"),
    rule("Entwurf eines", "Gesetzentwurf"),
];

fn alternation<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(regex::escape).collect::<Vec<_>>().join("|")
}

static CLASSIFY: LazyLock<Regex> = LazyLock::new(|| {
    let ordinals = alternation(ORDINALS.iter().copied());
    let phrases = alternation(TYPE_RULES.iter().map(|r| r.phrase));
    Regex::new(&format!(r"(?i)^(?:(?:{ordinals})\s+)?({phrases})")).unwrap()
});

static TITLE_START: LazyLock<Regex> = LazyLock::new(|| {
    let ordinals = alternation(ORDINALS.iter().copied());
    let phrases = alternation(TYPE_RULES.iter().map(|r| r.phrase));
    Regex::new(&format!(r"^(?:(?:{ordinals})\s)?(?:{phrases})")).unwrap()
});

/// Canonical Drucksache type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DocumentType {
    Gesetzentwurf,
    Antrag,
    Aenderungsantrag,
    Entschliessungsantrag,
    Beschlussempfehlung,
    Bericht,
    /// A recognised type outside the voting vocabulary (Unterrichtung, Antwort, ...).
    Other(String),
    /// Classification failed; used where a miss must not abort processing.
    Unknown,
}

impl DocumentType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Gesetzentwurf" => Self::Gesetzentwurf,
            "Antrag" => Self::Antrag,
            "Änderungsantrag" => Self::Aenderungsantrag,
            "Entschließungsantrag" => Self::Entschliessungsantrag,
            "Beschlussempfehlung" => Self::Beschlussempfehlung,
            "Bericht" => Self::Bericht,
            "Unbekannt" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Gesetzentwurf => "Gesetzentwurf",
            Self::Antrag => "Antrag",
            Self::Aenderungsantrag => "Änderungsantrag",
            Self::Entschliessungsantrag => "Entschließungsantrag",
            Self::Beschlussempfehlung => "Beschlussempfehlung",
            Self::Bericht => "Bericht",
            Self::Other(tag) => tag,
            Self::Unknown => "Unbekannt",
        }
    }

    pub fn is_recommendation(&self) -> bool {
        matches!(self, Self::Beschlussempfehlung)
    }

    /// Motion-like types whose content runs up to the "Begründung" heading.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::Antrag | Self::Aenderungsantrag | Self::Entschliessungsantrag
        )
    }

    /// Types kept in the final votes table.
    pub fn is_relevant(&self) -> bool {
        matches!(
            self,
            Self::Gesetzentwurf | Self::Beschlussempfehlung | Self::Antrag | Self::Aenderungsantrag
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DocumentType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.as_str().to_string()
    }
}

/// Classify a title by its leading type phrase.
pub fn classify_type(title: &str) -> Result<DocumentType, CoreError> {
    let caps = CLASSIFY
        .captures(title.trim())
        .ok_or_else(|| CoreError::TypeNotFound(title.to_string()))?;
    let matched = caps[1].to_lowercase();
    let rule = TYPE_RULES
        .iter()
        .find(|r| r.phrase.to_lowercase() == matched)
        .ok_or_else(|| CoreError::TypeNotFound(title.to_string()))?;
    Ok(DocumentType::from_tag(rule.tag))
}

/// Whether a line looks like the start of a Drucksache title.
pub fn is_title_start(text: &str) -> bool {
    TITLE_START.is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The canonical tag each phrase collapses to.
    fn canonical(phrase: &str) -> &str {
        if phrase.starts_with("Beschlussempfehlung") {
            "Beschlussempfehlung"
        } else if phrase.starts_with("Gesetzentwurf")
            || phrase.starts_with("Gesetzesentwurf")
            || phrase.starts_with("Entwurf eines")
        {
            "Gesetzentwurf"
        } else {
            phrase.split_whitespace().next().unwrap()
        }
    }

    #[test]
    fn rule_tags_follow_canonicalisation() {
        for r in TYPE_RULES {
            assert_eq!(r.tag, canonical(r.phrase), "rule {:?}", r.phrase);
        }
    }

    #[test]
    fn longer_phrases_precede_their_prefixes() {
        for (i, a) in TYPE_RULES.iter().enumerate() {
            for b in &TYPE_RULES[i + 1..] {
                assert!(
                    !b.phrase.starts_with(a.phrase),
                    "{:?} shadows {:?}",
                    a.phrase,
                    b.phrase
                );
            }
        }
    }

    #[test]
    fn classify_every_phrase() {
        for r in TYPE_RULES {
            let title = format!("{} der Fraktion", r.phrase);
            assert_eq!(classify_type(&title).unwrap().as_str(), r.tag);
        }
    }

    #[test]
    fn classify_recommendation_and_report() {
        let t = classify_type("Beschlussempfehlung und Bericht des Ausschusses für Inneres").unwrap();
        assert_eq!(t, DocumentType::Beschlussempfehlung);
    }

    #[test]
    fn classify_with_ordinal_prefix() {
        let t = classify_type("Zweite Beschlussempfehlung des Haushaltsausschusses").unwrap();
        assert_eq!(t, DocumentType::Beschlussempfehlung);
        let t = classify_type("Erster Gesetzentwurf zur Änderung").unwrap();
        assert_eq!(t, DocumentType::Gesetzentwurf);
    }

    #[test]
    fn classify_draft_of_a_law() {
        let t = classify_type("Entwurf eines Gesetzes zur Modernisierung").unwrap();
        assert_eq!(t, DocumentType::Gesetzentwurf);
    }

    #[test]
    fn classify_is_case_insensitive_and_trims() {
        let t = classify_type("   ANTRAG der Abgeordneten").unwrap();
        assert_eq!(t, DocumentType::Antrag);
        let t = classify_type("änderungsantrag der Fraktion").unwrap();
        assert_eq!(t, DocumentType::Aenderungsantrag);
    }

    #[test]
    fn classify_other_types_to_first_token() {
        let t = classify_type("Kleine Anfrage der Abgeordneten").unwrap();
        assert_eq!(t, DocumentType::Other("Kleine".into()));
        assert_eq!(t.as_str(), "Kleine");
    }

    #[test]
    fn classify_requires_phrase_at_start() {
        let err = classify_type("Deutscher Bundestag Antrag").unwrap_err();
        assert!(matches!(err, CoreError::TypeNotFound(_)));
    }

    #[test]
    fn classify_unrecognised_title_fails() {
        assert!(matches!(
            classify_type("Namentliche Abstimmung"),
            Err(CoreError::TypeNotFound(_))
        ));
    }

    #[test]
    fn title_start_detection() {
        assert!(is_title_start("Beschlussempfehlung und Bericht"));
        assert!(is_title_start("  Dritte Beschlussempfehlung"));
        assert!(is_title_start("Antrag"));
        assert!(!is_title_start("Deutscher Bundestag"));
        assert!(!is_title_start("Drucksache 20/100"));
    }

    #[test]
    fn tag_roundtrip() {
        for t in [
            DocumentType::Gesetzentwurf,
            DocumentType::Aenderungsantrag,
            DocumentType::Entschliessungsantrag,
            DocumentType::Unknown,
            DocumentType::Other("Antwort".into()),
        ] {
            assert_eq!(DocumentType::from_tag(t.as_str()), t);
        }
    }
}
