//! Row types of the persisted tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Decision, DocumentId, DocumentType, Recommendation, VoteId};

/// Download locations of one vote's ballot sheet (PDF) and member ballots (XLS/XLSX).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSource {
    pub vote_id: VoteId,
    pub pdf_url: String,
    pub xls_url: String,
}

impl VoteSource {
    /// Build a source, deriving the vote id from the spreadsheet file name.
    pub fn from_urls(pdf_url: String, xls_url: String) -> Result<Self, crate::CoreError> {
        let vote_id = VoteId::from_filename(&xls_url)?;
        Ok(Self {
            vote_id,
            pdf_url,
            xls_url,
        })
    }

    /// Extension of the spreadsheet, defaulting to `xlsx`.
    pub fn xls_extension(&self) -> &str {
        self.xls_url
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map_or("xlsx", |(_, ext)| ext)
    }
}

/// The resolved entrypoint of a vote.
///
/// Entrypoint fields are `None` when the ballot sheet references no
/// resolvable documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrypointRecord {
    pub vote_id: VoteId,
    pub title: String,
    pub doc_type: DocumentType,
    pub entrypoint_id: Option<DocumentId>,
    pub entrypoint_title: Option<String>,
}

/// A vote resolved down to the document it actually decides on.
///
/// For recommendation entrypoints there is one row per underlying proposal,
/// carrying the recommended action; direct votes have no recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedVote {
    pub vote_id: VoteId,
    pub doc_type: DocumentType,
    pub document_id: DocumentId,
    pub document_title: String,
    pub recommendation: Option<Recommendation>,
}

/// Final per-document vote row with extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub vote_id: VoteId,
    pub date: NaiveDate,
    pub doc_type: DocumentType,
    pub document_id: DocumentId,
    pub document_title: String,
    pub recommendation: Option<Recommendation>,
    pub content: String,
}

/// A party's decision on a vote, before and after mirroring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub vote_id: VoteId,
    pub document_id: DocumentId,
    pub party: String,
    pub decision: Decision,
    pub recommendation: Option<Recommendation>,
    pub mirrored_decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_source_from_urls() {
        let src = VoteSource::from_urls(
            "https://www.bundestag.de/resource/blob/1/20250129_3.pdf".into(),
            "https://www.bundestag.de/resource/blob/2/20250129_3_xls-data.xls".into(),
        )
        .unwrap();
        assert_eq!(src.vote_id.as_str(), "20250129_3");
        assert_eq!(src.xls_extension(), "xls");
    }

    #[test]
    fn xls_extension_defaults() {
        let src = VoteSource {
            vote_id: "20250129".parse().unwrap(),
            pdf_url: String::new(),
            xls_url: "https://x.de/download/20250129".into(),
        };
        assert_eq!(src.xls_extension(), "xlsx");
    }

    #[test]
    fn entrypoint_json_roundtrip_with_nulls() {
        let rec = EntrypointRecord {
            vote_id: "20250129".parse().unwrap(),
            title: "Antrag der Fraktion".into(),
            doc_type: DocumentType::Antrag,
            entrypoint_id: None,
            entrypoint_title: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"entrypoint_id\":null"));
        let parsed: EntrypointRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
    }
}
