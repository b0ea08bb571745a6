//! Identifiers for votes and Drucksachen.
//!
//! A Drucksache is addressed as `<period>/<serial>` (e.g. `20/15096`). A vote
//! is addressed by the date stamp embedded in its ballot-sheet filename,
//! `YYYYMMDD` or `YYYYMMDD_n` when several votes happened on one day.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

const DSERVER_BASE: &str = "https://dserver.bundestag.de/btd";

static DOCUMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)$").unwrap());

static REFERENCED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}/\d+\b").unwrap());

static VOTE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8})(?:_(\d+))?").unwrap());

/// Identifier of a Drucksache, `<period>/<serial>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId {
    period: String,
    serial: String,
}

impl DocumentId {
    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Serial number left-padded with zeroes to at least five digits.
    pub fn padded_serial(&self) -> String {
        format!("{:0>5}", self.serial)
    }

    /// Download URL on the Bundestag document server.
    ///
    /// `20/153` → `https://dserver.bundestag.de/btd/20/001/2000153.pdf`
    pub fn url(&self) -> String {
        let padded = self.padded_serial();
        format!(
            "{DSERVER_BASE}/{period}/{bucket}/{period}{padded}.pdf",
            period = self.period,
            bucket = &padded[..3],
        )
    }

    /// Cache file name, `<period>_<serial>.pdf`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.pdf", self.period, self.serial)
    }
}

impl FromStr for DocumentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = DOCUMENT_ID
            .captures(s.trim())
            .ok_or_else(|| CoreError::InvalidDocumentId(s.to_string()))?;
        Ok(Self {
            period: caps[1].to_string(),
            serial: caps[2].to_string(),
        })
    }
}

impl TryFrom<String> for DocumentId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.period, self.serial)
    }
}

/// Collect the distinct Drucksache ids mentioned in a text, in order of first appearance.
pub fn extract_document_ids(text: &str) -> Vec<DocumentId> {
    let mut ids: Vec<DocumentId> = Vec::new();
    for m in REFERENCED_ID.find_iter(text) {
        if let Ok(id) = m.as_str().parse::<DocumentId>()
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

/// Identifier of a roll-call vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoteId(String);

impl VoteId {
    /// Derive the vote id from a ballot-sheet file name or URL.
    ///
    /// `.../20250129_3_xls-data.xlsx` → `20250129_3`, `.../20250129_xls.xlsx` → `20250129`.
    pub fn from_filename(name: &str) -> Result<Self, CoreError> {
        let file = name.rsplit('/').next().unwrap_or(name);
        let caps = VOTE_STAMP
            .captures(file)
            .ok_or_else(|| CoreError::InvalidVoteId(name.to_string()))?;
        let id = match caps.get(2) {
            Some(n) => format!("{}_{}", &caps[1], n.as_str()),
            None => caps[1].to_string(),
        };
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date of the vote, taken from the leading `YYYYMMDD`.
    pub fn date(&self) -> Result<NaiveDate, CoreError> {
        let stamp = self.0.split('_').next().unwrap_or_default();
        NaiveDate::parse_from_str(stamp, "%Y%m%d")
            .map_err(|_| CoreError::InvalidVoteId(self.0.clone()))
    }
}

impl FromStr for VoteId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = VOTE_STAMP
            .find(s)
            .is_some_and(|m| m.start() == 0 && m.end() == s.len());
        if !valid {
            return Err(CoreError::InvalidVoteId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for VoteId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VoteId> for String {
    fn from(id: VoteId) -> Self {
        id.0
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
