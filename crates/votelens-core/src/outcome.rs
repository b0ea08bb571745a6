//! Per-party vote tallies, majority decisions and outcome mirroring.
//!
//! Voting "yes" on a recommendation to reject a proposal is a vote against
//! the proposal itself. When the resolved recommendation is
//! [`Recommendation::Reject`], [`mirror`] swaps adopt and reject so that the
//! decision always refers to the underlying proposal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Recommendation, VoteId};

/// Faction labels seen in ballot spreadsheets and their canonical party keys.
pub const PARTY_LABELS: &[(&str, &str)] = &[
    ("CDU/CSU", "Union"),
    ("SPD", "SPD"),
    ("BÜ90/GR", "DIE_GRÜNEN"),
    ("BÜNDNIS`90/DIE GRÜNEN", "DIE_GRÜNEN"),
    ("BÜNDNIS 90/DIE GRÜNEN", "DIE_GRÜNEN"),
    ("FDP", "FDP"),
    ("AfD", "AfD"),
    ("DIE LINKE.", "DIE_LINKE"),
    ("DIE LINKE", "DIE_LINKE"),
    ("Die Linke", "DIE_LINKE"),
    ("Fraktionslos", "Fraktionslos"),
    ("fraktionslose", "Fraktionslos"),
    ("fraktionslos", "Fraktionslos"),
    ("BSW", "BSW"),
];

/// Map a raw faction label to its canonical party key.
pub fn canonical_party(label: &str) -> Option<&'static str> {
    let label = label.trim();
    PARTY_LABELS
        .iter()
        .find(|(raw, _)| *raw == label)
        .map(|(_, key)| *key)
}

/// Outcome of a vote from one party's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Adopt,
    Reject,
    Abstain,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::Reject => "reject",
            Self::Abstain => "abstain",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "adopt" => Some(Self::Adopt),
            "reject" => Some(Self::Reject),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member's ballot as read from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotRow {
    pub faction: String,
    pub adopt: u32,
    pub reject: u32,
    pub abstain: u32,
}

/// Adopt/reject/abstain counts of one party on one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyTally {
    pub party: String,
    pub vote_id: VoteId,
    pub adopt: u64,
    pub reject: u64,
    pub abstain: u64,
}

/// Group member ballots by canonical party and sum their counts.
///
/// Rows with an unknown faction label are dropped with a warning. The result
/// is ordered by party key.
pub fn tally_ballots(vote_id: &VoteId, rows: &[BallotRow]) -> Vec<PartyTally> {
    let mut by_party: BTreeMap<&'static str, (u64, u64, u64)> = BTreeMap::new();
    let mut unknown: BTreeSet<&str> = BTreeSet::new();

    for row in rows {
        let Some(party) = canonical_party(&row.faction) else {
            unknown.insert(row.faction.as_str());
            continue;
        };
        let counts = by_party.entry(party).or_default();
        counts.0 += u64::from(row.adopt);
        counts.1 += u64::from(row.reject);
        counts.2 += u64::from(row.abstain);
    }

    for label in unknown {
        warn!(vote_id = %vote_id, label, "dropping ballots with unknown faction label");
    }

    by_party
        .into_iter()
        .map(|(party, (adopt, reject, abstain))| PartyTally {
            party: party.to_string(),
            vote_id: vote_id.clone(),
            adopt,
            reject,
            abstain,
        })
        .collect()
}

/// The decision with the largest count.
///
/// Ties resolve in the order adopt, reject, abstain.
pub fn compute_majority(tally: &PartyTally) -> Decision {
    let mut best = (Decision::Adopt, tally.adopt);
    for candidate in [(Decision::Reject, tally.reject), (Decision::Abstain, tally.abstain)] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    best.0
}

/// Re-express a decision relative to the underlying proposal.
pub fn mirror(decision: Decision, recommendation: Option<Recommendation>) -> Decision {
    match (recommendation, decision) {
        (Some(Recommendation::Reject), Decision::Adopt) => Decision::Reject,
        (Some(Recommendation::Reject), Decision::Reject) => Decision::Adopt,
        _ => decision,
    }
}
