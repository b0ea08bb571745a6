//! Stage 4: per-party decisions, mirrored onto the underlying proposals.

use std::collections::HashMap;

use anyhow::Context as _;
use tracing::{info, warn};
use votelens_core::{OutcomeRecord, PartyTally, VoteRecord, compute_majority, mirror};
use votelens_store::tables::{outcomes_to_batch, votes_from_batches};
use votelens_store::{PartyLedger, read_parquet, write_parquet};

use crate::context::{Context, StageStats};

pub async fn run(ctx: &Context) -> anyhow::Result<StageStats> {
    let output = ctx.paths.outcomes();
    if output.exists() && !ctx.force {
        info!(path = %output.display(), "outcomes already exist, skipping");
        return Ok(StageStats::default());
    }

    let votes = votes_from_batches(&read_parquet(&ctx.paths.votes()).context("reading votes table")?)?;
    let records = derive_outcomes(&votes, &ctx.ledger)?;

    let stats = StageStats {
        items: votes.len(),
        failed: 0,
        rows: records.len(),
    };
    write_parquet(&output, &outcomes_to_batch(&records)?)?;
    Ok(stats)
}

/// Join votes with the party ledgers and apply mirroring.
///
/// Parties without a ledger row for a vote are left out of that vote.
pub fn derive_outcomes(
    votes: &[VoteRecord],
    ledger: &PartyLedger,
) -> anyhow::Result<Vec<OutcomeRecord>> {
    let mut tallies: Vec<(String, HashMap<String, PartyTally>)> = Vec::new();
    for party in ledger.parties()? {
        let rows = ledger.read(&party).with_context(|| format!("reading ledger of {party}"))?;
        let by_vote = rows
            .into_iter()
            .map(|t| (t.vote_id.as_str().to_string(), t))
            .collect();
        tallies.push((party, by_vote));
    }
    if tallies.is_empty() {
        warn!(dir = %ledger.dir().display(), "no party ledgers found");
    }

    let mut out = Vec::new();
    for vote in votes {
        for (party, by_vote) in &tallies {
            let Some(tally) = by_vote.get(vote.vote_id.as_str()) else {
                continue;
            };
            let decision = compute_majority(tally);
            out.push(OutcomeRecord {
                vote_id: vote.vote_id.clone(),
                document_id: vote.document_id.clone(),
                party: party.clone(),
                decision,
                recommendation: vote.recommendation,
                mirrored_decision: mirror(decision, vote.recommendation),
            });
        }
    }
    Ok(out)
}
