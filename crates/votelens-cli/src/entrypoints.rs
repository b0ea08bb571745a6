//! Stage 1: fetch each vote, record its ballots and resolve its entrypoint.

use anyhow::Context as _;
use tracing::{error, info, warn};
use votelens_ai::CandidateDocument;
use votelens_core::{
    EntrypointRecord, VoteSource, classify_type, extract_document_ids, locate_title,
};
use votelens_store::tables::{entrypoints_to_batch, read_vote_sources};
use votelens_store::write_parquet;

use crate::context::{Context, StageStats};

pub async fn run(ctx: &Context) -> anyhow::Result<StageStats> {
    let output = ctx.paths.entrypoints();
    if output.exists() && !ctx.force {
        info!(path = %output.display(), "entrypoints already exist, skipping");
        return Ok(StageStats::default());
    }

    let sources = read_vote_sources(&ctx.paths.vote_sources()).context("reading vote list")?;
    info!(votes = sources.len(), "resolving entrypoints");

    let sources = &sources;
    let results = ctx.bounded(sources.len(), move |i| process_vote(ctx, &sources[i])).await;

    let mut stats = StageStats {
        items: sources.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(results.len());
    for (i, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                stats.failed += 1;
                error!(vote_id = %sources[i].vote_id, error = %format!("{e:#}"), "vote failed, skipping");
            }
        }
    }

    stats.rows = records.len();
    write_parquet(&output, &entrypoints_to_batch(&records)?)?;
    Ok(stats)
}

/// Fetch a vote's files, record its ballots and pick the document it decides on.
pub async fn process_vote(ctx: &Context, source: &VoteSource) -> anyhow::Result<EntrypointRecord> {
    let vote_id = &source.vote_id;
    let pdf = ctx.fetch_ballot_pdf(source).await?;
    let sheet = ctx.fetch_ballot_sheet(source).await?;
    ctx.record_ballot(vote_id, sheet).await?;

    let first_page = ctx.ballot_blocks(source, pdf).await?;
    let title = locate_title(&first_page).with_context(|| format!("title of vote {vote_id}"))?;
    let doc_type = classify_type(&title).with_context(|| format!("type of vote {vote_id}"))?;

    let text = first_page
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let mut candidates = Vec::new();
    for id in extract_document_ids(&text) {
        match ctx.document_title(&id).await {
            Ok(title) => candidates.push(CandidateDocument { id, title }),
            Err(e) => warn!(vote_id = %vote_id, document = %id, error = %format!("{e:#}"), "skipping candidate"),
        }
    }
    if candidates.is_empty() {
        warn!(vote_id = %vote_id, "vote references no resolvable documents");
    }

    let entrypoint = ctx
        .resolver
        .resolve(&title, &doc_type, &candidates)
        .await
        .with_context(|| format!("resolving entrypoint of vote {vote_id}"))?;

    Ok(EntrypointRecord {
        vote_id: vote_id.clone(),
        title,
        doc_type,
        entrypoint_id: entrypoint.as_ref().map(|e| e.id.clone()),
        entrypoint_title: entrypoint.map(|e| e.title),
    })
}
