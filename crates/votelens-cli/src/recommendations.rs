//! Stage 2: parse the recommendation documents that votes resolved to.

use anyhow::Context as _;
use tracing::{error, info};
use votelens_core::{EntrypointRecord, Extent, RecommendationEntry, classify_type, recommendation};
use votelens_store::tables::{entrypoints_from_batches, recommendations_to_batch};
use votelens_store::{read_parquet, write_parquet};

use crate::context::{Context, StageStats};

/// Whether the entrypoint document is a Beschlussempfehlung.
fn resolves_to_recommendation(record: &EntrypointRecord) -> bool {
    record
        .entrypoint_title
        .as_deref()
        .and_then(|t| classify_type(t).ok())
        .is_some_and(|t| t.is_recommendation())
}

pub async fn run(ctx: &Context) -> anyhow::Result<StageStats> {
    let output = ctx.paths.recommendations();
    if output.exists() && !ctx.force {
        info!(path = %output.display(), "recommendations already exist, skipping");
        return Ok(StageStats::default());
    }

    let entrypoints = entrypoints_from_batches(
        &read_parquet(&ctx.paths.entrypoints()).context("reading entrypoints")?,
    )?;
    let targets: Vec<&EntrypointRecord> = entrypoints
        .iter()
        .filter(|r| resolves_to_recommendation(r))
        .collect();
    info!(documents = targets.len(), "parsing recommendation documents");

    let targets = &targets;
    let results = ctx.bounded(targets.len(), move |i| parse_entrypoint(ctx, targets[i])).await;

    let mut stats = StageStats {
        items: targets.len(),
        ..Default::default()
    };
    let mut entries = Vec::new();
    for (i, result) in results {
        match result {
            Ok(found) => entries.extend(found),
            Err(e) => {
                stats.failed += 1;
                error!(vote_id = %targets[i].vote_id, error = %format!("{e:#}"), "recommendation failed, skipping");
            }
        }
    }

    stats.rows = entries.len();
    write_parquet(&output, &recommendations_to_batch(&entries)?)?;
    Ok(stats)
}

async fn parse_entrypoint(
    ctx: &Context,
    record: &EntrypointRecord,
) -> anyhow::Result<Vec<RecommendationEntry>> {
    let Some(id) = &record.entrypoint_id else {
        return Ok(Vec::new());
    };
    let blocks = ctx.document_blocks(id, Extent::WholeDocument).await?;
    Ok(recommendation::parse(&record.vote_id, id, &blocks))
}
