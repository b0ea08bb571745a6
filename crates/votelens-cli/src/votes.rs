//! Stage 3: expand entrypoints into the documents actually voted on and
//! extract their content.

use std::collections::HashMap;

use anyhow::Context as _;
use tracing::{error, info, warn};
use votelens_core::content::{self, MAX_CONTENT_CHARS};
use votelens_core::{
    DocumentType, EntrypointRecord, ExpandedVote, Extent, RecommendationEntry, VoteId,
    VoteRecord, classify_type,
};
use votelens_store::tables::{entrypoints_from_batches, recommendations_from_batches, votes_to_batch};
use votelens_store::{read_parquet, write_parquet};

use crate::context::{Context, StageStats};

pub async fn run(ctx: &Context) -> anyhow::Result<StageStats> {
    let output = ctx.paths.votes();
    if output.exists() && !ctx.force {
        info!(path = %output.display(), "votes table already exists, skipping");
        return Ok(StageStats::default());
    }

    let entrypoints = entrypoints_from_batches(
        &read_parquet(&ctx.paths.entrypoints()).context("reading entrypoints")?,
    )?;
    let entries = recommendations_from_batches(
        &read_parquet(&ctx.paths.recommendations()).context("reading recommendations")?,
    )?;
    let mut by_vote: HashMap<VoteId, Vec<RecommendationEntry>> = HashMap::new();
    for entry in entries {
        by_vote.entry(entry.vote_id.clone()).or_default().push(entry);
    }

    let resolved: Vec<&EntrypointRecord> = entrypoints
        .iter()
        .filter(|r| r.entrypoint_id.is_some())
        .collect();
    info!(votes = resolved.len(), "building votes table");

    let (resolved, by_vote) = (&resolved, &by_vote);
    let results = ctx
        .bounded(resolved.len(), move |i| {
            let record = resolved[i];
            let entries = by_vote.get(&record.vote_id).map_or(&[][..], Vec::as_slice);
            build_vote(ctx, record, entries)
        })
        .await;

    let mut stats = StageStats {
        items: resolved.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();
    for (i, result) in results {
        match result {
            Ok(found) => rows.extend(found),
            Err(e) => {
                stats.failed += 1;
                error!(vote_id = %resolved[i].vote_id, error = %format!("{e:#}"), "vote failed, skipping");
            }
        }
    }

    stats.rows = rows.len();
    write_parquet(&output, &votes_to_batch(&rows)?)?;
    Ok(stats)
}

/// Resolve a vote to the documents it decides on.
///
/// A recommendation with parsed entries expands into one row per underlying
/// proposal; anything else stays a single direct vote on the entrypoint.
pub async fn expand(
    ctx: &Context,
    record: &EntrypointRecord,
    entries: &[RecommendationEntry],
) -> anyhow::Result<Vec<ExpandedVote>> {
    let (Some(id), Some(title)) = (&record.entrypoint_id, &record.entrypoint_title) else {
        return Ok(Vec::new());
    };
    let entry_type = classify_type(title).unwrap_or(DocumentType::Unknown);
    if !entry_type.is_recommendation() || entries.is_empty() {
        return Ok(vec![ExpandedVote {
            vote_id: record.vote_id.clone(),
            doc_type: entry_type,
            document_id: id.clone(),
            document_title: title.clone(),
            recommendation: None,
        }]);
    }

    let mut expanded = Vec::with_capacity(entries.len());
    for entry in entries {
        let typed = async {
            let title = ctx.document_title(&entry.document_id).await?;
            let doc_type = classify_type(&title)?;
            anyhow::Ok((title, doc_type))
        };
        match typed.await {
            Ok((document_title, doc_type)) => expanded.push(ExpandedVote {
                vote_id: record.vote_id.clone(),
                doc_type,
                document_id: entry.document_id.clone(),
                document_title,
                recommendation: Some(entry.action),
            }),
            Err(e) => warn!(
                vote_id = %record.vote_id,
                document = %entry.document_id,
                error = %format!("{e:#}"),
                "skipping underlying document"
            ),
        }
    }
    Ok(expanded)
}

async fn build_vote(
    ctx: &Context,
    record: &EntrypointRecord,
    entries: &[RecommendationEntry],
) -> anyhow::Result<Vec<VoteRecord>> {
    let date = record.vote_id.date()?;
    let mut rows = Vec::new();
    for vote in expand(ctx, record, entries).await? {
        if !vote.doc_type.is_relevant() {
            info!(vote_id = %vote.vote_id, doc_type = %vote.doc_type, "type not relevant, dropping");
            continue;
        }
        let blocks = match ctx.document_blocks(&vote.document_id, Extent::WholeDocument).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(
                    vote_id = %vote.vote_id,
                    document = %vote.document_id,
                    error = %format!("{e:#}"),
                    "reading document failed, dropping"
                );
                continue;
            }
        };
        let Some(text) = content::extract(&vote.doc_type, &blocks) else {
            warn!(vote_id = %vote.vote_id, document = %vote.document_id, doc_type = %vote.doc_type, "no content found");
            continue;
        };
        if !content::within_budget(&text) {
            warn!(
                vote_id = %vote.vote_id,
                document = %vote.document_id,
                chars = text.chars().count(),
                max = MAX_CONTENT_CHARS,
                "content too long, dropping"
            );
            continue;
        }
        rows.push(VoteRecord {
            vote_id: vote.vote_id,
            date,
            doc_type: vote.doc_type,
            document_id: vote.document_id,
            document_title: vote.document_title,
            recommendation: vote.recommendation,
            content: text,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use votelens_ai::FixedOracle;
    use votelens_core::{Block, DocumentId, Recommendation};
    use votelens_fetch::Downloader;
    use votelens_store::{BlockSource, InMemorySource, StoreError};

    use crate::config::{Paths, document_key};

    /// Serves first pages normally but cannot read one document in full.
    struct TruncatedBody {
        inner: InMemorySource,
        broken: PathBuf,
    }

    impl BlockSource for TruncatedBody {
        fn pages(&self, path: &Path, extent: Extent) -> Result<Vec<Vec<Block>>, StoreError> {
            if extent == Extent::WholeDocument && path == self.broken {
                return Err(StoreError::Extraction("pdftotext exited with status 1".into()));
            }
            self.inner.pages(path, extent)
        }
    }

    fn motion(title: &str, body: &str) -> Vec<Vec<Block>> {
        vec![
            vec![
                Block::new(0, 0.0, "Deutscher Bundestag Drucksache 20/1"),
                Block::new(0, 12.0, "Antrag"),
                Block::new(0, 24.0, "der Fraktion der FDP"),
                Block::new(0, 36.0, title),
            ],
            vec![Block::new(1, 0.0, body), Block::new(1, 12.0, "Begründung")],
        ]
    }

    #[tokio::test]
    async fn unreadable_underlying_document_keeps_the_others() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(tmp.path());
        let good: DocumentId = "20/13001".parse().unwrap();
        let bad: DocumentId = "20/13002".parse().unwrap();
        let good_path = paths.document_cache().join(document_key(&good));
        let bad_path = paths.document_cache().join(document_key(&bad));
        fs::create_dir_all(paths.document_cache()).unwrap();
        fs::write(&good_path, b"%PDF-1.7").unwrap();
        fs::write(&bad_path, b"%PDF-1.7").unwrap();

        let source = TruncatedBody {
            inner: InMemorySource::new()
                .with_pages(&good_path, motion("Schulen stärken", "Mehr Lehrkräfte einstellen."))
                .with_pages(&bad_path, motion("Brücken sanieren", "Brücken prüfen.")),
            broken: bad_path,
        };
        let downloader = Downloader::new(Duration::from_secs(1))
            .unwrap()
            .with_delay(Duration::ZERO);
        let ctx = Context::new(paths, Arc::new(source), downloader, Arc::new(FixedOracle::new(0)), 2);

        let vote_id: VoteId = "20250129".parse().unwrap();
        let record = EntrypointRecord {
            vote_id: vote_id.clone(),
            title: "Beschlussempfehlung des Ausschusses für Verkehr".into(),
            doc_type: DocumentType::Beschlussempfehlung,
            entrypoint_id: Some("20/14000".parse().unwrap()),
            entrypoint_title: Some("Beschlussempfehlung und Bericht des Ausschusses für Verkehr".into()),
        };
        let entries = [good.clone(), bad]
            .map(|document_id| RecommendationEntry {
                vote_id: vote_id.clone(),
                document_id,
                action: Recommendation::Reject,
            });

        let rows = build_vote(&ctx, &record, &entries).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].document_id, good);
        assert!(rows[0].document_title.ends_with("Schulen stärken"));
        assert!(rows[0].content.contains("Mehr Lehrkräfte einstellen."));
    }
}
