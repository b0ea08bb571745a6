//! Shared services for the pipeline stages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use futures::stream::{self, StreamExt};
use tracing::error;
use votelens_ai::{EntrypointResolver, FirstCandidate, LlmOracle, Oracle, TitleOverlap};
use votelens_core::{Block, DocumentId, Extent, VoteId, VoteSource, locate_title};
use votelens_fetch::{Downloader, Validator};
use votelens_store::ballot::read_ballots;
use votelens_store::{BlockSource, DiskCache, DocumentCache, PartyLedger, PdfToText, StoreError};

use crate::config::{OracleKind, Paths, Settings, ballot_pdf_key, ballot_sheet_key, document_key};

/// Counters reported after each stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub items: usize,
    pub failed: usize,
    pub rows: usize,
}

pub struct Context {
    pub paths: Paths,
    pub workers: usize,
    pub force: bool,
    pub resolver: EntrypointResolver,
    pub ledger: Arc<PartyLedger>,
    blocks: Arc<dyn BlockSource>,
    downloader: Downloader,
    vote_cache: Arc<dyn DocumentCache>,
    document_cache: Arc<dyn DocumentCache>,
}

impl Context {
    pub fn new(
        paths: Paths,
        blocks: Arc<dyn BlockSource>,
        downloader: Downloader,
        oracle: Arc<dyn Oracle>,
        workers: usize,
    ) -> Self {
        Self {
            vote_cache: Arc::new(DiskCache::new(paths.vote_cache())),
            document_cache: Arc::new(DiskCache::new(paths.document_cache())),
            ledger: Arc::new(PartyLedger::new(paths.ledger_dir())),
            resolver: EntrypointResolver::new(oracle),
            workers: workers.clamp(1, 16),
            force: false,
            paths,
            blocks,
            downloader,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let oracle: Arc<dyn Oracle> = match settings.oracle {
            OracleKind::First => Arc::new(FirstCandidate),
            OracleKind::Overlap => Arc::new(TitleOverlap),
            OracleKind::Llm => Arc::new(
                LlmOracle::new(
                    &settings.llm_url,
                    &settings.llm_model,
                    settings.llm_api_key.clone(),
                    settings.timeout(),
                )
                .context("building LLM oracle")?,
            ),
        };
        let downloader = Downloader::new(settings.timeout())
            .context("building HTTP client")?
            .with_delay(settings.download_delay());
        Ok(Self::new(
            Paths::new(&settings.data_dir),
            Arc::new(PdfToText::new(&settings.pdftotext)),
            downloader,
            oracle,
            usize::from(settings.workers),
        ))
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Run `f` for indices `0..len` with at most `workers` in flight.
    ///
    /// Results come back in index order.
    pub async fn bounded<R, F, Fut>(&self, len: usize, f: F) -> Vec<(usize, anyhow::Result<R>)>
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let mut results: Vec<_> = stream::iter(0..len)
            .map(|i| {
                let fut = f(i);
                async move { (i, fut.await) }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);
        results
    }

    fn pdf_validator(&self) -> Validator {
        let blocks = self.blocks.clone();
        Arc::new(move |path: &Path| blocks.validate(path))
    }

    pub async fn fetch_ballot_pdf(&self, source: &VoteSource) -> anyhow::Result<PathBuf> {
        let path = self
            .downloader
            .ensure_fetched(
                &source.pdf_url,
                &ballot_pdf_key(&source.vote_id),
                self.vote_cache.as_ref(),
                self.pdf_validator(),
            )
            .await
            .with_context(|| format!("fetching ballot sheet of vote {}", source.vote_id))?;
        Ok(path)
    }

    pub async fn fetch_ballot_sheet(&self, source: &VoteSource) -> anyhow::Result<PathBuf> {
        let validate: Validator = Arc::new(|path: &Path| read_ballots(path).map(|_| ()));
        let path = self
            .downloader
            .ensure_fetched(
                &source.xls_url,
                &ballot_sheet_key(source),
                self.vote_cache.as_ref(),
                validate,
            )
            .await
            .with_context(|| format!("fetching ballots of vote {}", source.vote_id))?;
        Ok(path)
    }

    pub async fn fetch_document(&self, id: &DocumentId) -> anyhow::Result<PathBuf> {
        let path = self
            .downloader
            .ensure_fetched(
                &id.url(),
                &document_key(id),
                self.document_cache.as_ref(),
                self.pdf_validator(),
            )
            .await
            .with_context(|| format!("fetching Drucksache {id}"))?;
        Ok(path)
    }

    /// Layout blocks of a file, read off the async runtime.
    pub async fn read_blocks(&self, path: PathBuf, extent: Extent) -> Result<Vec<Block>, StoreError> {
        let blocks = self.blocks.clone();
        tokio::task::spawn_blocking(move || blocks.blocks(&path, extent))
            .await
            .map_err(|e| StoreError::Extraction(format!("extraction task failed: {e}")))?
    }

    /// Blocks of a cached file; a corrupt copy is evicted so the next run refetches it.
    async fn cached_blocks(
        &self,
        cache: &dyn DocumentCache,
        key: &str,
        path: PathBuf,
        extent: Extent,
    ) -> anyhow::Result<Vec<Block>> {
        match self.read_blocks(path, extent).await {
            Ok(blocks) => Ok(blocks),
            Err(e @ StoreError::CorruptDocument { .. }) => {
                error!(key, error = %e, "cached document is corrupt, evicting");
                cache.invalidate(key)?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First-page blocks of a vote's ballot PDF.
    pub async fn ballot_blocks(&self, source: &VoteSource, pdf: PathBuf) -> anyhow::Result<Vec<Block>> {
        self.cached_blocks(
            self.vote_cache.as_ref(),
            &ballot_pdf_key(&source.vote_id),
            pdf,
            Extent::FirstPage,
        )
        .await
    }

    /// Blocks of a Drucksache.
    pub async fn document_blocks(&self, id: &DocumentId, extent: Extent) -> anyhow::Result<Vec<Block>> {
        let path = self.fetch_document(id).await?;
        self.cached_blocks(self.document_cache.as_ref(), &document_key(id), path, extent)
            .await
    }

    pub async fn document_title(&self, id: &DocumentId) -> anyhow::Result<String> {
        let blocks = self.document_blocks(id, Extent::FirstPage).await?;
        let title = locate_title(&blocks).with_context(|| format!("title of Drucksache {id}"))?;
        Ok(title)
    }

    /// Tally a vote's spreadsheet into the party ledgers.
    pub async fn record_ballot(&self, vote_id: &VoteId, sheet: PathBuf) -> anyhow::Result<usize> {
        let ledger = self.ledger.clone();
        let vote_id = vote_id.clone();
        let written = tokio::task::spawn_blocking(move || ledger.record_ballot(&vote_id, &sheet))
            .await
            .context("ledger task failed")??;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use votelens_ai::FixedOracle;
    use votelens_store::InMemorySource;

    #[tokio::test]
    async fn corrupt_ballot_pdf_is_evicted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(tmp.path());
        let source = VoteSource {
            vote_id: "20250129".parse().unwrap(),
            pdf_url: "http://127.0.0.1:9/20250129.pdf".into(),
            xls_url: "http://127.0.0.1:9/20250129_xls-data.csv".into(),
        };
        let pdf = paths.vote_cache().join(ballot_pdf_key(&source.vote_id));
        fs::create_dir_all(pdf.parent().unwrap()).unwrap();
        fs::write(&pdf, b"<html>maintenance</html>").unwrap();

        // Registered without pages: reading it reports a corrupt document.
        let blocks = InMemorySource::new().with_pages(&pdf, Vec::new());
        let downloader = Downloader::new(Duration::from_secs(1))
            .unwrap()
            .with_delay(Duration::ZERO);
        let ctx = Context::new(paths, Arc::new(blocks), downloader, Arc::new(FixedOracle::new(0)), 1);

        let err = ctx.ballot_blocks(&source, pdf.clone()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptDocument { .. })
        ));
        assert!(!pdf.exists());
    }
}
