//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use votelens_core::{DocumentId, VoteId, VoteSource};

/// Which disambiguation oracle the entrypoint resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OracleKind {
    /// Always the first candidate.
    First,
    /// Most title words shared with the vote title.
    Overlap,
    /// OpenAI-compatible chat-completions endpoint.
    Llm,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Root of the data directory
    #[arg(long, env = "VOTELENS_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Number of votes processed concurrently
    #[arg(
        short = 'j',
        long,
        env = "VOTELENS_WORKERS",
        default_value_t = 8,
        value_parser = clap::value_parser!(u16).range(1..=16),
        global = true
    )]
    pub workers: u16,

    /// Disambiguation oracle for votes with several candidate documents
    #[arg(long, env = "VOTELENS_ORACLE", value_enum, default_value_t = OracleKind::Overlap, global = true)]
    pub oracle: OracleKind,

    /// Base URL of the chat-completions API
    #[arg(long, env = "VOTELENS_LLM_URL", default_value = "https://api.openai.com/v1", global = true)]
    pub llm_url: String,

    /// Model name sent to the chat-completions API
    #[arg(long, env = "VOTELENS_LLM_MODEL", default_value = "gpt-4o-mini", global = true)]
    pub llm_model: String,

    /// Bearer token for the chat-completions API
    #[arg(long, env = "VOTELENS_LLM_API_KEY", hide_env_values = true, global = true)]
    pub llm_api_key: Option<String>,

    /// Path to poppler's pdftotext
    #[arg(long, env = "VOTELENS_PDFTOTEXT", default_value = "pdftotext", global = true)]
    pub pdftotext: PathBuf,

    /// Timeout for HTTP and LLM requests, in seconds
    #[arg(long, env = "VOTELENS_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    /// Pause after each download, in milliseconds
    #[arg(long, env = "VOTELENS_DOWNLOAD_DELAY_MS", default_value_t = 500, global = true)]
    pub download_delay_ms: u64,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

/// On-disk layout under the data directory.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `pdf_url,xls_url` list of votes to process.
    pub fn vote_sources(&self) -> PathBuf {
        self.root.join("votes").join("urls.csv")
    }

    /// Cache directory for ballot sheets and spreadsheets, one folder per vote.
    pub fn vote_cache(&self) -> PathBuf {
        self.root.join("votes").join("all")
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.root.join("votes").join("results")
    }

    pub fn document_cache(&self) -> PathBuf {
        self.root.join("drucksachen")
    }

    pub fn entrypoints(&self) -> PathBuf {
        self.root.join("votes").join("entrypoints.parquet")
    }

    pub fn recommendations(&self) -> PathBuf {
        self.root.join("votes").join("recommendations.parquet")
    }

    pub fn votes(&self) -> PathBuf {
        self.root.join("output").join("votes.parquet")
    }

    pub fn outcomes(&self) -> PathBuf {
        self.root.join("output").join("outcomes.parquet")
    }
}

/// Cache key of a vote's ballot sheet PDF.
pub fn ballot_pdf_key(vote_id: &VoteId) -> String {
    format!("{vote_id}/result.pdf")
}

/// Cache key of a vote's member spreadsheet.
pub fn ballot_sheet_key(source: &VoteSource) -> String {
    format!("{}/result.{}", source.vote_id, source.xls_extension())
}

/// Cache key of a Drucksache.
pub fn document_key(id: &DocumentId) -> String {
    id.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn layout_under_data_dir() {
        let paths = Paths::new("/data");
        assert_eq!(paths.vote_sources(), PathBuf::from("/data/votes/urls.csv"));
        assert_eq!(paths.ledger_dir(), PathBuf::from("/data/votes/results"));
        assert_eq!(paths.votes(), PathBuf::from("/data/output/votes.parquet"));
        assert_eq!(paths.document_cache(), PathBuf::from("/data/drucksachen"));
    }

    #[test]
    fn cache_keys() {
        let src = VoteSource::from_urls(
            "https://x.de/a.pdf".into(),
            "https://x.de/20250129_2_xls-data.xls".into(),
        )
        .unwrap();
        assert_eq!(ballot_pdf_key(&src.vote_id), "20250129_2/result.pdf");
        assert_eq!(ballot_sheet_key(&src), "20250129_2/result.xls");
        assert_eq!(document_key(&"20/15096".parse().unwrap()), "20_15096.pdf");
    }

    #[test]
    fn defaults_and_worker_bounds() {
        let cli = TestCli::try_parse_from(["votelens"]).unwrap();
        assert_eq!(cli.settings.workers, 8);
        assert_eq!(cli.settings.oracle, OracleKind::Overlap);
        assert_eq!(cli.settings.download_delay(), Duration::from_millis(500));

        assert!(TestCli::try_parse_from(["votelens", "--workers", "16"]).is_ok());
        assert!(TestCli::try_parse_from(["votelens", "--workers", "0"]).is_err());
        assert!(TestCli::try_parse_from(["votelens", "--workers", "17"]).is_err());
    }
}
