//! Text and layout-block access to downloaded PDFs.
//!
//! [`BlockSource`] is the seam between the parsing rules and the PDF
//! toolchain. [`PdfToText`] reads documents through poppler's
//! `pdftotext -bbox-layout`; [`InMemorySource`] serves prepared pages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use votelens_core::block::collapse_whitespace;
use votelens_core::{Block, Extent};

use crate::StoreError;

static PAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<page\b[^>]*>(.*?)</page>").unwrap());

static BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<block\b[^>]*\byMin="([-+0-9.eE]+)"[^>]*>(.*?)</block>"#).unwrap()
});

static LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<line\b[^>]*>(.*?)</line>").unwrap());

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<word\b[^>]*>([^<]*)</word>").unwrap());

/// Page-wise access to the layout blocks of a document.
pub trait BlockSource: Send + Sync {
    /// Blocks of each page, pages in document order.
    ///
    /// Blocks within a page need not be sorted.
    fn pages(&self, path: &Path, extent: Extent) -> Result<Vec<Vec<Block>>, StoreError>;

    /// Blocks in reading order: pages in order, each page sorted top to bottom.
    ///
    /// A document without pages is reported as corrupt.
    fn blocks(&self, path: &Path, extent: Extent) -> Result<Vec<Block>, StoreError> {
        let pages = self.pages(path, extent)?;
        if pages.is_empty() {
            return Err(StoreError::corrupt(path, "document has no pages"));
        }
        let mut out = Vec::new();
        for mut page in pages {
            page.sort_by(|a, b| a.y.total_cmp(&b.y));
            out.extend(page);
        }
        Ok(out)
    }

    /// Plain text of the document.
    ///
    /// Whole-document text has every whitespace run collapsed to one space.
    fn text(&self, path: &Path, extent: Extent) -> Result<String, StoreError> {
        let joined = self
            .blocks(path, extent)?
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(match extent {
            Extent::WholeDocument => collapse_whitespace(&joined),
            Extent::FirstPage => joined,
        })
    }

    /// Check that a file can be read as a document with at least one page.
    fn validate(&self, path: &Path) -> Result<(), StoreError> {
        self.blocks(path, Extent::FirstPage).map(|_| ())
    }
}

/// Reads PDFs with poppler's `pdftotext -bbox-layout`.
#[derive(Debug, Clone)]
pub struct PdfToText {
    binary: PathBuf,
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl PdfToText {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl BlockSource for PdfToText {
    fn pages(&self, path: &Path, extent: Extent) -> Result<Vec<Vec<Block>>, StoreError> {
        if !path.exists() {
            return Err(StoreError::InputNotFound(path.to_path_buf()));
        }
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-q").arg("-bbox-layout");
        if extent == Extent::FirstPage {
            cmd.args(["-f", "1", "-l", "1"]);
        }
        cmd.arg(path).arg("-");

        let output = cmd.output().map_err(|e| {
            StoreError::Extraction(format!("failed to invoke {}: {e}", self.binary.display()))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::corrupt(
                path,
                format!("{} exited with {}: {}", self.binary.display(), output.status, stderr.trim()),
            ));
        }

        let pages = parse_bbox_layout(&String::from_utf8_lossy(&output.stdout));
        debug!(path = %path.display(), pages = pages.len(), "extracted layout blocks");
        Ok(pages)
    }
}

/// Parse `pdftotext -bbox-layout` XHTML into per-page blocks.
///
/// Words of a line are joined by spaces, lines of a block by newlines.
pub fn parse_bbox_layout(xhtml: &str) -> Vec<Vec<Block>> {
    PAGE_REGEX
        .captures_iter(xhtml)
        .enumerate()
        .map(|(page_idx, page)| {
            BLOCK_REGEX
                .captures_iter(&page[1])
                .map(|block| {
                    let y = block[1].parse::<f32>().unwrap_or(0.0);
                    let text = LINE_REGEX
                        .captures_iter(&block[2])
                        .map(|line| {
                            WORD_REGEX
                                .captures_iter(&line[1])
                                .map(|w| unescape(&w[1]))
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    Block::new(page_idx, y, text)
                })
                .collect()
        })
        .collect()
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Serves prepared pages keyed by path.
///
/// Used where documents are already laid out, and as a test double for the
/// PDF toolchain.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: HashMap<PathBuf, Vec<Vec<Block>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document given the texts of its blocks, page by page.
    ///
    /// Blocks receive increasing `y` positions in the given order.
    pub fn with_document(mut self, path: impl Into<PathBuf>, pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(p, texts)| {
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| Block::new(p, i as f32 * 12.0, *t))
                    .collect()
            })
            .collect();
        self.documents.insert(path.into(), pages);
        self
    }

    /// Register a document from explicit blocks.
    pub fn with_pages(mut self, path: impl Into<PathBuf>, pages: Vec<Vec<Block>>) -> Self {
        self.documents.insert(path.into(), pages);
        self
    }
}

impl BlockSource for InMemorySource {
    fn pages(&self, path: &Path, extent: Extent) -> Result<Vec<Vec<Block>>, StoreError> {
        let pages = self
            .documents
            .get(path)
            .ok_or_else(|| StoreError::InputNotFound(path.to_path_buf()))?;
        Ok(match extent {
            Extent::WholeDocument => pages.clone(),
            Extent::FirstPage => pages.iter().take(1).cloned().collect(),
        })
    }
}
