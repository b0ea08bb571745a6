//! Layout blocks and title location.

use serde::{Deserialize, Serialize};

use crate::{CoreError, is_title_start};

/// Number of blocks, starting at the title line, that make up a title.
const TITLE_BLOCKS: usize = 3;

/// A positioned run of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Zero-based page index.
    pub page: usize,
    /// Top edge of the block; smaller is higher on the page.
    pub y: f32,
    pub text: String,
}

impl Block {
    pub fn new(page: usize, y: f32, text: impl Into<String>) -> Self {
        Self {
            page,
            y,
            text: text.into(),
        }
    }
}

/// How much of a document to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    WholeDocument,
    FirstPage,
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the title of a document from its blocks.
///
/// The first block that starts like a type phrase opens the title, which is
/// that block joined with the next two.
pub fn locate_title(blocks: &[Block]) -> Result<String, CoreError> {
    let start = blocks
        .iter()
        .position(|b| is_title_start(&b.text))
        .ok_or(CoreError::TitleNotFound)?;
    let end = (start + TITLE_BLOCKS).min(blocks.len());
    let joined = blocks[start..end]
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(collapse_whitespace(&joined))
}
