//! Storage layer: PDF block sources, the document cache, per-party ledgers and Parquet tables.

mod error;
pub use error::StoreError;

pub mod ballot;
pub mod cache;
pub mod ledger;
pub mod pdf;
pub mod tables;

pub use cache::{DiskCache, DocumentCache};
pub use ledger::PartyLedger;
pub use pdf::{BlockSource, InMemorySource, PdfToText};
pub use tables::{read_parquet, write_parquet};
