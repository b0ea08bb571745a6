//! Core types and parsing rules for roll-call votes and the Drucksachen they concern.

pub mod block;
pub mod content;
pub mod doctype;
pub mod error;
pub mod ids;
pub mod outcome;
pub mod recommendation;
pub mod records;
pub mod schema;

pub use block::{Block, Extent, locate_title};
pub use doctype::{DocumentType, classify_type, is_title_start};
pub use error::CoreError;
pub use ids::{DocumentId, VoteId, extract_document_ids};
pub use outcome::{BallotRow, Decision, PartyTally, compute_majority, mirror, tally_ballots};
pub use recommendation::{Recommendation, RecommendationEntry};
pub use records::{EntrypointRecord, ExpandedVote, OutcomeRecord, VoteRecord, VoteSource};
pub use schema::tables;
