//! Entrypoint resolution and disambiguation oracles.
//!
//! When a vote's ballot sheet references several Drucksachen, the
//! [`EntrypointResolver`] narrows them down by document type and asks an
//! [`Oracle`] to pick the one actually being voted on.

mod error;
pub mod oracle;
pub mod resolver;

#[cfg(feature = "llm")]
pub mod llm;

pub use error::OracleError;
pub use oracle::{Candidate, FirstCandidate, FixedOracle, Oracle, TitleOverlap};
pub use resolver::{CandidateDocument, Entrypoint, EntrypointResolver};

#[cfg(feature = "llm")]
pub use llm::LlmOracle;
