//! Picks the document a vote is actually about.

use std::sync::Arc;

use tracing::{debug, warn};
use votelens_core::{DocumentId, DocumentType, classify_type};

use crate::{Candidate, Oracle, OracleError};

/// A Drucksache referenced by a vote's ballot sheet, with its located title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDocument {
    pub id: DocumentId,
    pub title: String,
}

/// The resolved entrypoint of a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub id: DocumentId,
    pub title: String,
}

impl From<&CandidateDocument> for Entrypoint {
    fn from(c: &CandidateDocument) -> Self {
        Self {
            id: c.id.clone(),
            title: c.title.clone(),
        }
    }
}

/// Resolves a vote's entrypoint from its candidate documents.
///
/// 1. No candidates: no entrypoint.
/// 2. One candidate: that candidate, without consulting the oracle.
/// 3. Otherwise candidates are classified (failures count as
///    [`DocumentType::Unknown`]) and narrowed to the vote's type. A single
///    survivor is returned directly; several go to the oracle; none falls
///    back to the full set.
pub struct EntrypointResolver {
    oracle: Arc<dyn Oracle>,
}

impl EntrypointResolver {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn resolve(
        &self,
        vote_title: &str,
        vote_type: &DocumentType,
        candidates: &[CandidateDocument],
    ) -> Result<Option<Entrypoint>, OracleError> {
        match candidates {
            [] => return Ok(None),
            [only] => return Ok(Some(only.into())),
            _ => {}
        }

        let typed: Vec<(&CandidateDocument, DocumentType)> = candidates
            .iter()
            .map(|c| {
                let doc_type = classify_type(&c.title).unwrap_or_else(|_| {
                    warn!(document = %c.id, title = %c.title, "candidate type not recognised");
                    DocumentType::Unknown
                });
                (c, doc_type)
            })
            .collect();

        let filtered: Vec<&CandidateDocument> = typed
            .iter()
            .filter(|(_, t)| t == vote_type)
            .map(|(c, _)| *c)
            .collect();

        let pool: Vec<&CandidateDocument> = match filtered.len() {
            1 => {
                debug!(document = %filtered[0].id, "single candidate matches vote type");
                return Ok(Some(filtered[0].into()));
            }
            0 => {
                warn!(
                    vote_type = %vote_type,
                    candidates = candidates.len(),
                    "no candidate matches vote type, disambiguating over all"
                );
                candidates.iter().collect()
            }
            _ => filtered,
        };

        let offered: Vec<Candidate> = pool
            .iter()
            .enumerate()
            .map(|(index, c)| Candidate {
                index,
                title: c.title.clone(),
            })
            .collect();

        let index = self.oracle.match_best_candidate(vote_title, &offered).await?;
        let chosen = pool.get(index).ok_or(OracleError::IndexOutOfRange {
            index,
            len: pool.len(),
        })?;
        debug!(document = %chosen.id, index, pool = pool.len(), "oracle picked entrypoint");
        Ok(Some((*chosen).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedOracle;

    fn doc(id: &str, title: &str) -> CandidateDocument {
        CandidateDocument {
            id: id.parse().unwrap(),
            title: title.into(),
        }
    }

    fn resolver(oracle: &Arc<FixedOracle>) -> EntrypointResolver {
        EntrypointResolver::new(oracle.clone())
    }

    #[tokio::test]
    async fn no_candidates_is_none() {
        let oracle = Arc::new(FixedOracle::new(0));
        let got = resolver(&oracle)
            .resolve("t", &DocumentType::Antrag, &[])
            .await
            .unwrap();
        assert!(got.is_none());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn single_candidate_skips_oracle() {
        let oracle = Arc::new(FixedOracle::new(5));
        let c = [doc("20/1", "Bericht des Ausschusses")];
        let got = resolver(&oracle)
            .resolve("t", &DocumentType::Antrag, &c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id.to_string(), "20/1");
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn single_type_match_skips_oracle() {
        let oracle = Arc::new(FixedOracle::new(1));
        let c = [
            doc("20/14000", "Beschlussempfehlung und Bericht des Ausschusses"),
            doc("20/13000", "Antrag der Fraktion der FDP"),
        ];
        let got = resolver(&oracle)
            .resolve("Beschlussempfehlung", &DocumentType::Beschlussempfehlung, &c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id.to_string(), "20/14000");
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn oracle_index_maps_into_filtered_pool() {
        let oracle = Arc::new(FixedOracle::new(1));
        let c = [
            doc("20/1", "Antrag der Fraktion der SPD"),
            doc("20/2", "Gesetzentwurf der Bundesregierung"),
            doc("20/3", "Antrag der Fraktion der AfD"),
        ];
        let got = resolver(&oracle)
            .resolve("Antrag", &DocumentType::Antrag, &c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id.to_string(), "20/3");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn no_type_match_falls_back_to_all() {
        let oracle = Arc::new(FixedOracle::new(2));
        let c = [
            doc("20/1", "Antrag der Fraktion der SPD"),
            doc("20/2", "Unterrichtung durch die Bundesregierung"),
            doc("20/3", "Bericht des Ausschusses"),
        ];
        let got = resolver(&oracle)
            .resolve("t", &DocumentType::Gesetzentwurf, &c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id.to_string(), "20/3");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn out_of_range_index_is_an_error() {
        let oracle = Arc::new(FixedOracle::new(7));
        let c = [doc("20/1", "Antrag A"), doc("20/2", "Antrag B")];
        let err = resolver(&oracle)
            .resolve("t", &DocumentType::Antrag, &c)
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::IndexOutOfRange { index: 7, len: 2 }));
    }
}
