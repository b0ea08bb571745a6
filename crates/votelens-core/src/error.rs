use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("type not found in title: {0:?}")]
    TypeNotFound(String),

    #[error("title not found in document")]
    TitleNotFound,

    #[error("recommendation section not found in {0}")]
    SectionNotFound(String),

    #[error("invalid document id: {0:?}")]
    InvalidDocumentId(String),

    #[error("invalid vote id: {0:?}")]
    InvalidVoteId(String),
}
