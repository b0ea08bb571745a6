use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle returned index {index} for {len} candidates")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no candidates to choose from")]
    NoCandidates,

    #[error("malformed oracle answer: {0}")]
    MalformedAnswer(String),

    #[cfg(feature = "llm")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "llm")]
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[cfg(feature = "llm")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
