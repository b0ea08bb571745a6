use thiserror::Error;
use votelens_store::StoreError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Server { status: u16, url: String },

    #[error("downloaded file from {url} is invalid: {source}")]
    Invalid {
        url: String,
        #[source]
        source: StoreError,
    },

    #[error("validation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
