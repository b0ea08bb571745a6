//! HTTP downloads into the document cache.

mod error;
pub mod http;

pub use error::FetchError;
pub use http::{Downloader, Validator};
