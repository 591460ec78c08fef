//! Error taxonomy for the scraper run
//!
//! Only `Format` (and a transport failure on the source playlist itself)
//! aborts a run; everything else degrades the operation it belongs to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed W3U source playlist. Fatal.
    #[error("invalid W3U playlist format: {0}")]
    Format(String),

    /// Network failure or non-2xx status on a fetch.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Malformed gzip or XML in the guide feed.
    #[error("guide feed parse error: {0}")]
    Parse(String),

    /// Unparseable programme start/stop timestamp.
    #[error("bad programme timestamp {0:?}")]
    Timestamp(String),

    /// Document rendering or sink write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn transport(url: &str, reason: impl ToString) -> Self {
        Error::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}
