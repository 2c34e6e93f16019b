use std::path::PathBuf;

use url::Url;

// Every variant is a lookup failure that may trigger the fallback language.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("GET {url} failed with status {status}")]
    Status { url: Url, status: u16 },

    #[error("GET {url}: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dictionary for {code:?} is not a flat json object: {source}")]
    Parse {
        code: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no dictionary path for language code {0:?}")]
    UnusableCode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("<{element}> attributes are already borrowed")]
    AttributesBusy { element: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode storage snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}
