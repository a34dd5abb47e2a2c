// ─── Engine Error Types ───

use std::path::PathBuf;

use thiserror::Error;

/// Message fragments that identify a transient network failure. Matched
/// case-insensitively against the rendered error text.
const TRANSIENT_MARKERS: [&str; 5] = [
    "connection reset",
    "connection aborted",
    "timed out",
    "timeout",
    "10054",
];

/// Central error type for the engine. Every fallible seam returns
/// [`EngineResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Serialization ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Catalog / versions ──────────────────────────────
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    // ── Engine surface ──────────────────────────────────
    #[error("Operation already in progress: {0}")]
    Busy(&'static str),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for EngineError {
    fn from(source: std::io::Error) -> Self {
        EngineError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl EngineError {
    /// Whether this error looks like a transient network condition that a
    /// later attempt could clear. Connection-level reqwest failures count,
    /// as does any error whose text carries a known transient marker.
    pub fn is_transient(&self) -> bool {
        if let EngineError::Http(source) = self {
            if source.is_timeout() || source.is_connect() {
                return true;
            }
        }

        let text = self.to_string().to_lowercase();
        TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
