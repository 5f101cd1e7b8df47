use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    CacheHit,
    Downloaded,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheHit => "cache-hit",
            Self::Downloaded => "downloaded",
        }
    }
}

/// Remote file fetch. Implementations must leave `destination` untouched on
/// failure and report a cache hit when it already exists.
pub trait ArtifactFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<FetchStatus>;
}
