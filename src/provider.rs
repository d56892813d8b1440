//! Question provider seam.
//!
//! The engine consumes alphagrams from an external word-search service. The
//! request payload is an opaque blob the provider understands; the engine
//! forwards it verbatim and applies its own seeded shuffle to the response,
//! so the provider's ordering does not matter. The real network client lives
//! outside this crate; [`StaticProvider`] serves tests and the demo binary.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::core::question::Alphagram;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("question provider unreachable: {0}")]
    Unreachable(String),
    #[error("could not decode search request or response: {0}")]
    Decode(String),
}

/// A capability exposing one operation: turn serialized search criteria into
/// a finite list of alphagrams, each carrying its valid answer words.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn search(&self, request: &[u8]) -> Result<Vec<Alphagram>, ProviderError>;
}

/// Search criteria understood by [`StaticProvider`]: an optional word-length
/// band, standing in for the real service's richer search criteria.
#[derive(Debug, Default, Deserialize)]
struct StaticCriteria {
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    max_length: Option<usize>,
}

/// An in-memory provider over a fixed alphagram list.
#[derive(Debug, Default)]
pub struct StaticProvider {
    alphagrams: Vec<Alphagram>,
    unreachable: bool,
}

impl StaticProvider {
    pub fn new(alphagrams: Vec<Alphagram>) -> Self {
        Self {
            alphagrams,
            unreachable: false,
        }
    }

    /// A provider that fails every search, for exercising start-of-round
    /// error paths.
    pub fn unreachable() -> Self {
        Self {
            alphagrams: Vec::new(),
            unreachable: true,
        }
    }
}

#[async_trait]
impl QuestionProvider for StaticProvider {
    async fn search(&self, request: &[u8]) -> Result<Vec<Alphagram>, ProviderError> {
        if self.unreachable {
            return Err(ProviderError::Unreachable("static provider down".into()));
        }
        let criteria: StaticCriteria = if request.is_empty() {
            StaticCriteria::default()
        } else {
            serde_json::from_slice(request).map_err(|e| ProviderError::Decode(e.to_string()))?
        };

        let min = criteria.min_length.unwrap_or(0);
        let max = criteria.max_length.unwrap_or(usize::MAX);
        Ok(self
            .alphagrams
            .iter()
            .filter(|a| {
                let len = a.alphagram.chars().count();
                len >= min && len <= max
            })
            .cloned()
            .collect())
    }
}
