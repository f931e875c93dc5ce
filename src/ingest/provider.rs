use anyhow::Result;
use async_trait::async_trait;

use crate::models::PropLine;

use super::resolver::NameResolver;

/// Why a single raw record was dropped during normalization. Record-level
/// problems never abort the containing payload; they are collected here so
/// callers (and tests) can see what was skipped and why.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Outcome/record carried no player name
    MissingPlayerName,
    /// Provider market/stat key not in the canonical taxonomy
    UnknownStatKey(String),
    /// Threshold field absent
    MissingThreshold,
    /// Threshold present but not a number
    NonNumericThreshold(String),
    /// Name resolution yielded no identity (drop-on-miss policy)
    UnresolvedName(String),
    /// Line construction failed validation (e.g. non-positive threshold)
    InvalidLine(String),
}

/// Result of normalizing one provider payload.
#[derive(Debug, Default)]
pub struct Normalized {
    pub lines: Vec<PropLine>,
    pub skips: Vec<SkipReason>,
}

impl Normalized {
    pub fn skip(&mut self, reason: SkipReason) {
        self.skips.push(reason);
    }
}

/// Trait that every upstream prop-line provider must implement.
///
/// Fetching and normalizing are split so the orchestrator can run all
/// network fetches concurrently while serializing normalization against the
/// shared name resolver.
#[async_trait]
pub trait LineProvider: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Fetch the raw JSON payload from the upstream endpoint. Any HTTP or
    /// decode error is a provider-level failure the orchestrator isolates.
    async fn fetch_payload(&self) -> Result<serde_json::Value>;

    /// Convert a raw payload into normalized lines, consulting the resolver
    /// for player identities. Must not fail on malformed individual records.
    fn normalize(&self, payload: &serde_json::Value, resolver: &mut NameResolver) -> Normalized;
}
