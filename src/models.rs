use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A player known to the pipeline, either seeded from a roster file or
/// minted on the fly by the name resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Stable internal identifier; immutable once created
    pub id: String,
    /// Canonical display name
    pub standardized_name: String,
    /// Short team code, e.g. "LAL"; "UNK" when minted without context
    pub team: String,
    /// Alternate spellings this player is known by
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The canonical stat taxonomy shared across all providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatType {
    Points,
    Rebounds,
    Assists,
    /// Points + rebounds + assists combo
    Pra,
    /// Three-pointers made
    Threes,
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatType::Points => "Points",
            StatType::Rebounds => "Rebounds",
            StatType::Assists => "Assists",
            StatType::Pra => "PRA",
            StatType::Threes => "Threes",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum LineError {
    #[error("threshold must be a finite positive number, got {0}")]
    InvalidThreshold(f64),
}

/// One normalized prop line from one provider. Immutable after construction;
/// the constructor enforces the positive-threshold invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropLine {
    pub player_id: String,
    /// Display label of the book/provider posting this line
    pub provider: String,
    pub stat_type: StatType,
    /// The over/under number posted by the book; always > 0
    pub threshold: f64,
    /// American odds for the Over side, when the provider posts them
    pub over_odds: Option<i64>,
    /// American odds for the Under side
    pub under_odds: Option<i64>,
}

impl PropLine {
    pub fn new(
        player_id: impl Into<String>,
        provider: impl Into<String>,
        stat_type: StatType,
        threshold: f64,
        over_odds: Option<i64>,
        under_odds: Option<i64>,
    ) -> Result<Self, LineError> {
        // NaN compares false against everything, so check finiteness first
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(LineError::InvalidThreshold(threshold));
        }
        Ok(PropLine {
            player_id: player_id.into(),
            provider: provider.into(),
            stat_type,
            threshold,
            over_odds,
            under_odds,
        })
    }
}

/// Immutable capture of all normalized lines gathered in one ingestion run.
/// A new run produces a new snapshot; snapshots are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub snapshot_id: String,
    pub game_id: String,
    pub captured_at: DateTime<Utc>,
    pub lines: Vec<PropLine>,
}

/// Recommended betting side for a ranked prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Over,
    Under,
    Pass,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Side::Over => "Over",
            Side::Under => "Under",
            Side::Pass => "Pass",
        };
        write!(f, "{}", s)
    }
}

/// The value of a single prop relative to the model projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropEdge {
    pub player_id: String,
    pub stat_type: StatType,
    pub provider: String,
    /// Posted line (threshold) from the book
    pub market_line: f64,
    /// Model's projected stat value
    pub projected: f64,
    /// (projected - market_line) / market_line
    pub edge: f64,
    pub recommended_side: Side,
}
