pub mod odds_api;
pub mod prizepicks;
pub mod provider;
pub mod resolver;

pub use odds_api::OddsApiProvider;
pub use prizepicks::PrizePicksProvider;
pub use provider::{LineProvider, Normalized, SkipReason};
pub use resolver::{MatchPolicy, NameResolver, DEFAULT_SCORE_CUTOFF};

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::{MarketSnapshot, Player, PropLine};

/// Everything produced by one ingestion run: the immutable snapshot plus the
/// player directory the resolver ended up with (roster + minted identities),
/// which downstream alerting and projections use for display names.
pub struct IngestResult {
    pub snapshot: MarketSnapshot,
    pub players: Vec<Player>,
}

/// Fetch from all providers **concurrently** and assemble one market
/// snapshot.
///
/// Each provider fetch is independent: a network/HTTP/decode failure in one
/// is logged and dropped without aborting the others. If every provider
/// fails the snapshot simply has zero lines; callers must treat empty as a
/// legitimate state. Normalization runs sequentially over completed fetches
/// so the shared name resolver has a single writer while the network I/O
/// overlaps.
pub async fn fetch_snapshot(
    snapshot_id: &str,
    game_id: &str,
    known_players: Vec<Player>,
    providers: &[Arc<dyn LineProvider>],
    score_cutoff: f64,
    policy: MatchPolicy,
) -> IngestResult {
    let mut resolver = NameResolver::new(known_players, score_cutoff, policy);

    let fetches = providers.iter().map(|p| {
        let p = Arc::clone(p);
        async move {
            let payload = p.fetch_payload().await;
            (p, payload)
        }
    });
    let results = futures_util::future::join_all(fetches).await;

    let mut all_lines: Vec<PropLine> = Vec::new();
    for (provider, payload) in results {
        match payload {
            Ok(payload) => {
                let normalized = provider.normalize(&payload, &mut resolver);
                if !normalized.skips.is_empty() {
                    debug!(
                        "Provider '{}' skipped {} record(s): {:?}",
                        provider.name(),
                        normalized.skips.len(),
                        normalized.skips
                    );
                }
                info!(
                    "Provider '{}' contributed {} line(s)",
                    provider.name(),
                    normalized.lines.len()
                );
                all_lines.extend(normalized.lines);
            }
            Err(e) => {
                warn!("Provider '{}' failed: {}", provider.name(), e);
            }
        }
    }

    IngestResult {
        snapshot: MarketSnapshot {
            snapshot_id: snapshot_id.to_string(),
            game_id: game_id.to_string(),
            captured_at: Utc::now(),
            lines: all_lines,
        },
        players: resolver.players().cloned().collect(),
    }
}
