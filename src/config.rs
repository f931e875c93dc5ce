use clap::Parser;

use crate::ingest::MatchPolicy;
use crate::projection::ProjectionMethod;

/// NBA player-prop ingestion and +EV edge-ranking pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "propedge", version, about)]
pub struct Config {
    /// The Odds API base URL for the target sport
    #[arg(
        long,
        env = "ODDS_API_URL",
        default_value = "https://api.the-odds-api.com/v4/sports/basketball_nba"
    )]
    pub odds_api_url: String,

    /// The Odds API key (required)
    #[arg(long, env = "ODDS_API_KEY")]
    pub odds_api_key: Option<String>,

    /// Comma-separated prop markets to request
    #[arg(
        long,
        env = "ODDS_MARKETS",
        default_value = "player_points,player_rebounds,player_assists,player_points_rebounds_assists,player_threes"
    )]
    pub odds_markets: String,

    /// Bookmaker regions to request
    #[arg(long, env = "ODDS_REGIONS", default_value = "us")]
    pub odds_regions: String,

    /// Optional PrizePicks-style projections endpoint (disabled when unset)
    #[arg(long, env = "PRIZEPICKS_URL")]
    pub prizepicks_url: Option<String>,

    /// Path to a JSON roster file seeding known players
    #[arg(long, env = "ROSTER_PATH")]
    pub roster_path: Option<String>,

    /// SQLite database path for pick logging
    #[arg(long, env = "DATABASE_PATH", default_value = "propedge.db")]
    pub database_path: String,

    /// Historical stats API key (balldontlie)
    #[arg(long, env = "BALLDONTLIE_API_KEY")]
    pub stats_api_key: Option<String>,

    /// On-disk cache file for historical stats
    #[arg(long, env = "STATS_CACHE_PATH", default_value = "stats_cache.json")]
    pub stats_cache_path: String,

    /// Fuzzy-match cutoff for name resolution (0–100)
    #[arg(long, env = "SCORE_CUTOFF", default_value = "80.0")]
    pub score_cutoff: f64,

    /// What to do with names below the cutoff: mint a new identity or drop
    #[arg(long, env = "MATCH_POLICY", value_enum, default_value = "mint-on-miss")]
    pub match_policy: MatchPolicy,

    /// Minimum |edge| required to alert and persist a pick (e.g. 0.05 = 5%)
    #[arg(long, env = "MIN_EDGE", default_value = "0.05")]
    pub min_edge: f64,

    /// Number of recent games feeding each projection
    #[arg(long, env = "N_GAMES", default_value = "10")]
    pub n_games: usize,

    /// Projection baseline method
    #[arg(
        long,
        env = "PROJECTION_METHOD",
        value_enum,
        default_value = "weighted-average"
    )]
    pub projection_method: ProjectionMethod,

    /// Telegram bot token for alerts
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id for alerts
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Discord webhook URL for alerts
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    pub discord_webhook_url: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.odds_api_key.is_none() {
            anyhow::bail!("ODDS_API_KEY is required to fetch prop lines");
        }
        if !(0.0..=100.0).contains(&self.score_cutoff) {
            anyhow::bail!("score_cutoff must be between 0 and 100");
        }
        if !(0.0..1.0).contains(&self.min_edge) {
            anyhow::bail!("min_edge must be between 0.0 and 1.0");
        }
        if self.n_games == 0 {
            anyhow::bail!("n_games must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["propedge", "--odds-api-key", "test-key"])
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let mut cfg = base_config();
        cfg.odds_api_key = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_out_of_range_cutoff_rejected() {
        let mut cfg = base_config();
        cfg.score_cutoff = 180.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_match_policy_flag_parses() {
        let cfg = Config::parse_from([
            "propedge",
            "--odds-api-key",
            "k",
            "--match-policy",
            "drop-on-miss",
        ]);
        assert_eq!(cfg.match_policy, MatchPolicy::DropOnMiss);
    }
}
