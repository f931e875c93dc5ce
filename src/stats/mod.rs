//! Historical game-log client used to feed projections.
//!
//! Backed by a balldontlie-style stats API. Results are cached on disk for
//! 24 hours per (player, stat, n) so repeated runs do not hammer the API;
//! cache failures never break the pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::StatType;

const DEFAULT_BASE_URL: &str = "https://api.balldontlie.io/v1";
const CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    values: Vec<f64>,
}

pub struct StatsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    cache_path: PathBuf,
}

impl StatsClient {
    pub fn new(base_url: Option<&str>, api_key: Option<String>, cache_path: &Path) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(StatsClient {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key,
            cache_path: cache_path.to_path_buf(),
        })
    }

    /// Fetch a player's last `n_games` values for one stat, ordered oldest
    /// to newest. Returns an empty vec when the player cannot be found or
    /// has no usable game log.
    pub async fn fetch_last_n_game_values(
        &self,
        player_name: &str,
        stat_type: StatType,
        n_games: usize,
    ) -> Result<Vec<f64>> {
        let key = cache_key(player_name, stat_type, n_games);
        if let Some(values) = self.cached_values(&key) {
            debug!("Cache hit for {}", key);
            return Ok(values);
        }

        let player_id = match self.search_player_id(player_name).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let games = self.fetch_game_logs(player_id, n_games).await?;
        let values = extract_stat_values(&games, stat_type);
        if !values.is_empty() {
            self.store_values(&key, &values);
        }
        Ok(values)
    }

    async fn search_player_id(&self, player_name: &str) -> Result<Option<i64>> {
        let url = format!("{}/players", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("search", player_name)])
            .headers(self.auth_headers())
            .send()
            .await
            .context("Player search request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Player search error: {}", resp.status());
        }

        let raw: Value = resp.json().await.context("Failed to parse player search")?;
        // First match wins; league/team filters would go here if needed
        Ok(raw["data"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item["id"].as_i64()))
    }

    async fn fetch_game_logs(&self, player_id: i64, n_games: usize) -> Result<Vec<Value>> {
        let url = format!("{}/stats", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("player_ids[]", player_id.to_string()),
                ("per_page", n_games.to_string()),
                ("postseason", "false".to_string()),
            ])
            .headers(self.auth_headers())
            .send()
            .await
            .context("Game log request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Game log error: {}", resp.status());
        }

        let raw: Value = resp.json().await.context("Failed to parse game logs")?;
        let mut games: Vec<Value> = raw["data"].as_array().cloned().unwrap_or_default();
        // Oldest -> newest, which the projection weights rely on
        games.sort_by(|a, b| {
            let da = a["game"]["date"].as_str().unwrap_or_default();
            let db = b["game"]["date"].as_str().unwrap_or_default();
            da.cmp(db)
        });
        if games.len() > n_games {
            games = games.split_off(games.len() - n_games);
        }
        Ok(games)
    }

    fn auth_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &self.api_key {
            if let Ok(v) = format!("Bearer {}", key).parse() {
                headers.insert(reqwest::header::AUTHORIZATION, v);
            }
        }
        headers
    }

    // ── Disk cache ───────────────────────────────────────────────────────────

    fn load_cache(&self) -> HashMap<String, CacheEntry> {
        match std::fs::read_to_string(&self.cache_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn cached_values(&self, key: &str) -> Option<Vec<f64>> {
        let cache = self.load_cache();
        let entry = cache.get(key)?;
        if Utc::now() - entry.cached_at > Duration::hours(CACHE_TTL_HOURS) {
            return None;
        }
        Some(entry.values.clone())
    }

    fn store_values(&self, key: &str, values: &[f64]) {
        let mut cache = self.load_cache();
        cache.insert(
            key.to_string(),
            CacheEntry {
                cached_at: Utc::now(),
                values: values.to_vec(),
            },
        );
        match serde_json::to_string(&cache) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.cache_path, raw) {
                    warn!("Failed to write stats cache: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize stats cache: {}", e),
        }
    }
}

fn cache_key(player_name: &str, stat_type: StatType, n_games: usize) -> String {
    format!("{}|{}|{}", player_name, stat_type, n_games)
}

/// Pull per-game values for one stat out of raw game-log records. PRA is
/// composed from points + rebounds + assists; records missing the field are
/// skipped.
fn extract_stat_values(games: &[Value], stat_type: StatType) -> Vec<f64> {
    let field = match stat_type {
        StatType::Points => "pts",
        StatType::Rebounds => "reb",
        StatType::Assists => "ast",
        StatType::Threes => "fg3m",
        StatType::Pra => {
            return games
                .iter()
                .map(|g| {
                    g["pts"].as_f64().unwrap_or(0.0)
                        + g["reb"].as_f64().unwrap_or(0.0)
                        + g["ast"].as_f64().unwrap_or(0.0)
                })
                .collect();
        }
    };

    games
        .iter()
        .filter_map(|g| g[field].as_f64())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_extract_points() {
        let games = vec![
            json!({ "pts": 25, "reb": 8, "ast": 7 }),
            json!({ "pts": 31.0, "reb": 10, "ast": 5 }),
        ];
        let values = extract_stat_values(&games, StatType::Points);
        assert_eq!(values, vec![25.0, 31.0]);
    }

    #[test]
    fn test_extract_pra_composes_three_fields() {
        let games = vec![json!({ "pts": 25, "reb": 8, "ast": 7 })];
        let values = extract_stat_values(&games, StatType::Pra);
        assert_eq!(values, vec![40.0]);
    }

    #[test]
    fn test_extract_skips_missing_fields() {
        let games = vec![
            json!({ "pts": 25 }),
            json!({ "reb": 8 }),
            json!({ "pts": "dnp" }),
        ];
        let values = extract_stat_values(&games, StatType::Points);
        assert_eq!(values, vec![25.0]);
    }

    #[test]
    fn test_cache_round_trip_and_expiry() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("propedge-stats-cache-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let client = StatsClient::new(None, None, &path).unwrap();
        let key = cache_key("LeBron James", StatType::Points, 10);

        assert_eq!(client.cached_values(&key), None);
        client.store_values(&key, &[25.0, 31.0]);
        let cached = client.cached_values(&key).expect("fresh entry");
        assert_relative_eq!(cached[0], 25.0);
        assert_relative_eq!(cached[1], 31.0);

        // Expire the entry by rewriting it with an old timestamp
        let mut cache = client.load_cache();
        if let Some(entry) = cache.get_mut(&key) {
            entry.cached_at = Utc::now() - Duration::hours(25);
        }
        std::fs::write(&path, serde_json::to_string(&cache).unwrap()).unwrap();
        assert_eq!(client.cached_values(&key), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("propedge-bad-cache-{}.json", std::process::id()));
        std::fs::write(&path, "not json at all").unwrap();

        let client = StatsClient::new(None, None, &path).unwrap();
        assert_eq!(
            client.cached_values(&cache_key("X", StatType::Points, 10)),
            None
        );
        let _ = std::fs::remove_file(&path);
    }
}
