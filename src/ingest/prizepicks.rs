use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::models::{PropLine, StatType};

use super::provider::{LineProvider, Normalized, SkipReason};
use super::resolver::NameResolver;

/// Maps PrizePicks stat labels (several spellings per stat) into the
/// canonical taxonomy.
fn stat_from_label(label: &str) -> Option<StatType> {
    match label {
        "points" => Some(StatType::Points),
        "rebounds" => Some(StatType::Rebounds),
        "assists" => Some(StatType::Assists),
        "points_rebounds_assists" | "pra" => Some(StatType::Pra),
        "threes" | "three_pointers_made" => Some(StatType::Threes),
        _ => None,
    }
}

/// Provider for PrizePicks-style projection payloads: flat records with an
/// `attributes` object, a line score, and no posted odds.
pub struct PrizePicksProvider {
    http: Client,
    url: String,
    query: Vec<(String, String)>,
}

impl PrizePicksProvider {
    pub fn new(url: &str, query: Vec<(String, String)>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PrizePicksProvider {
            http,
            url: url.to_string(),
            query,
        })
    }
}

#[async_trait]
impl LineProvider for PrizePicksProvider {
    fn name(&self) -> &str {
        "PrizePicks"
    }

    async fn fetch_payload(&self) -> Result<Value> {
        debug!("Fetching projections from {}", self.url);
        let resp = self
            .http
            .get(&self.url)
            .query(&self.query)
            .send()
            .await
            .context("PrizePicks request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("PrizePicks error: {}", resp.status());
        }

        resp.json()
            .await
            .context("Failed to parse PrizePicks response")
    }

    fn normalize(&self, payload: &Value, resolver: &mut NameResolver) -> Normalized {
        let mut out = Normalized::default();

        // Either a bare list of records or the usual {"data": [...]} wrapper.
        let items: &[Value] = match payload {
            Value::Array(items) => items,
            Value::Object(_) => match payload.get("data").and_then(|v| v.as_array()) {
                Some(items) => items,
                None => return out,
            },
            _ => return out,
        };

        let mut resolved: HashMap<String, Option<String>> = HashMap::new();

        for item in items {
            let attributes = &item["attributes"];
            let player_name = attributes["display_name"]
                .as_str()
                .or_else(|| attributes["name"].as_str());
            let player_name = match player_name {
                Some(n) if !n.is_empty() => n,
                _ => {
                    out.skip(SkipReason::MissingPlayerName);
                    continue;
                }
            };

            let stat_raw = attributes["stat_type"]
                .as_str()
                .or_else(|| attributes["stat"].as_str())
                .unwrap_or_default();
            let stat_type = match stat_from_label(&stat_raw.to_lowercase()) {
                Some(s) => s,
                None => {
                    out.skip(SkipReason::UnknownStatKey(stat_raw.to_string()));
                    continue;
                }
            };

            let threshold = match &attributes["line_score"] {
                Value::Null => {
                    out.skip(SkipReason::MissingThreshold);
                    continue;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => f,
                    None => {
                        out.skip(SkipReason::NonNumericThreshold(n.to_string()));
                        continue;
                    }
                },
                // str::parse accepts "NaN" and "inf"; neither is a usable threshold
                Value::String(s) => match s.parse::<f64>() {
                    Ok(f) if f.is_finite() => f,
                    _ => {
                        out.skip(SkipReason::NonNumericThreshold(s.clone()));
                        continue;
                    }
                },
                other => {
                    out.skip(SkipReason::NonNumericThreshold(other.to_string()));
                    continue;
                }
            };

            let player_id = resolved
                .entry(player_name.to_string())
                .or_insert_with(|| resolver.resolve(player_name))
                .clone();
            let player_id = match player_id {
                Some(id) => id,
                None => {
                    out.skip(SkipReason::UnresolvedName(player_name.to_string()));
                    continue;
                }
            };

            match PropLine::new(player_id, self.name(), stat_type, threshold, None, None) {
                Ok(line) => out.lines.push(line),
                Err(e) => out.skip(SkipReason::InvalidLine(e.to_string())),
            }
        }

        out
    }
}
