use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::models::{PropLine, StatType};

use super::provider::{LineProvider, Normalized, SkipReason};
use super::resolver::NameResolver;

/// The three payload shapes the odds endpoint family is known to return.
/// Resolved once at the top of normalization so the parser below never
/// probes types again.
enum PayloadShape<'a> {
    /// Top-level list of event objects
    EventList(&'a [Value]),
    /// A single event object, e.g. from /events/{id}/odds
    SingleEvent(&'a Value),
    /// Generic collection wrapper, e.g. {"data": [...]}
    DataWrapper(&'a [Value]),
    Unrecognized,
}

fn classify_payload(payload: &Value) -> PayloadShape<'_> {
    if let Some(events) = payload.as_array() {
        return PayloadShape::EventList(events);
    }
    if payload.get("bookmakers").is_some() {
        return PayloadShape::SingleEvent(payload);
    }
    if let Some(data) = payload.get("data").and_then(|v| v.as_array()) {
        return PayloadShape::DataWrapper(data);
    }
    PayloadShape::Unrecognized
}

/// Maps Odds-API market keys into the canonical stat taxonomy.
fn stat_from_market_key(key: &str) -> Option<StatType> {
    match key {
        "player_points" => Some(StatType::Points),
        "player_rebounds" => Some(StatType::Rebounds),
        "player_assists" => Some(StatType::Assists),
        "player_points_rebounds_assists" => Some(StatType::Pra),
        "player_threes" => Some(StatType::Threes),
        _ => None,
    }
}

/// Provider for The Odds API–style event/bookmaker/market/outcome payloads.
pub struct OddsApiProvider {
    http: Client,
    url: String,
    query: Vec<(String, String)>,
}

impl OddsApiProvider {
    pub fn new(url: &str, query: Vec<(String, String)>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(OddsApiProvider {
            http,
            url: url.to_string(),
            query,
        })
    }
}

#[async_trait]
impl LineProvider for OddsApiProvider {
    fn name(&self) -> &str {
        "The Odds API"
    }

    async fn fetch_payload(&self) -> Result<Value> {
        debug!("Fetching props from {}", self.url);
        let resp = self
            .http
            .get(&self.url)
            .query(&self.query)
            .send()
            .await
            .context("Odds API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Odds API error: {}", resp.status());
        }

        resp.json().await.context("Failed to parse Odds API response")
    }

    fn normalize(&self, payload: &Value, resolver: &mut NameResolver) -> Normalized {
        let mut out = Normalized::default();

        let events: Vec<&Value> = match classify_payload(payload) {
            PayloadShape::EventList(events) => events.iter().collect(),
            PayloadShape::SingleEvent(event) => vec![event],
            PayloadShape::DataWrapper(data) => data.iter().collect(),
            PayloadShape::Unrecognized => return out,
        };

        // Resolver is consulted once per distinct raw name in this payload.
        let mut resolved: HashMap<String, Option<String>> = HashMap::new();

        for event in events {
            let bookmakers = match event["bookmakers"].as_array() {
                Some(a) => a,
                None => continue,
            };
            for bookmaker in bookmakers {
                let provider_label = bookmaker["title"].as_str().unwrap_or(self.name());
                let markets = match bookmaker["markets"].as_array() {
                    Some(a) => a,
                    None => continue,
                };
                for market in markets {
                    let market_key = market["key"].as_str().unwrap_or_default();
                    let stat_type = match stat_from_market_key(market_key) {
                        Some(s) => s,
                        None => {
                            // Forward-compatible: unlisted markets are dropped
                            out.skip(SkipReason::UnknownStatKey(market_key.to_string()));
                            continue;
                        }
                    };

                    let outcomes = match market["outcomes"].as_array() {
                        Some(a) => a,
                        None => continue,
                    };

                    group_outcomes(outcomes, &mut out, |player_name, threshold, odds| {
                        let player_id = resolved
                            .entry(player_name.to_string())
                            .or_insert_with(|| resolver.resolve(player_name))
                            .clone();
                        let player_id = match player_id {
                            Some(id) => id,
                            None => {
                                return Err(SkipReason::UnresolvedName(player_name.to_string()))
                            }
                        };
                        match PropLine::new(
                            player_id,
                            provider_label,
                            stat_type,
                            threshold,
                            odds.over,
                            odds.under,
                        ) {
                            Ok(line) => Ok(line),
                            Err(e) => Err(SkipReason::InvalidLine(e.to_string())),
                        }
                    });
                }
            }
        }

        out
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct OddsPair {
    over: Option<i64>,
    under: Option<i64>,
}

/// Group over/under outcome rows by (player name, threshold) and emit one
/// line per group through `build`. Emitting two partial records for the two
/// sides would double-count the line downstream.
fn group_outcomes<F>(outcomes: &[Value], out: &mut Normalized, mut build: F)
where
    F: FnMut(&str, f64, OddsPair) -> Result<PropLine, SkipReason>,
{
    let mut grouped: HashMap<(String, u64), OddsPair> = HashMap::new();
    let mut order: Vec<(String, f64)> = Vec::new();

    for outcome in outcomes {
        let player_name = outcome["description"]
            .as_str()
            .or_else(|| outcome["player"].as_str());
        let player_name = match player_name {
            Some(n) if !n.is_empty() => n,
            _ => {
                out.skip(SkipReason::MissingPlayerName);
                continue;
            }
        };

        let threshold = match coerce_number(&outcome["point"]) {
            Coerced::Missing => {
                out.skip(SkipReason::MissingThreshold);
                continue;
            }
            Coerced::Invalid(raw) => {
                out.skip(SkipReason::NonNumericThreshold(raw));
                continue;
            }
            Coerced::Value(v) => v,
        };

        let key = (player_name.to_string(), threshold.to_bits());
        if !grouped.contains_key(&key) {
            order.push((player_name.to_string(), threshold));
        }
        let entry = grouped.entry(key).or_default();

        let price = outcome["price"]
            .as_i64()
            .or_else(|| outcome["price"].as_f64().map(|f| f.round() as i64));
        match outcome["name"].as_str().unwrap_or_default().to_lowercase().as_str() {
            "over" => entry.over = price,
            "under" => entry.under = price,
            _ => {}
        }
    }

    for (player_name, threshold) in order {
        let odds = grouped[&(player_name.clone(), threshold.to_bits())];
        match build(&player_name, threshold, odds) {
            Ok(line) => out.lines.push(line),
            Err(reason) => out.skip(reason),
        }
    }
}

enum Coerced {
    Value(f64),
    Missing,
    Invalid(String),
}

/// Defensive numeric coercion: providers send thresholds as numbers or
/// number-ish strings; anything else skips the single outcome.
fn coerce_number(v: &Value) -> Coerced {
    match v {
        Value::Null => Coerced::Missing,
        Value::Number(n) => match n.as_f64() {
            Some(f) => Coerced::Value(f),
            None => Coerced::Invalid(n.to_string()),
        },
        // str::parse accepts "NaN" and "inf"; neither is a usable threshold
        Value::String(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Coerced::Value(f),
            _ => Coerced::Invalid(s.clone()),
        },
        other => Coerced::Invalid(other.to_string()),
    }
}
