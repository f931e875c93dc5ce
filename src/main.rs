use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

mod alerting;
mod config;
mod db;
mod engine;
mod ingest;
mod models;
mod projection;
mod stats;

use alerting::Notifier;
use config::Config;
use db::Database;
use engine::rank_props_by_edge;
use ingest::{fetch_snapshot, LineProvider, OddsApiProvider, PrizePicksProvider};
use models::{Player, StatType};
use projection::get_projection;
use stats::StatsClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let api_key = config.odds_api_key.clone().unwrap_or_default();

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // Seed the resolver from a roster file when one is configured
    let roster = match &config.roster_path {
        Some(path) => {
            let players = load_roster(path)?;
            info!("Loaded {} roster player(s) from {}", players.len(), path);
            players
        }
        None => Vec::new(),
    };

    // Discover upcoming (not yet started) events
    info!("Checking for upcoming pre-game matchups...");
    let event_ids = fetch_upcoming_event_ids(&config.odds_api_url, &api_key).await?;
    if event_ids.is_empty() {
        info!("No upcoming pre-game matchups found.");
        return Ok(());
    }
    info!("Found {} upcoming game(s)", event_ids.len());

    // One odds provider per upcoming event, plus PrizePicks when configured
    let mut providers: Vec<Arc<dyn LineProvider>> = Vec::new();
    for event_id in &event_ids {
        let url = format!("{}/events/{}/odds", config.odds_api_url, event_id);
        providers.push(Arc::new(OddsApiProvider::new(
            &url,
            vec![
                ("apiKey".to_string(), api_key.clone()),
                ("regions".to_string(), config.odds_regions.clone()),
                ("markets".to_string(), config.odds_markets.clone()),
            ],
        )?));
    }
    if let Some(url) = &config.prizepicks_url {
        providers.push(Arc::new(PrizePicksProvider::new(url, vec![])?));
    }

    let snapshot_id = format!("run-{}", Utc::now().format("%Y%m%dT%H%M%SZ"));
    let result = fetch_snapshot(
        &snapshot_id,
        "upcoming_nba_slate",
        roster,
        &providers,
        config.score_cutoff,
        config.match_policy,
    )
    .await;
    let snapshot = result.snapshot;
    info!(
        "Snapshot {} captured: {} line(s) across {} provider request(s)",
        snapshot.snapshot_id,
        snapshot.lines.len(),
        providers.len()
    );

    // Display names for alerts and stats lookups
    let display_names: HashMap<String, String> = result
        .players
        .iter()
        .map(|p| (p.id.clone(), p.standardized_name.clone()))
        .collect();

    // Prefetch a projection for every distinct (player, stat) in the snapshot
    let stats_client = StatsClient::new(
        None,
        config.stats_api_key.clone(),
        Path::new(&config.stats_cache_path),
    )?;
    let mut projections: HashMap<(String, StatType), f64> = HashMap::new();
    for line in &snapshot.lines {
        let key = (line.player_id.clone(), line.stat_type);
        if projections.contains_key(&key) {
            continue;
        }
        let name = display_names
            .get(&line.player_id)
            .map(String::as_str)
            .unwrap_or(&line.player_id);
        match stats_client
            .fetch_last_n_game_values(name, line.stat_type, config.n_games)
            .await
        {
            Ok(values) if !values.is_empty() => {
                let projected = get_projection(&values, config.n_games, config.projection_method);
                projections.insert(key, projected);
            }
            Ok(_) => {
                info!("No game log for {} {}; line excluded", name, line.stat_type);
            }
            Err(e) => {
                warn!("Stats fetch failed for {} {}: {}", name, line.stat_type, e);
            }
        }
    }

    let ranked = rank_props_by_edge(&snapshot, |player_id, stat_type| {
        projections.get(&(player_id.to_string(), stat_type)).copied()
    });

    info!("Top +EV props:");
    for (i, prop) in ranked.iter().take(5).enumerate() {
        let name = display_names
            .get(&prop.player_id)
            .map(String::as_str)
            .unwrap_or(&prop.player_id);
        info!(
            "  {}. {} | {} {} {} | projected {:.1} | edge {:.2}% | {}",
            i + 1,
            name,
            prop.stat_type,
            prop.recommended_side,
            prop.market_line,
            prop.projected,
            prop.edge * 100.0,
            prop.provider
        );
    }

    // Fire alerts for everything above the edge threshold
    let notifier = Notifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
        config.discord_webhook_url.clone(),
    )?;
    if !notifier.has_targets() {
        info!("No alert channels configured; skipping delivery");
    }
    let high_value = notifier
        .alert_high_value(&ranked, config.min_edge, |player_id| {
            display_names.get(player_id).cloned()
        })
        .await;

    // Persist the alerted picks; outcomes are graded later
    for prop in &high_value {
        let name = display_names
            .get(&prop.player_id)
            .map(String::as_str)
            .unwrap_or(&prop.player_id);
        if let Err(e) = db.log_pick(prop, name) {
            warn!("Failed to log pick for {}: {}", name, e);
        }
    }
    info!("Saved {} pick(s) to the database", high_value.len());

    let rate = db.get_win_rate()?;
    info!(
        "Graded record so far: {}-{} ({:.1}%) over {} pick(s)",
        rate.wins, rate.losses, rate.win_pct, rate.total_graded
    );

    Ok(())
}

/// Load the known-player roster from a JSON file: an array of Player objects.
fn load_roster(path: &str) -> Result<Vec<Player>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid roster JSON in {}", path))
}

/// Fetch event ids for games that have not started yet.
async fn fetch_upcoming_event_ids(api_url: &str, api_key: &str) -> Result<Vec<String>> {
    let http = Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let url = format!("{}/events", api_url);
    let resp = http
        .get(&url)
        .query(&[("apiKey", api_key)])
        .send()
        .await
        .context("Event discovery request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("Event discovery error: {}", resp.status());
    }

    let games: serde_json::Value = resp.json().await.context("Failed to parse events")?;
    let now = Utc::now();
    let ids = games
        .as_array()
        .map(|games| {
            games
                .iter()
                .filter_map(|game| {
                    let commence: DateTime<Utc> = game["commence_time"]
                        .as_str()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
                        .with_timezone(&Utc);
                    // Pre-game only: skip anything already tipped off
                    if commence > now {
                        game["id"].as_str().map(str::to_string)
                    } else {
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(ids)
}
