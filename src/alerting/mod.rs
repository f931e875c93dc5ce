//! Notification delivery for high-value props.
//!
//! Sends a formatted message to Telegram and/or Discord for every prop whose
//! absolute edge clears the threshold. Delivery failures are warned and
//! swallowed; they never affect the ranking result already computed.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::models::PropEdge;

/// Confidence score: the edge expressed as a percentage, two decimals.
pub fn confidence_score(edge: f64) -> f64 {
    (edge * 10_000.0).round() / 100.0
}

/// Format one high-value prop as an alert message.
pub fn format_alert(prop: &PropEdge, player_name: Option<&str>) -> String {
    let name = player_name.unwrap_or(&prop.player_id);
    format!(
        "**High-value prop**\n\
         Player: {}\n\
         Prop: {} {} {}\n\
         Projected: {} | Line: {}\n\
         Confidence Score: {}%\n\
         Provider: {}",
        name,
        prop.stat_type,
        prop.recommended_side,
        prop.market_line,
        prop.projected,
        prop.market_line,
        confidence_score(prop.edge),
        prop.provider,
    )
}

/// Select the props worth alerting on: |edge| strictly above `min_edge`.
/// Profitable Unders count too; a strongly negative edge means the model
/// projects well under the posted line.
pub fn high_value_props(ranked: &[PropEdge], min_edge: f64) -> Vec<&PropEdge> {
    ranked.iter().filter(|e| e.edge.abs() > min_edge).collect()
}

pub struct Notifier {
    http: Client,
    telegram: Option<TelegramTarget>,
    discord_webhook: Option<String>,
}

struct TelegramTarget {
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(
        telegram_bot_token: Option<String>,
        telegram_chat_id: Option<String>,
        discord_webhook: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let telegram = match (telegram_bot_token, telegram_chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramTarget { bot_token, chat_id }),
            _ => None,
        };
        Ok(Notifier {
            http,
            telegram,
            discord_webhook,
        })
    }

    pub fn has_targets(&self) -> bool {
        self.telegram.is_some() || self.discord_webhook.is_some()
    }

    /// Send one message to every configured channel. Per-channel failures
    /// are logged and do not propagate.
    pub async fn send(&self, message: &str) {
        if let Some(tg) = &self.telegram {
            if let Err(e) = self.send_telegram(tg, message).await {
                warn!("Telegram delivery failed: {}", e);
            }
        }
        if let Some(webhook) = &self.discord_webhook {
            if let Err(e) = self.send_discord(webhook, message).await {
                warn!("Discord delivery failed: {}", e);
            }
        }
    }

    async fn send_telegram(&self, tg: &TelegramTarget, message: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", tg.bot_token);
        let body = json!({
            "chat_id": tg.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Telegram request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Telegram error: {}", resp.status());
        }
        Ok(())
    }

    async fn send_discord(&self, webhook: &str, message: &str) -> Result<()> {
        let body = json!({ "content": message });
        let resp = self
            .http
            .post(webhook)
            .json(&body)
            .send()
            .await
            .context("Discord request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Discord error: {}", resp.status());
        }
        Ok(())
    }

    /// Alert every prop with |edge| above `min_edge`. Returns the filtered
    /// set so the caller can persist what was alerted.
    pub async fn alert_high_value<'a>(
        &self,
        ranked: &'a [PropEdge],
        min_edge: f64,
        display_name: impl Fn(&str) -> Option<String>,
    ) -> Vec<&'a PropEdge> {
        let high_value = high_value_props(ranked, min_edge);
        info!("{} high-value prop(s) above |edge| {}", high_value.len(), min_edge);

        for prop in &high_value {
            let name = display_name(&prop.player_id);
            let message = format_alert(prop, name.as_deref());
            self.send(&message).await;
        }

        high_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, StatType};
    use approx::assert_relative_eq;

    fn edge(player: &str, value: f64) -> PropEdge {
        PropEdge {
            player_id: player.into(),
            stat_type: StatType::Points,
            provider: "TestBook".into(),
            market_line: 25.0,
            projected: 25.0 * (1.0 + value),
            edge: value,
            recommended_side: if value > 0.05 {
                Side::Over
            } else if value < -0.05 {
                Side::Under
            } else {
                Side::Pass
            },
        }
    }

    #[test]
    fn test_confidence_score_rounds_to_two_decimals() {
        assert_relative_eq!(confidence_score(0.12), 12.0, epsilon = 1e-9);
        assert_relative_eq!(confidence_score(0.07549), 7.55, epsilon = 1e-9);
    }

    #[test]
    fn test_high_value_filter_is_absolute_and_exclusive() {
        let ranked = vec![
            edge("over", 0.12),
            edge("boundary", 0.05),
            edge("pass", 0.01),
            edge("under", -0.40),
        ];
        let high: Vec<&str> = high_value_props(&ranked, 0.05)
            .iter()
            .map(|e| e.player_id.as_str())
            .collect();
        assert_eq!(high, vec!["over", "under"]);
    }

    #[test]
    fn test_format_alert_prefers_display_name() {
        let prop = edge("lebron", 0.12);
        let msg = format_alert(&prop, Some("LeBron James"));
        assert!(msg.contains("Player: LeBron James"));
        assert!(msg.contains("Points Over 25"));
        assert!(msg.contains("Confidence Score: 12%"));

        let fallback = format_alert(&prop, None);
        assert!(fallback.contains("Player: lebron"));
    }

    #[test]
    fn test_notifier_without_targets() {
        let n = Notifier::new(None, None, None).unwrap();
        assert!(!n.has_targets());
        // Token without chat id is not a usable target
        let n = Notifier::new(Some("token".into()), None, None).unwrap();
        assert!(!n.has_targets());
    }
}
