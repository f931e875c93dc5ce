use std::collections::HashMap;

use strsim::jaro_winkler;
use tracing::debug;

use crate::models::Player;

/// Default similarity cutoff on the 0–100 scale.
pub const DEFAULT_SCORE_CUTOFF: f64 = 80.0;

/// What to do when a name clears no known candidate:
/// mint a new identity (completeness over precision) or drop the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchPolicy {
    MintOnMiss,
    DropOnMiss,
}

/// Resolves noisy provider-supplied player names to canonical `Player.id`s
/// using fuzzy string matching.
///
/// One instance lives for the duration of one ingestion run. Names learned
/// from earlier records are matchable by later records in the same run;
/// minted identities are not persisted anywhere.
pub struct NameResolver {
    score_cutoff: f64,
    policy: MatchPolicy,
    /// Any known name or alias -> canonical Player.id
    name_to_id: HashMap<String, String>,
    players_by_id: HashMap<String, Player>,
}

impl NameResolver {
    pub fn new(players: Vec<Player>, score_cutoff: f64, policy: MatchPolicy) -> Self {
        let mut resolver = NameResolver {
            score_cutoff,
            policy,
            name_to_id: HashMap::new(),
            players_by_id: HashMap::new(),
        };
        for player in players {
            resolver
                .name_to_id
                .insert(player.standardized_name.clone(), player.id.clone());
            for alias in &player.aliases {
                resolver.name_to_id.insert(alias.clone(), player.id.clone());
            }
            resolver.players_by_id.insert(player.id.clone(), player);
        }
        resolver
    }

    /// Resolve a raw provider name to a canonical player id.
    ///
    /// Empty input always yields `None`. An unmatched name mints a new
    /// identity under `MatchPolicy::MintOnMiss` and yields `None` under
    /// `MatchPolicy::DropOnMiss`.
    pub fn resolve(&mut self, raw_name: &str) -> Option<String> {
        if raw_name.trim().is_empty() {
            return None;
        }

        // Nothing known yet: learn this player immediately.
        if self.name_to_id.is_empty() {
            return Some(self.mint(raw_name));
        }

        // Tie-break equal scores on the candidate name so the winner does
        // not depend on hash iteration order between runs.
        let mut best: Option<(String, f64)> = None;
        for known in self.name_to_id.keys() {
            let score = similarity(raw_name, known);
            let better = match &best {
                None => true,
                Some((name, s)) => score > *s || (score == *s && known < name),
            };
            if better {
                best = Some((known.clone(), score));
            }
        }

        match best {
            Some((matched, score)) if score >= self.score_cutoff => {
                debug!("Resolved '{}' -> '{}' (score {:.1})", raw_name, matched, score);
                self.name_to_id.get(&matched).cloned()
            }
            _ => match self.policy {
                MatchPolicy::MintOnMiss => Some(self.mint(raw_name)),
                MatchPolicy::DropOnMiss => None,
            },
        }
    }

    /// Create a new identity for a previously unseen name. Without any team
    /// context the team defaults to "UNK". The raw name seeds the id; a rare
    /// exact-id collision gets a numeric suffix.
    fn mint(&mut self, raw_name: &str) -> String {
        let mut id = raw_name.to_string();
        if self.players_by_id.contains_key(&id) {
            let mut suffix = 2u32;
            while self
                .players_by_id
                .contains_key(&format!("{} ({})", raw_name, suffix))
            {
                suffix += 1;
            }
            id = format!("{} ({})", raw_name, suffix);
        }

        debug!("Minted new player identity '{}'", id);
        let player = Player {
            id: id.clone(),
            standardized_name: raw_name.to_string(),
            team: "UNK".to_string(),
            aliases: Vec::new(),
        };
        self.name_to_id.insert(raw_name.to_string(), id.clone());
        self.players_by_id.insert(id.clone(), player);
        id
    }

    /// Directory of all known players, roster-seeded and minted alike.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players_by_id.values()
    }

    pub fn display_name(&self, player_id: &str) -> Option<&str> {
        self.players_by_id
            .get(player_id)
            .map(|p| p.standardized_name.as_str())
    }
}

/// Similarity score between two names on a 0–100 scale.
fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(&a.to_lowercase(), &b.to_lowercase()) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Player> {
        vec![
            Player {
                id: "lebron".into(),
                standardized_name: "LeBron James".into(),
                team: "LAL".into(),
                aliases: vec!["LeBron".into(), "LBJ".into()],
            },
            Player {
                id: "jokic".into(),
                standardized_name: "Nikola Jokic".into(),
                team: "DEN".into(),
                aliases: vec!["Joker".into()],
            },
        ]
    }

    #[test]
    fn test_exact_name_resolves() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        assert_eq!(r.resolve("LeBron James"), Some("lebron".to_string()));
    }

    #[test]
    fn test_alias_resolves() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        assert_eq!(r.resolve("LBJ"), Some("lebron".to_string()));
    }

    #[test]
    fn test_near_miss_spelling_resolves() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        // Accent-stripped variant as providers commonly send it
        assert_eq!(r.resolve("Nikola Jokić"), Some("jokic".to_string()));
        assert_eq!(r.resolve("Lebron james"), Some("lebron".to_string()));
    }

    #[test]
    fn test_empty_name_is_none() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve("   "), None);
    }

    #[test]
    fn test_unmatched_name_mints_and_is_idempotent() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        let first = r.resolve("Victor Wembanyama").expect("minted");
        assert_ne!(first, "lebron");
        assert_ne!(first, "jokic");
        // Resolving the same novel string again returns the same id.
        let second = r.resolve("Victor Wembanyama").expect("resolved");
        assert_eq!(first, second);
        let minted = r
            .players()
            .find(|p| p.id == first)
            .expect("present in directory");
        assert_eq!(minted.team, "UNK");
    }

    #[test]
    fn test_drop_on_miss_returns_none() {
        let mut r = NameResolver::new(roster(), DEFAULT_SCORE_CUTOFF, MatchPolicy::DropOnMiss);
        assert_eq!(r.resolve("Victor Wembanyama"), None);
        // Nothing was learned
        assert_eq!(r.players().count(), 2);
    }

    #[test]
    fn test_empty_roster_learns_first_name() {
        let mut r = NameResolver::new(vec![], DEFAULT_SCORE_CUTOFF, MatchPolicy::DropOnMiss);
        // Even under DropOnMiss the very first name is learned: there are no
        // candidates to match against yet.
        let id = r.resolve("Anthony Edwards").expect("learned");
        assert_eq!(r.resolve("Anthony Edwards"), Some(id));
    }

    #[test]
    fn test_equal_scores_break_ties_deterministically() {
        // Both candidates differ from the query in the same single position,
        // so their similarity scores are exactly equal; the lexicographically
        // smaller name must win regardless of hash iteration order.
        let roster = vec![
            Player {
                id: "booker-b".into(),
                standardized_name: "Devin Booker B".into(),
                team: "PHX".into(),
                aliases: vec![],
            },
            Player {
                id: "booker-a".into(),
                standardized_name: "Devin Booker A".into(),
                team: "PHX".into(),
                aliases: vec![],
            },
        ];
        // Fresh resolvers get fresh hash seeds, so iteration order varies
        for _ in 0..16 {
            let mut r = NameResolver::new(
                roster.clone(),
                DEFAULT_SCORE_CUTOFF,
                MatchPolicy::DropOnMiss,
            );
            assert_eq!(r.resolve("Devin Booker Z"), Some("booker-a".to_string()));
        }
    }

    #[test]
    fn test_mint_collision_gets_suffix() {
        let roster = vec![Player {
            id: "Jalen Green".into(),
            standardized_name: "Someone Else Entirely".into(),
            team: "HOU".into(),
            aliases: vec![],
        }];
        let mut r = NameResolver::new(roster, DEFAULT_SCORE_CUTOFF, MatchPolicy::MintOnMiss);
        let id = r.resolve("Jalen Green").expect("minted");
        assert_eq!(id, "Jalen Green (2)");
    }
}
