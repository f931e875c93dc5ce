use thiserror::Error;

use crate::models::{MarketSnapshot, PropEdge, Side, StatType};

/// Side-classification thresholds; boundaries are exclusive, so an edge of
/// exactly ±0.05 is a Pass.
const OVER_EDGE_THRESHOLD: f64 = 0.05;
const UNDER_EDGE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("market line must be a finite number > 0 to compute edge, got {0}")]
    InvalidLine(f64),
}

/// Edge = (projected - market_line) / market_line.
pub fn compute_edge(projected: f64, market_line: f64) -> Result<f64, EngineError> {
    // Finiteness first: NaN compares false against 0.0
    if !market_line.is_finite() || market_line <= 0.0 {
        return Err(EngineError::InvalidLine(market_line));
    }
    Ok((projected - market_line) / market_line)
}

/// Pure mapping from edge to recommended side.
pub fn classify_side(edge: f64) -> Side {
    if edge > OVER_EDGE_THRESHOLD {
        Side::Over
    } else if edge < UNDER_EDGE_THRESHOLD {
        Side::Under
    } else {
        Side::Pass
    }
}

/// Convert American odds to implied probability (0–1).
///
/// Absent odds yield `None`, never a computed zero.
pub fn implied_probability(odds: Option<i64>) -> Option<f64> {
    let odds = odds?;
    let p = if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        odds.unsigned_abs() as f64 / (odds.unsigned_abs() as f64 + 100.0)
    };
    Some(p)
}

/// Rank all lines in a snapshot by edge, best value first.
///
/// The projection callable returns `None` when it has no projection for a
/// (player, stat) pair; those lines are excluded, not errors. Lines with a
/// non-positive threshold are skipped defensively even though upstream
/// validation should make them unreachable. The sort is stable, so
/// equal-edge entries keep their encounter order, and the function is pure:
/// no I/O, no mutation of the snapshot.
pub fn rank_props_by_edge<F>(snapshot: &MarketSnapshot, get_projection: F) -> Vec<PropEdge>
where
    F: Fn(&str, StatType) -> Option<f64>,
{
    let mut ranked: Vec<PropEdge> = Vec::new();

    for line in &snapshot.lines {
        let projected = match get_projection(&line.player_id, line.stat_type) {
            Some(p) => p,
            None => continue,
        };

        let edge = match compute_edge(projected, line.threshold) {
            Ok(e) => e,
            Err(_) => continue,
        };

        ranked.push(PropEdge {
            player_id: line.player_id.clone(),
            stat_type: line.stat_type,
            provider: line.provider.clone(),
            market_line: line.threshold,
            projected,
            edge,
            recommended_side: classify_side(edge),
        });
    }

    // Stable sort: descending edge, ties keep encounter order. total_cmp is
    // a total order, so the comparator stays valid for any float input.
    ranked.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropLine;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn snapshot(lines: Vec<PropLine>) -> MarketSnapshot {
        MarketSnapshot {
            snapshot_id: "test-snapshot".into(),
            game_id: "game-1".into(),
            captured_at: Utc::now(),
            lines,
        }
    }

    fn line(player: &str, stat: StatType, threshold: f64) -> PropLine {
        PropLine::new(player, "TestBook", stat, threshold, None, None).unwrap()
    }

    #[test]
    fn test_compute_edge_formula() {
        assert_relative_eq!(compute_edge(28.0, 25.0).unwrap(), 0.12, epsilon = 1e-12);
        assert_relative_eq!(compute_edge(3.0, 5.0).unwrap(), -0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_compute_edge_rejects_non_positive_line() {
        assert!(matches!(
            compute_edge(10.0, 0.0),
            Err(EngineError::InvalidLine(_))
        ));
        assert!(compute_edge(10.0, -1.0).is_err());
    }

    #[test]
    fn test_compute_edge_rejects_non_finite_line() {
        assert!(matches!(
            compute_edge(10.0, f64::NAN),
            Err(EngineError::InvalidLine(_))
        ));
        assert!(compute_edge(10.0, f64::INFINITY).is_err());
        assert!(compute_edge(10.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_rank_skips_non_finite_market_lines() {
        // Bypass the PropLine constructor to simulate a corrupt line
        // reaching the engine; the defensive guard must drop it.
        let mut lines = vec![line("lebron", StatType::Points, 25.0)];
        let mut bad = line("curry", StatType::Threes, 5.0);
        bad.threshold = f64::NAN;
        lines.push(bad);

        let ranked = rank_props_by_edge(&snapshot(lines), |_, _| Some(28.0));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].player_id, "lebron");
    }

    #[test]
    fn test_classify_side_boundaries() {
        assert_eq!(classify_side(0.051), Side::Over);
        assert_eq!(classify_side(-0.051), Side::Under);
        assert_eq!(classify_side(0.03), Side::Pass);
        // Boundary is exclusive on both sides
        assert_eq!(classify_side(0.05), Side::Pass);
        assert_eq!(classify_side(-0.05), Side::Pass);
    }

    #[test]
    fn test_implied_probability() {
        assert_relative_eq!(
            implied_probability(Some(-110)).unwrap(),
            110.0 / 210.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(implied_probability(Some(150)).unwrap(), 0.4, epsilon = 1e-9);
        assert_eq!(implied_probability(None), None);
    }

    #[test]
    fn test_rank_end_to_end_scenario() {
        let snap = snapshot(vec![
            line("lebron", StatType::Points, 25.0),
            line("curry", StatType::Threes, 5.0),
            line("jokic", StatType::Rebounds, 12.0),
        ]);

        let ranked = rank_props_by_edge(&snap, |player_id, _stat| match player_id {
            "lebron" => Some(28.0),
            "curry" => Some(3.0),
            "jokic" => Some(12.2),
            _ => None,
        });

        assert_eq!(ranked.len(), 3);

        assert_eq!(ranked[0].player_id, "lebron");
        assert_relative_eq!(ranked[0].edge, 0.12, epsilon = 1e-9);
        assert_eq!(ranked[0].recommended_side, Side::Over);

        assert_eq!(ranked[1].player_id, "jokic");
        assert_relative_eq!(ranked[1].edge, 0.2 / 12.0, epsilon = 1e-9);
        assert_eq!(ranked[1].recommended_side, Side::Pass);

        assert_eq!(ranked[2].player_id, "curry");
        assert_relative_eq!(ranked[2].edge, -0.4, epsilon = 1e-9);
        assert_eq!(ranked[2].recommended_side, Side::Under);
    }

    #[test]
    fn test_rank_excludes_lines_without_projection() {
        let snap = snapshot(vec![
            line("lebron", StatType::Points, 25.0),
            line("unknown", StatType::Points, 20.0),
        ]);
        let ranked = rank_props_by_edge(&snap, |player_id, _| {
            (player_id == "lebron").then_some(28.0)
        });
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].player_id, "lebron");
    }

    #[test]
    fn test_rank_is_stable_for_equal_edges() {
        let snap = snapshot(vec![
            line("a", StatType::Points, 10.0),
            line("b", StatType::Rebounds, 20.0),
            line("c", StatType::Assists, 5.0),
        ]);
        // All projections exactly on the line: edge 0 everywhere
        let ranked = rank_props_by_edge(&snap, |player_id, _| match player_id {
            "a" => Some(10.0),
            "b" => Some(20.0),
            "c" => Some(5.0),
            _ => None,
        });
        let order: Vec<&str> = ranked.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_sorted_non_increasing() {
        let snap = snapshot(vec![
            line("a", StatType::Points, 10.0),
            line("b", StatType::Points, 10.0),
            line("c", StatType::Points, 10.0),
        ]);
        let ranked = rank_props_by_edge(&snap, |player_id, _| match player_id {
            "a" => Some(9.0),
            "b" => Some(14.0),
            "c" => Some(11.0),
            _ => None,
        });
        for pair in ranked.windows(2) {
            assert!(pair[0].edge >= pair[1].edge);
        }
    }
}
