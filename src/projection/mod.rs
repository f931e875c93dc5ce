//! Baseline projections from a player's recent game log.
//!
//! Every entry point takes `values_oldest_first`: the game values ordered
//! oldest to newest. The weighted average leans on that ordering to give the
//! newest game the heaviest weight, so callers holding newest-first data
//! must reverse before calling.

/// Recommended betting baseline method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectionMethod {
    WeightedAverage,
    SimpleAverage,
}

/// Ascending linear weights summing to 1: index 0 (oldest) lightest,
/// index n-1 (newest) heaviest.
fn linear_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let total = (n * (n + 1)) as f64 / 2.0;
    (1..=n).map(|i| i as f64 / total).collect()
}

/// Linearly weighted average; the last (newest) element weighs the most.
pub fn compute_weighted_average(values_oldest_first: &[f64]) -> f64 {
    let weights = linear_weights(values_oldest_first.len());
    values_oldest_first
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum()
}

/// Simple mean: equal weight for every game.
pub fn compute_simple_average(values_oldest_first: &[f64]) -> f64 {
    if values_oldest_first.is_empty() {
        return 0.0;
    }
    values_oldest_first.iter().sum::<f64>() / values_oldest_first.len() as f64
}

/// Project a stat value from the most recent `n_games` of the supplied
/// history. Returns 0.0 when no history is available.
pub fn get_projection(
    values_oldest_first: &[f64],
    n_games: usize,
    method: ProjectionMethod,
) -> f64 {
    let recent = if values_oldest_first.len() > n_games {
        &values_oldest_first[values_oldest_first.len() - n_games..]
    } else {
        values_oldest_first
    };

    match method {
        ProjectionMethod::WeightedAverage => compute_weighted_average(recent),
        ProjectionMethod::SimpleAverage => compute_simple_average(recent),
    }
}
