//! Equal-frequency binning of metric values into ordinal 1..=5 scores
//!
//! Bin edges are the 0, 0.2, 0.4, 0.6, 0.8 and 1 quantiles of the values,
//! computed by linear interpolation between order statistics: for a sorted
//! sample `s` of length `n` and probability `q`, the position is
//! `h = q * (n - 1)` and the edge is `s[floor(h)] + frac(h) * (s[floor(h) + 1] - s[floor(h)])`.
//! Bins are right-closed `(e[i], e[i + 1]]` and the first bin also takes `e[0]`.

use std::cmp::Ordering;
use std::fmt;

/// Number of score bins
pub const SCORE_BINS: usize = 5;

/// Score given to everyone when a metric has a single distinct value
pub const NEUTRAL_SCORE: u8 = 3;

/// Direction in which bins map to scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Smallest values score 1
    Ascending,
    /// Smallest values score 5
    Descending,
}

impl ScoreOrder {
    /// Map a 1..=5 score computed in ascending order onto this order
    fn apply(self, ascending_score: u8) -> u8 {
        match self {
            ScoreOrder::Ascending => ascending_score,
            ScoreOrder::Descending => SCORE_BINS as u8 + 1 - ascending_score,
        }
    }
}

/// Why a metric could not be split into five equal-frequency bins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateCause {
    /// Fewer than five distinct values
    FewDistinctValues,
    /// Enough distinct values but repeated quantile edges
    DuplicateEdges,
}

impl fmt::Display for DegenerateCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateCause::FewDistinctValues => f.write_str("fewer than 5 distinct values"),
            DegenerateCause::DuplicateEdges => f.write_str("quantile edges are not unique"),
        }
    }
}

/// Details of a metric that fell back to dense-rank scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degenerate {
    pub cause: DegenerateCause,
    pub distinct_values: usize,
}

/// Scores for a slice of values, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Binned {
    pub scores: Vec<u8>,
    /// Set when the dense-rank fallback was used instead of quantile bins
    pub degenerate: Option<Degenerate>,
}

/// Value at fractional `position` of a non-empty ascending slice
fn interpolate(sorted: &[f64], position: f64) -> f64 {
    let lower = (position.floor() as usize).min(sorted.len() - 1);
    let fraction = position - lower as f64;

    match sorted.get(lower + 1) {
        Some(&upper) if fraction > 0.0 => sorted[lower] + fraction * (upper - sorted[lower]),
        _ => sorted[lower],
    }
}

/// Quantile edges splitting `values` into `bins` equal-frequency groups
///
/// Returns `bins + 1` edges, or an empty vector for empty input.
pub fn quantile_edges(values: &[f64], bins: usize) -> Vec<f64> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let sorted = sorted_copy(values);
    let last = sorted.len() - 1;
    // Integer numerator keeps positions that land on an order statistic exact
    (0..=bins)
        .map(|i| interpolate(&sorted, (i * last) as f64 / bins as f64))
        .collect()
}

/// 1-based ranks with ties broken by position ("first" method)
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps equal values in input order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

/// Assign 1..=5 scores by equal-frequency binning
///
/// Falls back to [`dense_rank_scores`] when the values have fewer than five
/// distinct entries or produce repeated quantile edges.
pub fn qcut_scores(values: &[f64], order: ScoreOrder) -> Binned {
    let distinct = distinct_sorted(values);

    if distinct.len() < SCORE_BINS {
        return Binned {
            scores: dense_rank_scores(values, order),
            degenerate: Some(Degenerate {
                cause: DegenerateCause::FewDistinctValues,
                distinct_values: distinct.len(),
            }),
        };
    }

    let edges = quantile_edges(values, SCORE_BINS);
    if !edges.windows(2).all(|w| w[0] < w[1]) {
        return Binned {
            scores: dense_rank_scores(values, order),
            degenerate: Some(Degenerate {
                cause: DegenerateCause::DuplicateEdges,
                distinct_values: distinct.len(),
            }),
        };
    }

    let scores = values
        .iter()
        .map(|&value| order.apply(bin_index(&edges, value) as u8 + 1))
        .collect();

    Binned {
        scores,
        degenerate: None,
    }
}

/// Fallback scoring: spread the `k` distinct values evenly over 1..=5
///
/// The value with dense rank `d` scores `1 + round(4 * d / (k - 1))`.
/// A single distinct value scores [`NEUTRAL_SCORE`] for everyone.
pub fn dense_rank_scores(values: &[f64], order: ScoreOrder) -> Vec<u8> {
    let distinct = distinct_sorted(values);
    if distinct.len() <= 1 {
        return vec![NEUTRAL_SCORE; values.len()];
    }

    let top = (distinct.len() - 1) as f64;
    let span = (SCORE_BINS - 1) as f64;
    values
        .iter()
        .map(|value| {
            let rank = distinct
                .binary_search_by(|probe| probe.total_cmp(value))
                .unwrap_or_else(|insert_at| insert_at);
            let ascending = 1 + (span * rank as f64 / top).round() as u8;
            order.apply(ascending)
        })
        .collect()
}

/// Index of the right-closed bin holding `value`; the lowest edge is inclusive
fn bin_index(edges: &[f64], value: f64) -> usize {
    edges[1..]
        .iter()
        .position(|&edge| value.total_cmp(&edge) != Ordering::Greater)
        .unwrap_or(edges.len().saturating_sub(2))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn distinct_sorted(values: &[f64]) -> Vec<f64> {
    let mut distinct = sorted_copy(values);
    distinct.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    distinct
}
