//! RFM scoring and segment classification

use crate::binning::{qcut_scores, rank_first, DegenerateCause, ScoreOrder};
use crate::data::CustomerMetrics;
use std::collections::BTreeMap;
use std::fmt;

/// Lowest composite score a customer can receive
pub const MIN_COMPOSITE: u8 = 3;
/// Highest composite score a customer can receive
pub const MAX_COMPOSITE: u8 = 15;

/// The three behavioral metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Recency => "Recency",
            Metric::Frequency => "Frequency",
            Metric::Monetary => "Monetary",
        };
        f.write_str(name)
    }
}

/// Named business segment, in ladder order from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    RecentCustomers,
    Promising,
    CustomersNeedingAttention,
    AboutToSleep,
    AtRisk,
    CantLoseThem,
    Hibernating,
    Lost,
}

impl Segment {
    pub const ALL: [Segment; 11] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::RecentCustomers,
        Segment::Promising,
        Segment::CustomersNeedingAttention,
        Segment::AboutToSleep,
        Segment::AtRisk,
        Segment::CantLoseThem,
        Segment::Hibernating,
        Segment::Lost,
    ];

    /// Classify a composite score, highest threshold first
    ///
    /// Scores below 3 never come out of [`score_customers`]; `Hibernating`
    /// and `Lost` are only reachable by calling this directly.
    pub fn from_composite(score: u8) -> Self {
        match score {
            13.. => Segment::Champions,
            11..=12 => Segment::LoyalCustomers,
            9..=10 => Segment::PotentialLoyalists,
            8 => Segment::RecentCustomers,
            7 => Segment::Promising,
            6 => Segment::CustomersNeedingAttention,
            5 => Segment::AboutToSleep,
            4 => Segment::AtRisk,
            3 => Segment::CantLoseThem,
            2 => Segment::Hibernating,
            _ => Segment::Lost,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::PotentialLoyalists => "Potential Loyalists",
            Segment::RecentCustomers => "Recent Customers",
            Segment::Promising => "Promising",
            Segment::CustomersNeedingAttention => "Customers Needing Attention",
            Segment::AboutToSleep => "About To Sleep",
            Segment::AtRisk => "At Risk",
            Segment::CantLoseThem => "Can't Lose Them",
            Segment::Hibernating => "Hibernating",
            Segment::Lost => "Lost",
        }
    }

    /// Inverse of [`Segment::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Segment::ALL.into_iter().find(|segment| segment.name() == name)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A customer's metrics together with their scores and segment
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub metrics: CustomerMetrics,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// `r_score + f_score + m_score`
    pub composite_score: u8,
    pub segment: Segment,
}

impl ScoredCustomer {
    fn new(metrics: CustomerMetrics, r_score: u8, f_score: u8, m_score: u8) -> Self {
        let composite_score = r_score + f_score + m_score;
        Self {
            metrics,
            r_score,
            f_score,
            m_score,
            composite_score,
            segment: Segment::from_composite(composite_score),
        }
    }

    /// Scores concatenated as digits, e.g. `"541"`
    pub fn rfm_code(&self) -> String {
        format!("{}{}{}", self.r_score, self.f_score, self.m_score)
    }
}

/// A metric that could not be split into five equal-frequency bins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinningFallback {
    pub metric: Metric,
    pub cause: DegenerateCause,
    pub distinct_values: usize,
}

impl fmt::Display for BinningFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} binning degenerate ({}, {} distinct); dense-rank scores applied",
            self.metric, self.cause, self.distinct_values
        )
    }
}

/// Scored customers in the same order as the metrics they came from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoredTable {
    pub customers: Vec<ScoredCustomer>,
    /// One entry per metric that used the fallback
    pub fallbacks: Vec<BinningFallback>,
}

impl ScoredTable {
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Customers by composite score descending, ties by customer key
    pub fn ranked(&self) -> Vec<&ScoredCustomer> {
        let mut ranked: Vec<&ScoredCustomer> = self.customers.iter().collect();
        ranked.sort_by(|a, b| {
            b.composite_score
                .cmp(&a.composite_score)
                .then_with(|| a.metrics.customer.cmp(&b.metrics.customer))
        });
        ranked
    }

    /// Customer count for every segment, in ladder order
    pub fn segment_counts(&self) -> Vec<(Segment, usize)> {
        Segment::ALL
            .into_iter()
            .map(|segment| {
                let count = self
                    .customers
                    .iter()
                    .filter(|c| c.segment == segment)
                    .count();
                (segment, count)
            })
            .collect()
    }

    /// Customer count for each composite score from 3 to 15
    pub fn composite_distribution(&self) -> Vec<(u8, usize)> {
        (MIN_COMPOSITE..=MAX_COMPOSITE)
            .map(|score| {
                let count = self
                    .customers
                    .iter()
                    .filter(|c| c.composite_score == score)
                    .count();
                (score, count)
            })
            .collect()
    }

    /// Customer count per RFM code, sorted by code
    pub fn code_distribution(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for customer in &self.customers {
            *counts.entry(customer.rfm_code()).or_insert(0) += 1;
        }
        counts
    }
}

/// Score and segment every customer
///
/// # Arguments
/// * `customers` - Metrics rows; their order is the tie-break order for the
///   frequency rank transform
///
/// # Returns
/// * `ScoredTable` with one row per input row plus any binning fallbacks
pub fn score_customers(customers: &[CustomerMetrics]) -> ScoredTable {
    let recency: Vec<f64> = customers.iter().map(|c| c.recency_days as f64).collect();
    // Ranked first so repeated counts still give distinct bin edges
    let frequency = rank_first(
        &customers
            .iter()
            .map(|c| c.frequency as f64)
            .collect::<Vec<_>>(),
    );
    let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();

    let mut fallbacks = Vec::new();
    let mut bin = |metric: Metric, values: &[f64], order: ScoreOrder| {
        let binned = qcut_scores(values, order);
        if let Some(degenerate) = binned.degenerate {
            let fallback = BinningFallback {
                metric,
                cause: degenerate.cause,
                distinct_values: degenerate.distinct_values,
            };
            tracing::warn!(%metric, cause = %degenerate.cause, distinct = degenerate.distinct_values, "{}", fallback);
            fallbacks.push(fallback);
        }
        binned.scores
    };

    // Lower recency is better, so its labels run 5..1
    let r_scores = bin(Metric::Recency, &recency, ScoreOrder::Descending);
    let f_scores = bin(Metric::Frequency, &frequency, ScoreOrder::Ascending);
    let m_scores = bin(Metric::Monetary, &monetary, ScoreOrder::Ascending);

    let scored = customers
        .iter()
        .zip(r_scores)
        .zip(f_scores)
        .zip(m_scores)
        .map(|(((metrics, r), f), m)| ScoredCustomer::new(metrics.clone(), r, f, m))
        .collect();

    ScoredTable {
        customers: scored,
        fallbacks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CustomerKey;

    fn metrics(id: i64, recency_days: i64, frequency: usize, monetary: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer: CustomerKey::Id(id),
            recency_days,
            frequency,
            monetary,
        }
    }

    fn ten_customers() -> Vec<CustomerMetrics> {
        (1..=10)
            .map(|i| metrics(i, i * 10, i as usize, i as f64 * 100.0))
            .collect()
    }

    #[test]
    fn test_segment_ladder() {
        let expected = [
            (15, Segment::Champions),
            (13, Segment::Champions),
            (12, Segment::LoyalCustomers),
            (11, Segment::LoyalCustomers),
            (10, Segment::PotentialLoyalists),
            (9, Segment::PotentialLoyalists),
            (8, Segment::RecentCustomers),
            (7, Segment::Promising),
            (6, Segment::CustomersNeedingAttention),
            (5, Segment::AboutToSleep),
            (4, Segment::AtRisk),
            (3, Segment::CantLoseThem),
            (2, Segment::Hibernating),
            (1, Segment::Lost),
            (0, Segment::Lost),
        ];
        for (score, segment) in expected {
            assert_eq!(Segment::from_composite(score), segment, "score {}", score);
        }
    }

    #[test]
    fn test_segment_names_round_trip() {
        for segment in Segment::ALL {
            assert_eq!(Segment::from_name(segment.name()), Some(segment));
        }
        assert_eq!(Segment::CantLoseThem.to_string(), "Can't Lose Them");
        assert_eq!(Segment::from_name("New Customers"), None);
    }

    #[test]
    fn test_score_customers_ten_rows() {
        let table = score_customers(&ten_customers());

        assert!(table.fallbacks.is_empty());
        assert_eq!(table.len(), 10);

        let first = &table.customers[0];
        assert_eq!((first.r_score, first.f_score, first.m_score), (5, 1, 1));
        assert_eq!(first.composite_score, 7);
        assert_eq!(first.segment, Segment::Promising);
        assert_eq!(first.rfm_code(), "511");

        let last = &table.customers[9];
        assert_eq!((last.r_score, last.f_score, last.m_score), (1, 5, 5));
        assert_eq!(last.composite_score, 11);
        assert_eq!(last.segment, Segment::LoyalCustomers);
    }

    #[test]
    fn test_repeated_frequencies_are_ranked_first() {
        // All frequencies equal: rank order follows row order
        let customers: Vec<CustomerMetrics> =
            (1..=10).map(|i| metrics(i, 5, 3, 50.0 * i as f64)).collect();
        let table = score_customers(&customers);

        let f_scores: Vec<u8> = table.customers.iter().map(|c| c.f_score).collect();
        assert_eq!(f_scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);

        // Recency has one distinct value
        assert_eq!(table.fallbacks.len(), 1);
        assert_eq!(table.fallbacks[0].metric, Metric::Recency);
        assert!(table.customers.iter().all(|c| c.r_score == 3));
    }

    #[test]
    fn test_composite_and_segment_are_consistent() {
        let table = score_customers(&ten_customers());
        for customer in &table.customers {
            assert_eq!(
                customer.composite_score,
                customer.r_score + customer.f_score + customer.m_score
            );
            assert!((MIN_COMPOSITE..=MAX_COMPOSITE).contains(&customer.composite_score));
            assert_eq!(customer.segment, Segment::from_composite(customer.composite_score));
        }
    }

    #[test]
    fn test_two_customers_use_fallback() {
        let customers = vec![metrics(1, 300, 4, 400.0), metrics(2, 1, 4, 10059.0)];
        let table = score_customers(&customers);

        let metrics_fallen_back: Vec<Metric> = table.fallbacks.iter().map(|f| f.metric).collect();
        assert_eq!(
            metrics_fallen_back,
            vec![Metric::Recency, Metric::Frequency, Metric::Monetary]
        );

        let a = &table.customers[0];
        let b = &table.customers[1];
        assert_eq!((a.r_score, a.f_score, a.m_score), (1, 1, 1));
        assert_eq!((b.r_score, b.f_score, b.m_score), (5, 5, 5));
        assert_eq!(a.segment, Segment::CantLoseThem);
        assert_eq!(b.segment, Segment::Champions);
    }

    #[test]
    fn test_ranked_orders_by_composite_then_key() {
        let table = score_customers(&ten_customers());
        let ranked = table.ranked();

        // Ids 9 and 10 share the top composite score
        assert_eq!(ranked[0].metrics.customer, CustomerKey::Id(9));
        assert_eq!(ranked[1].metrics.customer, CustomerKey::Id(10));
        for pair in ranked.windows(2) {
            assert!(pair[0].composite_score >= pair[1].composite_score);
        }
    }

    #[test]
    fn test_distributions() {
        let table = score_customers(&ten_customers());

        let segments: usize = table.segment_counts().iter().map(|(_, n)| n).sum();
        assert_eq!(segments, 10);
        assert_eq!(table.segment_counts().len(), Segment::ALL.len());

        let composite = table.composite_distribution();
        assert_eq!(composite.first().map(|(s, _)| *s), Some(MIN_COMPOSITE));
        assert_eq!(composite.last().map(|(s, _)| *s), Some(MAX_COMPOSITE));
        assert_eq!(composite.iter().map(|(_, n)| n).sum::<usize>(), 10);

        let codes = table.code_distribution();
        assert_eq!(codes.get("511"), Some(&2));
    }

    #[test]
    fn test_empty_metrics() {
        let table = score_customers(&[]);
        assert!(table.is_empty());
    }
}
