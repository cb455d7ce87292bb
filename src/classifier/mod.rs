use std::cmp::Ordering;

use crate::history::FeatureHistoryBuffer;
use crate::models::{FeatureVector, Signal};

/// Lorentzian-style distance between two feature vectors.
///
/// Sum of ln(1 + |delta|) across the four features. Compresses large
/// deviations relative to Euclidean distance, so a single outlier feature
/// cannot dominate the neighborhood.
pub fn lorentzian_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    (a.rsi_fast - b.rsi_fast).abs().ln_1p()
        + (a.adx_fast - b.adx_fast).abs().ln_1p()
        + (a.rsi_slow - b.rsi_slow).abs().ln_1p()
        + (a.adx_slow - b.adx_slow).abs().ln_1p()
}

/// Transient per-classification candidate. Built, sorted, voted, dropped.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    distance: f64,
    label: Signal,
}

/// k-nearest-neighbor vote over the labeled portion of the history.
#[derive(Debug, Clone)]
pub struct NeighborClassifier {
    neighbors_count: usize,
}

impl NeighborClassifier {
    pub fn new(neighbors_count: usize) -> Self {
        Self { neighbors_count }
    }

    /// Classify the current feature vector against the history.
    ///
    /// Unlabeled and Neutral-labeled rows are never candidates. Candidates
    /// are collected oldest-first and stable-sorted by distance, so equal
    /// distances resolve in favor of the older row. The k nearest vote
    /// +1 (Long) / -1 (Short); a positive sum is Long, negative is Short.
    /// Returns Neutral when the history holds fewer than k+1 rows, when no
    /// eligible rows exist, or when the vote ties.
    pub fn classify(&self, history: &FeatureHistoryBuffer, query: &FeatureVector) -> Signal {
        if history.len() < self.neighbors_count + 1 {
            return Signal::Neutral;
        }

        let mut candidates: Vec<Neighbor> = Vec::with_capacity(history.len());
        for row in history.iter_oldest_first() {
            let label = match row.label() {
                Some(Signal::Long) => Signal::Long,
                Some(Signal::Short) => Signal::Short,
                // Neutral rows carry no directional information
                Some(Signal::Neutral) | None => continue,
            };
            candidates.push(Neighbor {
                distance: lorentzian_distance(query, &row.features),
                label,
            });
        }

        if candidates.is_empty() {
            return Signal::Neutral;
        }

        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });

        let vote: i32 = candidates
            .iter()
            .take(self.neighbors_count)
            .map(|n| match n.label {
                Signal::Long => 1,
                Signal::Short => -1,
                Signal::Neutral => 0,
            })
            .sum();

        match vote.cmp(&0) {
            Ordering::Greater => Signal::Long,
            Ordering::Less => Signal::Short,
            Ordering::Equal => Signal::Neutral,
        }
    }
}
