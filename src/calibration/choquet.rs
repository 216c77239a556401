//! Choquet 2-additive integral aggregation over calibration layer scores.
//!
//! A 2-additive Choquet integral generalizes a weighted average by also
//! assigning a (small) interaction weight to every *pair* of criteria,
//! capturing that two layers being jointly strong is worth more than the
//! sum of their parts. The capacity table below is this kernel's own
//! frozen decision — no retrievable source fixed concrete values, so the
//! table is declared once, covered by a monotonicity property test, and
//! its bytes are folded into every run's proof so any future change is
//! detectable rather than silent.

use crate::calibration::layer::{CalibrationLayer, CALIBRATION_LAYER_ORDER};
use std::collections::HashMap;
use std::sync::OnceLock;

const LAYER_ORDER: [CalibrationLayer; 8] = CALIBRATION_LAYER_ORDER;

const SINGLETON_WEIGHT: f64 = 0.10;
const PAIRWISE_BONUS: f64 = 0.0125;

/// Frozen capacity table: singleton weight per layer plus a fixed pairwise
/// interaction bonus for every 2-subset. Equal singleton weights keep the
/// table free of any implicit ranking between layers; the bonus is small
/// enough that capacity stays monotone (adding a layer to a subset can
/// never lower its capacity) for every subset up to all eight layers.
pub struct CapacityTable {
    singleton: HashMap<CalibrationLayer, f64>,
    pairwise_bonus: f64,
}

pub static DEFAULT_CAPACITY: OnceLock<CapacityTable> = OnceLock::new();

/// Stable bytes for the frozen default capacity table, for folding into
/// a proof so any future change to the weights is detectable.
pub fn capacity_table_bytes() -> Vec<u8> {
    default_capacity().canonical_bytes()
}

fn default_capacity() -> &'static CapacityTable {
    DEFAULT_CAPACITY.get_or_init(|| {
        let singleton = LAYER_ORDER
            .iter()
            .copied()
            .map(|layer| (layer, SINGLETON_WEIGHT))
            .collect();
        CapacityTable {
            singleton,
            pairwise_bonus: PAIRWISE_BONUS,
        }
    })
}

impl CapacityTable {
    /// Capacity of a subset of layers: sum of singleton weights plus the
    /// pairwise bonus for every unordered pair present in the subset.
    pub fn capacity(&self, subset: &[CalibrationLayer]) -> f64 {
        let singleton_sum: f64 = subset
            .iter()
            .map(|l| *self.singleton.get(l).unwrap_or(&0.0))
            .sum();
        let n = subset.len();
        let pair_count = if n >= 2 { n * (n - 1) / 2 } else { 0 };
        singleton_sum + pair_count as f64 * self.pairwise_bonus
    }

    /// Stable byte representation for hashing the table into a proof.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut entries: Vec<(String, f64)> = self
            .singleton
            .iter()
            .map(|(layer, weight)| (format!("{layer:?}"), *weight))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut bytes = Vec::new();
        for (name, weight) in entries {
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(&weight.to_le_bytes());
        }
        bytes.extend_from_slice(&self.pairwise_bonus.to_le_bytes());
        bytes
    }
}

/// Applies the Choquet integral over a set of `(layer, score)` pairs.
pub struct ChoquetAggregator<'a> {
    capacity: &'a CapacityTable,
}

impl<'a> ChoquetAggregator<'a> {
    pub fn new() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }

    pub fn with_capacity(capacity: &'a CapacityTable) -> Self {
        Self { capacity }
    }

    /// Aggregate layer scores into one value in `[0,1]`.
    ///
    /// Standard discrete Choquet integral: sort scores ascending, and sum
    /// `score_i * (capacity(tail_i) - capacity(tail_{i+1}))` where
    /// `tail_i` is the set of layers from position `i` to the end.
    pub fn aggregate(&self, scores: &[(CalibrationLayer, f64)]) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut total = 0.0;
        for i in 0..sorted.len() {
            let tail: Vec<CalibrationLayer> = sorted[i..].iter().map(|(l, _)| *l).collect();
            let next_tail: Vec<CalibrationLayer> = sorted[i + 1..].iter().map(|(l, _)| *l).collect();
            let marginal = self.capacity.capacity(&tail) - self.capacity.capacity(&next_tail);
            total += sorted[i].1 * marginal;
        }
        total.clamp(0.0, 1.0)
    }
}

impl<'a> Default for ChoquetAggregator<'a> {
    fn default() -> Self {
        Self::new()
    }
}
