//! Aggregator: rolls up per-micro-question scores through three levels —
//! `(policy_area, dimension)` cell, cluster, macro — each a plain
//! arithmetic mean, staying in `[0,1]` until the final percentage is
//! emitted.
//!
//! Accumulate now, derive a rate later, across three nested rollup
//! levels instead of one.

use crate::ontology::{BaseSlot, ClusterId, ClusterPartition, PolicyAreaId};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassificationBand {
    Satisfactorio,
    Aceptable,
    Deficiente,
    Insuficiente,
}

impl ClassificationBand {
    pub fn for_percentage(pct: f64) -> Self {
        if pct >= 75.0 {
            Self::Satisfactorio
        } else if pct >= 55.0 {
            Self::Aceptable
        } else if pct >= 35.0 {
            Self::Deficiente
        } else {
            Self::Insuficiente
        }
    }
}

/// One `(policy_area, dimension)` cell's aggregated score.
#[derive(Debug, Clone, Serialize)]
pub struct CellScore {
    pub slot: BaseSlot,
    pub mean_score: f64,
    pub question_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterScore {
    pub cluster: ClusterId,
    pub mean_score: f64,
    pub cell_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub cells: Vec<CellScore>,
    pub clusters: Vec<ClusterScore>,
    pub macro_score: f64,
    pub macro_percentage: f64,
    pub classification: ClassificationBand,
}

pub struct Aggregator<'a> {
    partition: &'a ClusterPartition,
}

impl<'a> Aggregator<'a> {
    pub fn new(partition: &'a ClusterPartition) -> Self {
        Self { partition }
    }

    /// Roll up per-question scores (each in `[0,1]`, keyed by the slot the
    /// question belongs to) into cells, clusters, and one macro score.
    pub fn aggregate(&self, scores_by_slot: &HashMap<BaseSlot, Vec<f64>>) -> AggregationReport {
        let mut cells: Vec<CellScore> = scores_by_slot
            .iter()
            .map(|(slot, scores)| CellScore {
                slot: *slot,
                mean_score: mean(scores),
                question_count: scores.len(),
            })
            .collect();
        cells.sort_by_key(|c| (c.slot.policy_area_id, c.slot.dimension_id));

        let mut cells_by_pa: HashMap<PolicyAreaId, Vec<f64>> = HashMap::new();
        for cell in &cells {
            cells_by_pa.entry(cell.slot.policy_area_id).or_default().push(cell.mean_score);
        }

        let mut clusters: Vec<ClusterScore> = self
            .partition
            .clusters()
            .map(|cluster| {
                let pa_means: Vec<f64> = self
                    .partition
                    .policy_areas_in(cluster)
                    .iter()
                    .filter_map(|pa| cells_by_pa.get(pa))
                    .map(|scores| mean(scores))
                    .collect();
                ClusterScore {
                    cluster,
                    mean_score: mean(&pa_means),
                    cell_count: pa_means.len(),
                }
            })
            .collect();
        clusters.sort_by_key(|c| c.cluster);

        let cluster_means: Vec<f64> = clusters.iter().map(|c| c.mean_score).collect();
        let macro_score = mean(&cluster_means);
        let macro_percentage = macro_score * 100.0;

        AggregationReport {
            cells,
            clusters,
            macro_score,
            macro_percentage,
            classification: ClassificationBand::for_percentage(macro_percentage),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
