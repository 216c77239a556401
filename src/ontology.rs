//! Ontology: the fixed identity space every phase routes questions through.
//!
//! Ten policy areas, six dimensions, four clusters partitioning the policy
//! areas, and the `(policy_area, dimension)` coordinate that names one of
//! the 60 chunks in the Canon Policy Package.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const POLICY_AREA_COUNT: usize = 10;
pub const DIMENSION_COUNT: usize = 6;
pub const CLUSTER_COUNT: usize = 4;
pub const QUESTIONS_PER_CHUNK: usize = 5;
pub const TOTAL_MICRO_QUESTIONS: usize = POLICY_AREA_COUNT * DIMENSION_COUNT * QUESTIONS_PER_CHUNK;

/// One of the ten policy areas, `PA01`..`PA10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyAreaId(u8);

impl PolicyAreaId {
    pub fn new(n: u8) -> Result<Self> {
        if (1..=POLICY_AREA_COUNT as u8).contains(&n) {
            Ok(Self(n))
        } else {
            Err(Error::validation(
                "ontology",
                format!("policy area index {n} out of range 1..={POLICY_AREA_COUNT}"),
            ))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Parse `"PA03"` style identifiers.
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("PA").ok_or_else(|| {
            Error::validation("ontology", format!("'{s}' is not a policy area id"))
        })?;
        let n: u8 = digits
            .parse()
            .map_err(|_| Error::validation("ontology", format!("'{s}' has no numeric suffix")))?;
        Self::new(n)
    }
}

impl fmt::Display for PolicyAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA{:02}", self.0)
    }
}

/// One of the six scoring dimensions, `DIM01`..`DIM06`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DimensionId(u8);

impl DimensionId {
    pub fn new(n: u8) -> Result<Self> {
        if (1..=DIMENSION_COUNT as u8).contains(&n) {
            Ok(Self(n))
        } else {
            Err(Error::validation(
                "ontology",
                format!("dimension index {n} out of range 1..={DIMENSION_COUNT}"),
            ))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Normalize a dimension alias into canonical `DIM0N` form.
    ///
    /// Accepts both the canonical `DIM01`..`DIM06` spelling and the short
    /// `D1`..`D6` alias the questionnaire's source data uses interchangeably:
    /// strip the leading `D` (or `DIM`), parse the trailing digits, reject
    /// anything that doesn't round-trip to a single positive integer.
    pub fn normalize(raw: &str) -> Result<Self> {
        let digits = if let Some(rest) = raw.strip_prefix("DIM") {
            rest
        } else if let Some(rest) = raw.strip_prefix('D') {
            rest
        } else {
            return Err(Error::validation(
                "ontology",
                format!("'{raw}' is not a recognized dimension alias"),
            ));
        };
        let n: u8 = digits.parse().map_err(|_| {
            Error::validation(
                "ontology",
                format!("'{raw}' has no numeric dimension suffix"),
            )
        })?;
        Self::new(n)
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DIM{:02}", self.0)
    }
}

/// One of the four clusters partitioning the ten policy areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(u8);

impl ClusterId {
    pub fn new(n: u8) -> Result<Self> {
        if (1..=CLUSTER_COUNT as u8).contains(&n) {
            Ok(Self(n))
        } else {
            Err(Error::validation(
                "ontology",
                format!("cluster index {n} out of range 1..={CLUSTER_COUNT}"),
            ))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CL{:02}", self.0)
    }
}

/// The fixed, hermetic partition of policy areas into clusters.
///
/// A partition: every policy area belongs to exactly one cluster, and every
/// cluster has at least one member. `cluster_of` is the inverse lookup built
/// once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterPartition {
    members: Vec<(ClusterId, Vec<PolicyAreaId>)>,
}

impl ClusterPartition {
    /// Build from an explicit assignment; validates that it is a hermetic
    /// partition of all ten policy areas across the four clusters.
    pub fn new(assignment: Vec<(ClusterId, Vec<PolicyAreaId>)>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for (_, pas) in &assignment {
            for pa in pas {
                if !seen.insert(*pa) {
                    return Err(Error::validation(
                        "ontology",
                        format!("policy area {pa} assigned to more than one cluster"),
                    ));
                }
            }
        }
        if seen.len() != POLICY_AREA_COUNT {
            return Err(Error::validation(
                "ontology",
                format!(
                    "cluster partition covers {} policy areas, expected {POLICY_AREA_COUNT}",
                    seen.len()
                ),
            ));
        }
        let mut cluster_ids = std::collections::HashSet::new();
        for (cl, pas) in &assignment {
            if pas.is_empty() {
                return Err(Error::validation(
                    "ontology",
                    format!("cluster {cl} has no member policy areas"),
                ));
            }
            if !cluster_ids.insert(*cl) {
                return Err(Error::validation(
                    "ontology",
                    format!("cluster {cl} listed more than once"),
                ));
            }
        }
        if cluster_ids.len() != CLUSTER_COUNT {
            return Err(Error::validation(
                "ontology",
                format!(
                    "partition names {} clusters, expected {CLUSTER_COUNT}",
                    cluster_ids.len()
                ),
            ));
        }
        Ok(Self {
            members: assignment,
        })
    }

    /// The default partition: four contiguous bands of policy areas.
    pub fn default_partition() -> Self {
        let band = |cl: u8, lo: u8, hi: u8| {
            (
                ClusterId::new(cl).expect("cluster id in range"),
                (lo..=hi)
                    .map(|n| PolicyAreaId::new(n).expect("policy area id in range"))
                    .collect::<Vec<_>>(),
            )
        };
        Self::new(vec![band(1, 1, 3), band(2, 4, 5), band(3, 6, 8), band(4, 9, 10)])
            .expect("default partition is hermetic by construction")
    }

    pub fn cluster_of(&self, pa: PolicyAreaId) -> Option<ClusterId> {
        self.members
            .iter()
            .find(|(_, pas)| pas.contains(&pa))
            .map(|(cl, _)| *cl)
    }

    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.members.iter().map(|(cl, _)| *cl)
    }

    pub fn policy_areas_in(&self, cluster: ClusterId) -> &[PolicyAreaId] {
        self.members
            .iter()
            .find(|(cl, _)| *cl == cluster)
            .map(|(_, pas)| pas.as_slice())
            .unwrap_or(&[])
    }
}

/// A `(policy_area, dimension)` coordinate: one of the 60 chunk slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseSlot {
    pub policy_area_id: PolicyAreaId,
    pub dimension_id: DimensionId,
}

impl BaseSlot {
    pub fn new(policy_area_id: PolicyAreaId, dimension_id: DimensionId) -> Self {
        Self {
            policy_area_id,
            dimension_id,
        }
    }

    pub fn chunk_id(&self) -> String {
        format!("{}-{}", self.policy_area_id, self.dimension_id)
    }
}

impl fmt::Display for BaseSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chunk_id())
    }
}

/// Identity of one micro-question: its position in the fixed 1..=300
/// numbering plus the slot it belongs to and its ordinal within that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MicroQuestionId {
    pub question_global: u16,
    pub slot: BaseSlot,
    pub slot_ordinal: u8,
}

impl MicroQuestionId {
    pub fn new(question_global: u16, slot: BaseSlot, slot_ordinal: u8) -> Result<Self> {
        if question_global == 0 || question_global as usize > TOTAL_MICRO_QUESTIONS {
            return Err(Error::validation(
                "ontology",
                format!(
                    "question_global {question_global} out of range 1..={TOTAL_MICRO_QUESTIONS}"
                ),
            ));
        }
        if slot_ordinal == 0 || slot_ordinal as usize > QUESTIONS_PER_CHUNK {
            return Err(Error::validation(
                "ontology",
                format!(
                    "slot_ordinal {slot_ordinal} out of range 1..={QUESTIONS_PER_CHUNK} for {slot}"
                ),
            ));
        }
        Ok(Self {
            question_global,
            slot,
            slot_ordinal,
        })
    }

    /// Canonical task id: `MQC-{global:03}_{policy_area}`.
    pub fn task_id(&self) -> String {
        format!("MQC-{:03}_{}", self.question_global, self.slot.policy_area_id)
    }
}

/// Sort a set of micro-question ids by `(policy_area_id, question_global)`,
/// the canonical ordering used for artifact emission and logging.
pub fn sort_by_policy_area_then_global(ids: &mut [MicroQuestionId]) {
    ids.sort_by_key(|id| (id.slot.policy_area_id, id.question_global));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_area_parse_and_display() {
        let pa = PolicyAreaId::parse("PA07").unwrap();
        assert_eq!(pa.index(), 7);
        assert_eq!(pa.to_string(), "PA07");
    }

    #[test]
    fn test_policy_area_out_of_range() {
        assert!(PolicyAreaId::new(0).is_err());
        assert!(PolicyAreaId::new(11).is_err());
    }

    #[test]
    fn test_dimension_normalize_short_alias() {
        let d = DimensionId::normalize("D1").unwrap();
        assert_eq!(d.to_string(), "DIM01");
    }

    #[test]
    fn test_dimension_normalize_canonical_form() {
        let d = DimensionId::normalize("DIM06").unwrap();
        assert_eq!(d.index(), 6);
    }

    #[test]
    fn test_dimension_normalize_rejects_garbage() {
        assert!(DimensionId::normalize("dimension-one").is_err());
        assert!(DimensionId::normalize("D7").is_err());
        assert!(DimensionId::normalize("D0").is_err());
    }

    #[test]
    fn test_default_partition_is_hermetic() {
        let partition = ClusterPartition::default_partition();
        let mut seen = std::collections::HashSet::new();
        for n in 1..=POLICY_AREA_COUNT as u8 {
            let pa = PolicyAreaId::new(n).unwrap();
            let cl = partition.cluster_of(pa).expect("every PA has a cluster");
            seen.insert(pa);
            assert!(partition.policy_areas_in(cl).contains(&pa));
        }
        assert_eq!(seen.len(), POLICY_AREA_COUNT);
    }

    #[test]
    fn test_cluster_partition_rejects_duplicate_assignment() {
        let pa1 = PolicyAreaId::new(1).unwrap();
        let assignment = vec![
            (ClusterId::new(1).unwrap(), vec![pa1]),
            (ClusterId::new(2).unwrap(), vec![pa1]),
        ];
        assert!(ClusterPartition::new(assignment).is_err());
    }

    #[test]
    fn test_base_slot_chunk_id() {
        let slot = BaseSlot::new(PolicyAreaId::new(3).unwrap(), DimensionId::new(2).unwrap());
        assert_eq!(slot.chunk_id(), "PA03-DIM02");
    }

    #[test]
    fn test_micro_question_task_id_format() {
        let slot = BaseSlot::new(PolicyAreaId::new(9).unwrap(), DimensionId::new(4).unwrap());
        let id = MicroQuestionId::new(128, slot, 3).unwrap();
        assert_eq!(id.task_id(), "MQC-128_PA09");
    }

    #[test]
    fn test_micro_question_rejects_out_of_range_global() {
        let slot = BaseSlot::new(PolicyAreaId::new(1).unwrap(), DimensionId::new(1).unwrap());
        assert!(MicroQuestionId::new(0, slot, 1).is_err());
        assert!(MicroQuestionId::new(301, slot, 1).is_err());
        assert!(MicroQuestionId::new(1, slot, 6).is_err());
    }

    #[test]
    fn test_sort_by_policy_area_then_global() {
        let slot_a = BaseSlot::new(PolicyAreaId::new(2).unwrap(), DimensionId::new(1).unwrap());
        let slot_b = BaseSlot::new(PolicyAreaId::new(1).unwrap(), DimensionId::new(1).unwrap());
        let mut ids = vec![
            MicroQuestionId::new(10, slot_a, 1).unwrap(),
            MicroQuestionId::new(5, slot_b, 1).unwrap(),
        ];
        sort_by_policy_area_then_global(&mut ids);
        assert_eq!(ids[0].slot.policy_area_id.index(), 1);
        assert_eq!(ids[1].slot.policy_area_id.index(), 2);
    }
}
