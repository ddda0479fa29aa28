//! Collapse of clustered variants into one representative column per cluster

use crate::core::{clusters::ClusterMap, matrix::AbundanceMatrix, registry::SequenceRegistry};
use crate::{CollapseError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How to choose between members sharing the highest total abundance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Earliest member in the cluster's membership list
    #[default]
    FirstSeen,
    /// Lexicographically smallest sequence
    Lexicographic,
    /// Earliest column of the input matrix
    InputOrder,
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-seen" | "first_seen" | "first" => Ok(TieBreak::FirstSeen),
            "lexicographic" | "lex" => Ok(TieBreak::Lexicographic),
            "input-order" | "input_order" | "input" => Ok(TieBreak::InputOrder),
            _ => Err(format!("Unknown tie-break strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TieBreak::FirstSeen => "first-seen",
            TieBreak::Lexicographic => "lexicographic",
            TieBreak::InputOrder => "input-order",
        };
        write!(f, "{}", name)
    }
}

/// One variant folded into its cluster representative
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeEvent {
    pub cluster: String,
    pub member_id: String,
    pub member: String,
    pub representative_id: String,
    pub representative: String,
    /// Total abundance moved from the member
    pub abundance: u128,
}

/// Summary of a collapse run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollapseReport {
    pub samples: usize,
    pub input_variants: usize,
    pub output_variants: usize,
    pub clusters: usize,
    pub merged_clusters: usize,
    pub tie_break: TieBreak,
    pub merges: Vec<MergeEvent>,
}

impl CollapseReport {
    pub fn removed_variants(&self) -> usize {
        self.input_variants - self.output_variants
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collapser {
    tie_break: TieBreak,
}

impl Collapser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Index into `members` of the cluster representative
    ///
    /// The representative has the strictly highest total abundance. Members
    /// tied at the maximum, including all-zero clusters, are resolved by the
    /// tie-break strategy.
    pub fn select_representative(
        &self,
        matrix: &AbundanceMatrix,
        registry: &SequenceRegistry,
        members: &[String],
    ) -> Result<usize> {
        let mut best: Option<(usize, u128)> = None;

        for (i, id) in members.iter().enumerate() {
            let sequence = lookup_sequence(registry, id)?;
            let total = matrix.column_total(sequence).ok_or_else(|| {
                CollapseError::ClusteringInconsistent(format!(
                    "variant {} is not a column of the matrix",
                    id
                ))
            })?;

            best = match best {
                None => Some((i, total)),
                Some((_, best_total)) if total > best_total => Some((i, total)),
                Some((j, best_total)) if total == best_total && self.prefer(registry, members, i, j)? => {
                    Some((i, total))
                }
                keep => keep,
            };
        }

        best.map(|(i, _)| i).ok_or_else(|| {
            CollapseError::ClusteringInconsistent("cannot pick a representative for an empty cluster".to_string())
        })
    }

    /// Whether member `i` wins a tie against the current pick `j`
    fn prefer(&self, registry: &SequenceRegistry, members: &[String], i: usize, j: usize) -> Result<bool> {
        Ok(match self.tie_break {
            TieBreak::FirstSeen => false,
            TieBreak::Lexicographic => {
                lookup_sequence(registry, &members[i])? < lookup_sequence(registry, &members[j])?
            }
            TieBreak::InputOrder => registry.position(&members[i]) < registry.position(&members[j]),
        })
    }

    /// Merge every multi-member cluster into its representative
    ///
    /// The clusters must partition the registered variants. The matrix is
    /// left with one column per cluster; row totals are unchanged.
    pub fn collapse(
        &self,
        matrix: &mut AbundanceMatrix,
        clusters: &ClusterMap,
        registry: &SequenceRegistry,
    ) -> Result<CollapseReport> {
        clusters.verify_partition(registry)?;
        if registry.len() != matrix.n_variants() {
            return Err(CollapseError::ClusteringInconsistent(format!(
                "{} variants were clustered but the matrix has {}",
                registry.len(),
                matrix.n_variants()
            )));
        }

        let input_variants = matrix.n_variants();
        let row_totals = matrix.row_totals();
        let mut merges = Vec::new();
        let mut merged_clusters = 0;

        for (cluster, members) in clusters.multi_member() {
            let rep = self.select_representative(matrix, registry, members)?;
            let representative_id = &members[rep];
            let representative = lookup_sequence(registry, representative_id)?;
            debug!(
                "{}: {} members, representative {}",
                cluster,
                members.len(),
                representative_id
            );

            for (i, member_id) in members.iter().enumerate() {
                if i == rep {
                    continue;
                }
                let member = lookup_sequence(registry, member_id)?;
                let abundance = matrix.merge_into(member, representative)?;
                info!("ASV `{}` was collapsed into ASV `{}`", member, representative);

                merges.push(MergeEvent {
                    cluster: cluster.to_string(),
                    member_id: member_id.clone(),
                    member: member.to_string(),
                    representative_id: representative_id.clone(),
                    representative: representative.to_string(),
                    abundance,
                });
            }
            merged_clusters += 1;
        }

        debug_assert_eq!(row_totals, matrix.row_totals());
        debug_assert_eq!(matrix.n_variants(), clusters.len());

        Ok(CollapseReport {
            samples: matrix.n_samples(),
            input_variants,
            output_variants: matrix.n_variants(),
            clusters: clusters.len(),
            merged_clusters,
            tie_break: self.tie_break,
            merges,
        })
    }
}

fn lookup_sequence<'a>(registry: &'a SequenceRegistry, id: &str) -> Result<&'a str> {
    registry
        .sequence(id)
        .ok_or_else(|| CollapseError::ClusteringInconsistent(format!("unknown variant id {}", id)))
}
