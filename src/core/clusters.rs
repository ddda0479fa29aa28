//! Cluster membership returned by a clustering tool

use crate::core::registry::SequenceRegistry;
use crate::{CollapseError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Number of offending ids quoted in an inconsistency message
const MAX_REPORTED_IDS: usize = 5;

/// Ordered mapping of cluster id to ordered member ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMap {
    clusters: IndexMap<String, Vec<String>>,
}

impl ClusterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registered variant in a cluster of its own
    pub fn singletons(registry: &SequenceRegistry) -> Self {
        registry
            .ids()
            .enumerate()
            .map(|(i, id)| (format!("cluster_{}", i), vec![id.to_string()]))
            .collect()
    }

    pub fn insert(&mut self, cluster: String, members: Vec<String>) {
        self.clusters.insert(cluster, members);
    }

    /// Append a member, creating the cluster on first use
    pub fn push_member(&mut self, cluster: &str, member: String) {
        match self.clusters.get_mut(cluster) {
            Some(members) => members.push(member),
            None => {
                self.clusters.insert(cluster.to_string(), vec![member]);
            }
        }
    }

    pub fn get(&self, cluster: &str) -> Option<&[String]> {
        self.clusters.get(cluster).map(|m| m.as_slice())
    }

    /// Number of clusters
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of member entries across clusters
    pub fn n_members(&self) -> usize {
        self.clusters.values().map(|m| m.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.clusters.iter().map(|(id, members)| (id.as_str(), members.as_slice()))
    }

    /// Clusters that need a merge
    pub fn multi_member(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.iter().filter(|(_, members)| members.len() > 1)
    }

    /// Check that the clusters partition the registered variants
    ///
    /// Every registered id must appear in exactly one cluster, no unknown id
    /// may appear, and no cluster may be empty.
    pub fn verify_partition(&self, registry: &SequenceRegistry) -> Result<()> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(registry.len());
        let mut unknown = Vec::new();
        let mut empty = Vec::new();

        for (cluster, members) in self.iter() {
            if members.is_empty() {
                empty.push(cluster.to_string());
            }
            for member in members {
                if registry.contains_id(member) {
                    *seen.entry(member.as_str()).or_insert(0) += 1;
                } else {
                    unknown.push(member.clone());
                }
            }
        }

        let missing: Vec<String> = registry
            .ids()
            .filter(|id| !seen.contains_key(id))
            .map(String::from)
            .collect();
        let mut duplicated: Vec<String> = seen
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(id, _)| id.to_string())
            .collect();
        duplicated.sort_by_key(|id| registry.position(id));

        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(describe("missing from output", &missing));
        }
        if !duplicated.is_empty() {
            problems.push(describe("assigned to several clusters", &duplicated));
        }
        if !unknown.is_empty() {
            problems.push(describe("not in the input", &unknown));
        }
        if !empty.is_empty() {
            problems.push(describe("empty clusters", &empty));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CollapseError::ClusteringInconsistent(problems.join("; ")))
        }
    }
}

impl FromIterator<(String, Vec<String>)> for ClusterMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            clusters: iter.into_iter().collect(),
        }
    }
}

fn describe(what: &str, ids: &[String]) -> String {
    let shown: Vec<&str> = ids.iter().take(MAX_REPORTED_IDS).map(|s| s.as_str()).collect();
    let more = ids.len().saturating_sub(MAX_REPORTED_IDS);
    if more > 0 {
        format!("{} {}: {} (+{} more)", ids.len(), what, shown.join(", "), more)
    } else {
        format!("{} {}: {}", ids.len(), what, shown.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SequenceRegistry {
        SequenceRegistry::from_sequences(["AAAA", "CCCC", "GGGG", "TTTT"])
    }

    fn clusters(groups: &[&[&str]]) -> ClusterMap {
        groups
            .iter()
            .enumerate()
            .map(|(i, g)| (format!("cluster_{}", i), g.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_valid_partition() {
        let map = clusters(&[&["asv_0", "asv_2"], &["asv_1"], &["asv_3"]]);
        assert!(map.verify_partition(&registry()).is_ok());
        assert_eq!(map.len(), 3);
        assert_eq!(map.n_members(), 4);
        assert_eq!(map.multi_member().count(), 1);
    }

    #[test]
    fn test_singletons_partition() {
        let reg = registry();
        let map = ClusterMap::singletons(&reg);
        assert_eq!(map.len(), 4);
        assert!(map.verify_partition(&reg).is_ok());
    }

    #[test]
    fn test_missing_member() {
        let map = clusters(&[&["asv_0", "asv_2"], &["asv_1"]]);
        let err = map.verify_partition(&registry()).unwrap_err();
        match err {
            CollapseError::ClusteringInconsistent(msg) => {
                assert!(msg.contains("missing"), "{}", msg);
                assert!(msg.contains("asv_3"), "{}", msg);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_duplicated_member() {
        let map = clusters(&[&["asv_0", "asv_1"], &["asv_1", "asv_2"], &["asv_3"]]);
        let err = map.verify_partition(&registry()).unwrap_err();
        assert!(matches!(err, CollapseError::ClusteringInconsistent(ref m) if m.contains("asv_1")));
    }

    #[test]
    fn test_unknown_member() {
        let map = clusters(&[&["asv_0", "asv_1", "asv_2", "asv_3", "asv_9"]]);
        let err = map.verify_partition(&registry()).unwrap_err();
        assert!(matches!(err, CollapseError::ClusteringInconsistent(ref m) if m.contains("asv_9")));
    }

    #[test]
    fn test_push_member_keeps_order() {
        let mut map = ClusterMap::new();
        map.push_member("cluster_0", "asv_2".to_string());
        map.push_member("cluster_1", "asv_1".to_string());
        map.push_member("cluster_0", "asv_0".to_string());
        assert_eq!(map.get("cluster_0"), Some(&["asv_2".to_string(), "asv_0".to_string()][..]));
        assert_eq!(map.iter().map(|(c, _)| c).collect::<Vec<_>>(), vec!["cluster_0", "cluster_1"]);
    }
}
