//! Synthetic identifiers for variant sequences
//!
//! Clustering tools choke on 250 bp headers, so every variant gets a short
//! `asv_<column>` id for the duration of one run.

use crate::bio::sequence::Sequence;
use indexmap::IndexMap;
use std::collections::HashMap;

pub const ID_PREFIX: &str = "asv_";

#[derive(Debug, Clone, Default)]
pub struct SequenceRegistry {
    id_to_seq: IndexMap<String, String>,
    seq_to_id: HashMap<String, String>,
}

impl SequenceRegistry {
    /// Register sequences in the given order, numbering them from zero
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for (i, seq) in sequences.into_iter().enumerate() {
            let seq = seq.into();
            let id = format!("{}{}", ID_PREFIX, i);
            // Last write wins for repeated sequences
            registry.seq_to_id.insert(seq.clone(), id.clone());
            registry.id_to_seq.insert(id, seq);
        }
        registry
    }

    pub fn sequence(&self, id: &str) -> Option<&str> {
        self.id_to_seq.get(id).map(|s| s.as_str())
    }

    pub fn id(&self, sequence: &str) -> Option<&str> {
        self.seq_to_id.get(sequence).map(|s| s.as_str())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.id_to_seq.contains_key(id)
    }

    /// Position of an id in registration order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.id_to_seq.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.id_to_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_seq.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.id_to_seq.keys().map(|s| s.as_str())
    }

    /// (id, sequence) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.id_to_seq.iter().map(|(id, seq)| (id.as_str(), seq.as_str()))
    }

    /// Records for the clustering tool
    pub fn to_records(&self) -> Vec<Sequence> {
        self.iter().map(Sequence::from).collect()
    }

    /// Find the only id starting with `prefix`
    ///
    /// Used to undo identifier truncation done by external tools.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        let mut matches = self.ids().filter(|id| id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }
}
