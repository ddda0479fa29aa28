//! Samples-by-variants abundance matrix
//!
//! Abundances are stored column-major, one count vector per variant keyed by
//! its literal sequence. Column order follows the input file and survives
//! removals, so writing the matrix back is deterministic.

use crate::{CollapseError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbundanceMatrix {
    index_label: String,
    samples: Vec<String>,
    columns: IndexMap<String, Vec<u64>>,
}

impl AbundanceMatrix {
    /// Create an empty matrix with the given sample rows
    pub fn new(index_label: impl Into<String>, samples: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if !seen.insert(sample.as_str()) {
                return Err(CollapseError::MalformedInput(format!(
                    "duplicate sample identifier '{}'",
                    sample
                )));
            }
        }

        Ok(Self {
            index_label: index_label.into(),
            samples,
            columns: IndexMap::new(),
        })
    }

    /// Build a matrix from row-major data as it appears in a seqtab file
    pub fn from_rows(
        index_label: impl Into<String>,
        sequences: Vec<String>,
        rows: Vec<(String, Vec<u64>)>,
    ) -> Result<Self> {
        let samples: Vec<String> = rows.iter().map(|(sample, _)| sample.clone()).collect();
        let mut matrix = Self::new(index_label, samples)?;

        for (sample, counts) in &rows {
            if counts.len() != sequences.len() {
                return Err(CollapseError::MalformedInput(format!(
                    "sample '{}' has {} values but the header lists {} variants",
                    sample,
                    counts.len(),
                    sequences.len()
                )));
            }
            counts.iter().try_fold(0u64, |acc, &c| acc.checked_add(c)).ok_or_else(|| {
                CollapseError::MalformedInput(format!(
                    "total abundance of sample '{}' overflows a 64-bit counter",
                    sample
                ))
            })?;
        }

        for (col, sequence) in sequences.into_iter().enumerate() {
            let counts = rows.iter().map(|(_, values)| values[col]).collect();
            matrix.push_column(sequence, counts)?;
        }

        Ok(matrix)
    }

    /// Append a variant column
    pub fn push_column(&mut self, sequence: String, counts: Vec<u64>) -> Result<()> {
        if sequence.is_empty() {
            return Err(CollapseError::MalformedInput(
                "empty variant sequence in header".to_string(),
            ));
        }
        if counts.len() != self.samples.len() {
            return Err(CollapseError::MalformedInput(format!(
                "variant column has {} values for {} samples",
                counts.len(),
                self.samples.len()
            )));
        }
        if self.columns.contains_key(&sequence) {
            return Err(CollapseError::MalformedInput(format!(
                "duplicate variant sequence '{}'",
                sequence
            )));
        }
        self.columns.insert(sequence, counts);
        Ok(())
    }

    pub fn index_label(&self) -> &str {
        &self.index_label
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_variants(&self) -> usize {
        self.columns.len()
    }

    /// Variant sequences in column order
    pub fn sequences(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn column(&self, sequence: &str) -> Option<&[u64]> {
        self.columns.get(sequence).map(|v| v.as_slice())
    }

    /// Sum of a variant's abundance across all samples
    pub fn column_total(&self, sequence: &str) -> Option<u128> {
        self.columns
            .get(sequence)
            .map(|counts| counts.iter().map(|&c| c as u128).sum())
    }

    /// Sum of each sample's abundance across all variants
    pub fn row_totals(&self) -> Vec<u128> {
        let mut totals = vec![0u128; self.samples.len()];
        for counts in self.columns.values() {
            for (total, &c) in totals.iter_mut().zip(counts) {
                *total += c as u128;
            }
        }
        totals
    }

    /// Values of one sample row in column order
    pub fn row(&self, index: usize) -> impl Iterator<Item = u64> + '_ {
        self.columns.values().map(move |counts| counts[index])
    }

    /// Add `from` elementwise into `into`, then drop the `from` column
    ///
    /// Returns the abundance moved.
    pub fn merge_into(&mut self, from: &str, into: &str) -> Result<u128> {
        if from == into {
            return Ok(0);
        }
        let source = self.columns.get(from).ok_or_else(|| {
            CollapseError::ClusteringInconsistent(format!("variant '{}' is not in the matrix", from))
        })?;
        let target = self.columns.get(into).ok_or_else(|| {
            CollapseError::ClusteringInconsistent(format!("variant '{}' is not in the matrix", into))
        })?;

        let mut merged = Vec::with_capacity(target.len());
        for (sample, (&t, &s)) in self.samples.iter().zip(target.iter().zip(source)) {
            let sum = t.checked_add(s).ok_or_else(|| {
                CollapseError::MalformedInput(format!(
                    "abundance of sample '{}' overflows a 64-bit counter",
                    sample
                ))
            })?;
            merged.push(sum);
        }

        let moved = source.iter().map(|&c| c as u128).sum();
        self.columns.insert(into.to_string(), merged);
        self.columns.shift_remove(from);
        Ok(moved)
    }
}
