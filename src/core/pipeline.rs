//! End-to-end collapse of a sequence table

use crate::bio::seqtab::{persist_staged, read_seqtab, stage_seqtab, staging_file};
use crate::core::{
    clusters::ClusterMap,
    collapser::{CollapseReport, Collapser},
    config::Config,
    registry::SequenceRegistry,
};
use crate::tools::{cdhit::CdHitClusterer, traits::Clusterer};
use crate::{CollapseError, Result};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Reads a table, clusters its variants, collapses and writes the result
pub struct Pipeline {
    config: Config,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config, cancel: None }
    }

    /// Stop the external clustering run when `flag` is raised
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Collapse `input` into `output` using cd-hit-est
    ///
    /// The clustering tool is resolved before the table is read, so a missing
    /// installation is reported without touching any data.
    pub fn run(&self, input: &Path, output: &Path) -> Result<CollapseReport> {
        self.config.validate()?;
        let mut clusterer = CdHitClusterer::new(&self.config.clustering)?;
        if let Some(flag) = &self.cancel {
            clusterer = clusterer.with_cancel_flag(flag.clone());
        }
        clusterer.verify_installation()?;

        self.run_with_clusterer(&clusterer, input, output)
    }

    /// Collapse `input` into `output` with an arbitrary clustering backend
    ///
    /// Nothing is written unless every step succeeds: the table and the
    /// optional report are staged beside their destinations and only moved
    /// into place at the end.
    pub fn run_with_clusterer(
        &self,
        clusterer: &dyn Clusterer,
        input: &Path,
        output: &Path,
    ) -> Result<CollapseReport> {
        self.config.validate()?;
        let start = Instant::now();
        let delimiter = self.config.output.delimiter;

        info!("Reading sequence table from {:?}", input);
        let mut matrix = read_seqtab(input, delimiter)?;
        info!(
            "Loaded {} samples x {} ASVs",
            matrix.n_samples(),
            matrix.n_variants()
        );

        let registry = SequenceRegistry::from_sequences(matrix.sequences());

        let clusters = if registry.len() <= 1 {
            debug!("{} ASV(s), skipping {}", registry.len(), clusterer.name());
            ClusterMap::singletons(&registry)
        } else {
            clusterer.cluster(&registry)?
        };
        self.check_cancelled()?;
        clusters.verify_partition(&registry)?;
        info!(
            "{} ASVs fall into {} clusters ({} with more than one member)",
            registry.len(),
            clusters.len(),
            clusters.multi_member().count()
        );

        let collapser = Collapser::new().with_tie_break(self.config.collapse.tie_break);
        let report = collapser.collapse(&mut matrix, &clusters, &registry)?;

        self.check_cancelled()?;

        let staged_table = stage_seqtab(output, &matrix, delimiter)?;
        let staged_report = match &self.config.output.report {
            Some(path) => Some((stage_report(path, &report)?, path)),
            None => None,
        };
        self.check_cancelled()?;

        persist_staged(staged_table, output)?;
        info!(
            "Wrote {} ASVs ({} collapsed) to {:?} in {:.2}s",
            report.output_variants,
            report.removed_variants(),
            output,
            start.elapsed().as_secs_f64()
        );
        if let Some((staged, path)) = staged_report {
            persist_staged(staged, path)?;
            info!("Collapse report written to {:?}", path);
        }

        Ok(report)
    }

    /// Fail with `Cancelled` once an interrupt has been received
    fn check_cancelled(&self) -> Result<()> {
        let cancelled = self
            .cancel
            .as_ref()
            .map(|flag| flag.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap_or(false);
        if cancelled {
            return Err(CollapseError::Cancelled);
        }
        Ok(())
    }
}

/// Write the collapse report as pretty-printed JSON beside `path`
pub fn stage_report(path: &Path, report: &CollapseReport) -> Result<NamedTempFile> {
    let json = serde_json::to_string_pretty(report)?;
    let mut staged = staging_file(path)?;
    staged.write_all(json.as_bytes())?;
    staged.flush()?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Groups sequences that are byte-identical after upper-casing
    struct CaseInsensitive;

    impl Clusterer for CaseInsensitive {
        fn cluster(&self, registry: &SequenceRegistry) -> Result<ClusterMap> {
            let mut groups: Vec<(String, Vec<String>)> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();
            for (id, seq) in registry.iter() {
                let key = seq.to_uppercase();
                match index.get(&key) {
                    Some(&i) => groups[i].1.push(id.to_string()),
                    None => {
                        index.insert(key, groups.len());
                        groups.push((format!("cluster_{}", groups.len()), vec![id.to_string()]));
                    }
                }
            }
            Ok(groups.into_iter().collect())
        }

        fn verify_installation(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "case-insensitive"
        }
    }

    /// Fails the run if it is ever asked to cluster
    struct Unreachable;

    impl Clusterer for Unreachable {
        fn cluster(&self, _registry: &SequenceRegistry) -> Result<ClusterMap> {
            Err(CollapseError::ClusteringFailed("should not be called".to_string()))
        }

        fn verify_installation(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    #[test]
    fn test_run_with_clusterer() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        std::fs::write(&input, ",ACGT,TTGA,acgt\nS1,1,4,5\nS2,2,0,0\n").unwrap();

        let report = Pipeline::new(Config::default())
            .run_with_clusterer(&CaseInsensitive, &input, &output)
            .unwrap();

        assert_eq!(report.removed_variants(), 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            ",TTGA,acgt\nS1,4,6\nS2,0,2\n"
        );
    }

    #[test]
    fn test_single_variant_skips_clustering() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.tsv");
        let output = dir.path().join("collapsed.tsv");
        std::fs::write(&input, "\tACGT\nS1\t3\n").unwrap();

        let report = Pipeline::new(Config::default())
            .run_with_clusterer(&Unreachable, &input, &output)
            .unwrap();

        assert_eq!(report.output_variants, 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "\tACGT\nS1\t3\n");
    }

    #[test]
    fn test_report_is_written() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        let report_path = dir.path().join("report.json");
        std::fs::write(&input, ",ACGT,acgt\nS1,1,5\n").unwrap();

        let mut config = Config::default();
        config.output.report = Some(report_path.clone());
        Pipeline::new(config)
            .run_with_clusterer(&CaseInsensitive, &input, &output)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["output_variants"], 1);
        assert_eq!(json["merges"][0]["member"], "ACGT");
        assert_eq!(json["merges"][0]["representative"], "acgt");
        assert_eq!(json["tie_break"], "first-seen");
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        std::fs::write(&input, ",ACGT,acgt\nS1,1,5\n").unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let err = Pipeline::new(Config::default())
            .with_cancel_flag(flag)
            .run_with_clusterer(&CaseInsensitive, &input, &output)
            .unwrap_err();

        assert!(matches!(err, CollapseError::Cancelled));
        assert!(!output.exists());
    }

    /// Raises the interrupt flag while clustering, as a signal would
    struct InterruptedMidRun {
        flag: Arc<AtomicBool>,
    }

    impl Clusterer for InterruptedMidRun {
        fn cluster(&self, registry: &SequenceRegistry) -> Result<ClusterMap> {
            self.flag.store(true, std::sync::atomic::Ordering::SeqCst);
            CaseInsensitive.cluster(registry)
        }

        fn verify_installation(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "interrupted"
        }
    }

    #[test]
    fn test_interrupt_during_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        std::fs::write(&input, ",ACGT,acgt\nS1,1,5\n").unwrap();

        let mut config = Config::default();
        config.output.report = Some(dir.path().join("report.json"));
        let flag = Arc::new(AtomicBool::new(false));
        let clusterer = InterruptedMidRun { flag: flag.clone() };

        let err = Pipeline::new(config)
            .with_cancel_flag(flag)
            .run_with_clusterer(&clusterer, &input, &output)
            .unwrap_err();

        assert!(matches!(err, CollapseError::Cancelled));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_report_failure_leaves_no_table() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        std::fs::write(&input, ",ACGT,acgt\nS1,1,5\n").unwrap();

        let mut config = Config::default();
        config.output.report = Some(dir.path().join("no_such_dir").join("report.json"));
        let err = Pipeline::new(config)
            .run_with_clusterer(&CaseInsensitive, &input, &output)
            .unwrap_err();

        assert!(matches!(err, CollapseError::Io(_)));
        assert!(!output.exists());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_config_is_validated() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("seqtab.csv");
        let output = dir.path().join("collapsed.csv");
        std::fs::write(&input, ",ACGT,acgt\nS1,1,5\n").unwrap();

        let mut config = Config::default();
        config.output.delimiter = Some('é');
        let err = Pipeline::new(config)
            .run_with_clusterer(&CaseInsensitive, &input, &output)
            .unwrap_err();

        assert!(matches!(err, CollapseError::Config(_)));
        assert!(!output.exists());
    }
}
