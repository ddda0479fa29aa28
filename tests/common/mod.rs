#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use asv_collapse::core::{ClusterMap, SequenceRegistry};
use asv_collapse::tools::Clusterer;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for cd-hit-est: groups sequences equal after upper-casing and
/// writes a `.clstr` report in cd-hit's layout.
pub const MOCK_CDHIT: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -i) IN="$2"; shift 2 ;;
    -o) OUT="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "mock cd-hit-est reading $IN"
awk '
/^>/ { id = substr($0, 2); next }
{
  key = toupper($0)
  if (!(key in cluster)) { cluster[key] = n++ }
  c = cluster[key]
  mark = (count[c] == 0) ? "*" : "at +/100.00%"
  members[c] = members[c] sprintf("%d\t%dnt, >%s... %s\n", count[c], length($0), id, mark)
  count[c]++
}
END { for (i = 0; i < n; i++) printf(">Cluster %d\n%s", i, members[i]) }
' "$IN" > "$OUT.clstr"
cp "$IN" "$OUT"
"#;

/// Exits with an error after complaining on stderr
pub const FAILING_CDHIT: &str = r#"#!/bin/sh
echo "Fatal Error: not enough memory" >&2
exit 1
"#;

/// Never finishes within a test timeout
pub const SLEEPING_CDHIT: &str = r#"#!/bin/sh
sleep 30
"#;

/// Succeeds without writing a cluster report
pub const SILENT_CDHIT: &str = r#"#!/bin/sh
exit 0
"#;

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn create_input_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Install an executable script and return its absolute path
    #[cfg(unix)]
    pub fn create_script(&self, name: &str, content: &str) -> Result<PathBuf> {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = self.path(name);
        {
            let mut file = fs::File::create(&path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Number of entries directly under the environment directory
    pub fn entries(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(self.temp_dir.path())?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect::<std::io::Result<_>>()?;
        names.sort();
        Ok(names)
    }
}

/// Four samples, five variants. `ACGTACGT` and `acgtacgt` are the same
/// variant written in different case; `TTGGCCAA` and `ttggccaa` likewise.
pub fn create_seqtab() -> String {
    ",ACGTACGT,TTGGCCAA,acgtacgt,GGGGCCCC,ttggccaa\n\
     S1,10,0,3,1,4\n\
     S2,0,7,12,0,0\n\
     S3,5,5,5,5,5\n\
     S4,0,0,0,0,0\n"
        .to_string()
}

/// Three copies of one variant with totals 10, 25 and 7
pub fn create_representative_seqtab() -> String {
    ",AAAACCCC,aaaacccc,AaAaCcCc\n\
     S1,4,20,7\n\
     S2,6,5,0\n"
        .to_string()
}

/// Sum of each data row of a delimited table
pub fn row_sums(table: &str, delimiter: char) -> Vec<u64> {
    table
        .lines()
        .skip(1)
        .map(|line| {
            line.split(delimiter)
                .skip(1)
                .map(|c| c.trim_matches('"').parse::<u64>().unwrap_or(0))
                .sum()
        })
        .collect()
}

/// Column headers of a delimited table, without the index label
pub fn columns(table: &str, delimiter: char) -> Vec<String> {
    table
        .lines()
        .next()
        .map(|h| h.split(delimiter).skip(1).map(|c| c.trim_matches('"').to_string()).collect())
        .unwrap_or_default()
}

pub fn asv_collapse_cmd() -> Command {
    Command::cargo_bin("asv-collapse").unwrap()
}

/// Clusterer returning a fixed membership regardless of input
pub struct FixedClusterer {
    pub clusters: ClusterMap,
}

impl FixedClusterer {
    pub fn new(groups: &[&[&str]]) -> Self {
        let clusters = groups
            .iter()
            .enumerate()
            .map(|(i, members)| {
                (
                    format!("cluster_{}", i),
                    members.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect();
        Self { clusters }
    }
}

impl Clusterer for FixedClusterer {
    fn cluster(&self, _registry: &SequenceRegistry) -> asv_collapse::Result<ClusterMap> {
        Ok(self.clusters.clone())
    }

    fn verify_installation(&self) -> asv_collapse::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
