//! Reading and writing DADA2-style sequence tables
//!
//! Rows are samples, columns are variant sequences. The first header cell is
//! the index label (usually empty) and is written back unchanged.

use crate::core::matrix::AbundanceMatrix;
use crate::{CollapseError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

/// Delimiter to use for `path`, honouring an explicit override
///
/// `.tsv`, `.tab` and `.txt` files are tab separated, everything else is
/// comma separated. A trailing `.gz` is ignored.
pub fn delimiter_for(path: &Path, explicit: Option<char>) -> u8 {
    if let Some(d) = explicit {
        return d as u8;
    }
    let stem = if is_gzipped(path) {
        path.file_stem().map(Path::new).unwrap_or(path)
    } else {
        path
    };
    match stem.extension().and_then(|s| s.to_str()).map(|s| s.to_lowercase()) {
        Some(ext) if ext == "tsv" || ext == "tab" || ext == "txt" => b'\t',
        _ => b',',
    }
}

/// Load a sequence table (supports .gz compression)
pub fn read_seqtab<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> Result<AbundanceMatrix> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    read_seqtab_from_reader(reader, delimiter_for(path, delimiter))
}

/// Parse a sequence table from any reader
pub fn read_seqtab_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<AbundanceMatrix> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(CollapseError::MalformedInput("table is empty".to_string())),
    };

    let mut header_cells = header.iter().map(|cell| cell.trim().to_string());
    let index_label = header_cells.next().unwrap_or_default();
    let sequences: Vec<String> = header_cells.collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let mut cells = record.iter();
        let sample = cells.next().map(str::trim).unwrap_or_default();
        if sample.is_empty() {
            return Err(CollapseError::MalformedInput(format!(
                "line {}: missing sample identifier",
                line
            )));
        }

        let counts = cells
            .enumerate()
            .map(|(col, cell)| {
                cell.trim().parse::<u64>().map_err(|_| {
                    CollapseError::MalformedInput(format!(
                        "line {}, sample '{}', column {}: '{}' is not a non-negative integer",
                        line,
                        sample,
                        col + 2,
                        cell
                    ))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        rows.push((sample.to_string(), counts));
    }

    AbundanceMatrix::from_rows(index_label, sequences, rows)
}

/// Write a sequence table to any writer
pub fn write_seqtab_to_writer<W: Write>(writer: W, matrix: &AbundanceMatrix, delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    let mut header = Vec::with_capacity(matrix.n_variants() + 1);
    header.push(matrix.index_label());
    header.extend(matrix.sequences());
    csv_writer.write_record(&header)?;

    for (i, sample) in matrix.samples().iter().enumerate() {
        let mut row = Vec::with_capacity(matrix.n_variants() + 1);
        row.push(sample.clone());
        row.extend(matrix.row(i).map(|c| c.to_string()));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Temporary file in the directory that will receive `path`
pub fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok(NamedTempFile::new_in(parent)?)
}

/// Move a staged file onto its destination
pub fn persist_staged(staged: NamedTempFile, path: &Path) -> Result<()> {
    staged.persist(path).map_err(|e| CollapseError::Io(e.error))?;
    Ok(())
}

/// Write a sequence table beside `path` without moving it into place
/// (supports .gz compression)
///
/// The caller persists the returned file once the run has succeeded, so
/// `path` either holds the complete table or is left untouched. Dropping the
/// returned file discards the table.
pub fn stage_seqtab(path: &Path, matrix: &AbundanceMatrix, delimiter: Option<char>) -> Result<NamedTempFile> {
    let delimiter = delimiter_for(path, delimiter);
    let mut staged = staging_file(path)?;
    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(staged.as_file_mut()), Compression::default());
        write_seqtab_to_writer(&mut encoder, matrix, delimiter)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(staged.as_file_mut());
        write_seqtab_to_writer(&mut writer, matrix, delimiter)?;
        writer.flush()?;
    }

    Ok(staged)
}
