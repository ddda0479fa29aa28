use crate::bio::sequence::Sequence;
use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write sequences to a FASTA file, one unwrapped line per sequence
pub fn write_fasta<'a, P, I>(path: P, sequences: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Sequence>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let written = write_fasta_to_writer(&mut writer, sequences)?;
    writer.flush()?;
    Ok(written)
}

/// Write sequences to any writer
pub fn write_fasta_to_writer<'a, W, I>(writer: &mut W, sequences: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Sequence>,
{
    let mut written = 0;
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;
        writer.write_all(&seq.sequence)?;
        writeln!(writer)?;
        written += 1;
    }
    Ok(written)
}
