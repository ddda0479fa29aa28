pub mod fasta;
pub mod seqtab;
pub mod sequence;

pub use sequence::Sequence;
