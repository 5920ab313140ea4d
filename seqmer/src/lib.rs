mod encoder;
mod fasta;
mod fastq;
mod feat;
mod parallel;
mod reader;
mod seq;
mod spacer;

pub use encoder::*;
pub use fasta::*;
pub use fastq::*;
pub use feat::*;
pub use parallel::*;
pub use reader::*;
pub use seq::*;
pub use spacer::*;
