use crate::classify::OutputFlags;
use crate::options::parse_scheme;
use clap::Parser;
use seqmer::{Encoder, ScoreScheme, Spacer};
use std::io::{Error, ErrorKind, Result};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Build a classification database from a reference library")]
pub struct BuildArgs {
    /// Reference library: a FASTA file or a directory scanned for
    /// .fa/.fna/.fasta (optionally gzipped)
    #[arg(long, required = true)]
    pub source: PathBuf,

    /// Database output directory
    #[arg(long = "db", required = true)]
    pub database: PathBuf,

    /// Sequence id to taxon map file
    #[arg(long = "seqid2taxid", required = true)]
    pub id_to_taxon_map_filename: PathBuf,

    /// NCBI taxonomy nodes.dmp
    #[arg(long = "nodes", required = true)]
    pub nodes_filename: PathBuf,

    /// Set length of k-mers, k must be positive integer, k <= 32
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..=32), default_value_t = 21)]
    pub k_mer: u32,

    /// Window size, w >= k; w > k enables minimizer selection
    #[clap(short, long, default_value_t = 21)]
    pub window: u32,

    /// Comma-separated gap counts between sampled positions, summing to w - k
    #[clap(long, value_delimiter = ',')]
    pub gaps: Vec<u32>,

    /// Minimizer ordering: lex or entropy
    #[clap(long, default_value = "lex", value_parser = parse_scheme)]
    pub scheme: ScoreScheme,

    /// Skip canonicalization (keep forward-strand k-mers only)
    #[arg(long, default_value_t = false)]
    pub no_canonical: bool,

    /// Store (depth, taxon) words instead of plain taxa
    #[arg(long, default_value_t = false)]
    pub tax_depth: bool,

    /// Expected distinct k-mer count, used to presize the table
    #[clap(long, default_value_t = 1 << 16)]
    pub capacity: usize,

    /// Number of threads
    #[clap(short = 'p', long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

impl BuildArgs {
    pub fn as_encoder(&self) -> Result<Encoder> {
        let skips = self.window - self.k_mer;
        let gaps = if self.gaps.is_empty() && skips > 0 {
            default_gap_pattern(self.k_mer, skips)?
        } else {
            self.gaps.clone()
        };
        let spacer = Spacer::new(self.k_mer, self.window, gaps)?;
        Ok(Encoder::new(spacer, !self.no_canonical, self.scheme))
    }
}

/// Spread `skips` skipped bases round-robin over the `k - 1` gap slots of
/// the seed.
fn default_gap_pattern(k: u32, skips: u32) -> Result<Vec<u32>> {
    let slots = k - 1;
    if slots == 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("k = {} leaves no positions to space a window over", k),
        ));
    }
    let base = skips / slots;
    let extra = skips % slots;
    Ok((0..slots).map(|i| base + (i < extra) as u32).collect())
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Classify reads against a database")]
pub struct ClassifyArgs {
    /// Database directory written by the build command
    #[arg(long = "db", required = true)]
    pub database: PathBuf,

    /// NCBI taxonomy nodes.dmp
    #[arg(long = "nodes", required = true)]
    pub nodes_filename: PathBuf,

    /// A single read file, or R1 R2 for paired-end FASTQ
    #[arg(required = true, num_args = 1..=2)]
    pub input_files: Vec<PathBuf>,

    /// Output file (stdout when omitted)
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Records read per chunk
    #[clap(long, default_value_t = 1024)]
    pub chunk_size: usize,

    /// Records per worker group, must be a power of two
    #[clap(long, default_value_t = 64)]
    pub per_set: usize,

    /// Emit FASTQ records with the classification in the comment instead of
    /// Kraken-style lines
    #[arg(long, default_value_t = false)]
    pub fastq: bool,

    /// With --fastq, also embed the per-window runs in the comment
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Also emit records for unclassified reads
    #[arg(long, default_value_t = false)]
    pub emit_all: bool,

    /// Number of threads
    #[clap(short = 'p', long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

impl ClassifyArgs {
    pub fn output_flags(&self) -> OutputFlags {
        if self.fastq {
            OutputFlags {
                kraken: self.verbose,
                fastq: true,
                emit_all: self.emit_all,
            }
        } else {
            OutputFlags {
                kraken: true,
                fastq: false,
                emit_all: self.emit_all,
            }
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Print statistics for a database directory")]
pub struct InspectArgs {
    /// Database directory written by the build command
    #[arg(long = "db", required = true)]
    pub database: PathBuf,
}
