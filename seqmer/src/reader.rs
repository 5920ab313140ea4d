use crate::seq::{SeqFormat, Sequence};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Result, Seek};
use std::path::Path;

pub fn dyn_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read + Send>> {
    let mut file = open_file(path)?;
    if is_gzipped(&mut file)? {
        let decoder = GzDecoder::new(file);
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

pub fn is_gzipped(file: &mut File) -> Result<bool> {
    let mut buffer = [0; 2];
    let n = file.read(&mut buffer)?;
    file.rewind()?;
    Ok(n == 2 && buffer == [0x1F, 0x8B])
}

pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("File not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

pub fn trim_end(buffer: &mut Vec<u8>) {
    while let Some(&b'\n' | &b'\r') = buffer.last() {
        buffer.pop();
    }
}

/// Peek at the first byte to tell FASTA from FASTQ, gzip transparent.
/// An empty file reads as a zero-record FASTA so the caller can warn and
/// move on.
pub fn detect_file_format<P: AsRef<Path>>(path: P) -> Result<SeqFormat> {
    let mut reader = dyn_reader(&path)?;
    let mut first = [0u8; 1];
    if reader.read(&mut first)? == 0 {
        return Ok(SeqFormat::Fasta);
    }
    match first[0] {
        b'>' => Ok(SeqFormat::Fasta),
        b'@' => Ok(SeqFormat::Fastq),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unrecognized sequence format: {:?}", path.as_ref()),
        )),
    }
}

pub const BUFSIZE: usize = 8 * 1024 * 1024;

/// Chunked record source. `read_chunk` appends up to `max_records` records
/// to `out` and reports how many were read; a paired source appends the two
/// mates adjacently and counts the pair as one record.
pub trait Reader: Send {
    fn read_chunk(&mut self, max_records: usize, out: &mut Vec<Sequence>) -> Result<usize>;

    /// Sequences appended per record: 1 for single-end, 2 for paired.
    fn step(&self) -> usize {
        1
    }
}
