use crate::fasta::first_word;
use crate::reader::{dyn_reader, trim_end, Reader, BUFSIZE};
use crate::seq::Sequence;
use std::io::{BufRead, BufReader, Read, Result};
use std::path::Path;

struct QReader<R: Read + Send> {
    reader: BufReader<R>,

    header: Vec<u8>,
    seq: Vec<u8>,
    plus: Vec<u8>,
    quals: Vec<u8>,
}

impl<R> QReader<R>
where
    R: Read + Send,
{
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        assert!(capacity >= 3);
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            header: Vec::new(),
            seq: Vec::new(),
            plus: Vec::new(),
            quals: Vec::new(),
        }
    }

    pub fn read_next(&mut self) -> Result<Option<Sequence>> {
        self.header.clear();
        if self.reader.read_until(b'\n', &mut self.header)? == 0 {
            return Ok(None);
        }
        trim_end(&mut self.header);

        self.seq.clear();
        if self.reader.read_until(b'\n', &mut self.seq)? == 0 {
            return Ok(None);
        }
        trim_end(&mut self.seq);

        self.plus.clear();
        if self.reader.read_until(b'\n', &mut self.plus)? == 0 {
            return Ok(None);
        }

        self.quals.clear();
        if self.reader.read_until(b'\n', &mut self.quals)? == 0 {
            return Ok(None);
        }
        trim_end(&mut self.quals);

        let start = if self.header.starts_with(b"@") { 1 } else { 0 };
        let id = first_word(&self.header[start..]);
        Ok(Some(Sequence::new(
            id,
            self.seq.clone(),
            self.quals.clone(),
        )))
    }
}

/// FastqReader
pub struct FastqReader<R: Read + Send> {
    inner: QReader<R>,
}

impl<R> FastqReader<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            inner: QReader::with_capacity(reader, BUFSIZE),
        }
    }
}

impl FastqReader<Box<dyn Read + Send>> {
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = dyn_reader(path)?;
        Ok(Self::new(reader))
    }
}

impl<R: Read + Send> Reader for FastqReader<R> {
    fn read_chunk(&mut self, max_records: usize, out: &mut Vec<Sequence>) -> Result<usize> {
        let mut records = 0;
        while records < max_records {
            match self.inner.read_next()? {
                Some(seq) => {
                    out.push(seq);
                    records += 1;
                }
                None => break,
            }
        }
        Ok(records)
    }
}

/// Reads two FASTQ files in lockstep; mates land adjacently in the chunk.
pub struct FastqPairReader<R: Read + Send> {
    inner1: QReader<R>,
    inner2: QReader<R>,
}

impl<R> FastqPairReader<R>
where
    R: Read + Send,
{
    pub fn new(reader1: R, reader2: R) -> Self {
        Self {
            inner1: QReader::with_capacity(reader1, BUFSIZE),
            inner2: QReader::with_capacity(reader2, BUFSIZE),
        }
    }
}

impl FastqPairReader<Box<dyn Read + Send>> {
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path1: P, path2: P) -> Result<Self> {
        Ok(Self::new(dyn_reader(path1)?, dyn_reader(path2)?))
    }
}

impl<R: Read + Send> Reader for FastqPairReader<R> {
    fn read_chunk(&mut self, max_records: usize, out: &mut Vec<Sequence>) -> Result<usize> {
        let mut records = 0;
        while records < max_records {
            match (self.inner1.read_next()?, self.inner2.read_next()?) {
                (Some(seq1), Some(seq2)) => {
                    out.push(seq1);
                    out.push(seq2);
                    records += 1;
                }
                (None, None) => break,
                _ => {
                    eprintln!("Paired input files have unequal record counts; stopping early.");
                    break;
                }
            }
        }
        Ok(records)
    }

    fn step(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const R1: &[u8] = b"@r1/1 comment\nACGT\n+\nFFFF\n@r2/1\nTTTT\n+\nIIII\n";
    const R2: &[u8] = b"@r1/2\nCCCC\n+\nFFFF\n@r2/2\nGGGG\n+\nIIII\n";

    #[test]
    fn test_single_end() {
        let mut reader = FastqReader::new(Cursor::new(R1));
        let mut out = Vec::new();
        assert_eq!(reader.read_chunk(10, &mut out).unwrap(), 2);
        assert_eq!(out[0].id, "r1/1");
        assert_eq!(out[0].seq, b"ACGT");
        assert_eq!(out[0].qual, b"FFFF");
        assert_eq!(out[1].id, "r2/1");
    }

    #[test]
    fn test_paired_records_adjacent() {
        let mut reader = FastqPairReader::new(Cursor::new(R1), Cursor::new(R2));
        let mut out = Vec::new();
        assert_eq!(reader.read_chunk(10, &mut out).unwrap(), 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].id, "r1/1");
        assert_eq!(out[1].id, "r1/2");
        assert_eq!(out[1].seq, b"CCCC");
        assert_eq!(out[2].id, "r2/1");
        assert_eq!(out[3].id, "r2/2");
        assert_eq!(reader.step(), 2);
    }
}
