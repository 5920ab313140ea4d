use crate::reader::{dyn_reader, trim_end, Reader, BUFSIZE};
use crate::seq::Sequence;
use std::io::{BufRead, BufReader, Read, Result};
use std::path::Path;

/// FastaReader
pub struct FastaReader<R>
where
    R: Read + Send,
{
    reader: BufReader<R>,
    header: Vec<u8>,
    line: Vec<u8>,
}

impl<R> FastaReader<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, BUFSIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        assert!(capacity >= 3);
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            header: Vec::new(),
            line: Vec::new(),
        }
    }

    pub fn read_next(&mut self) -> Result<Option<Sequence>> {
        // Pull the pending header, skipping anything before the first '>'.
        while self.header.is_empty() {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            if self.line.starts_with(b">") {
                std::mem::swap(&mut self.header, &mut self.line);
                trim_end(&mut self.header);
            }
        }

        let id = first_word(&self.header[1..]);
        self.header.clear();

        // Sequence lines up to the next header or EOF.
        let mut seq = Vec::new();
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                break;
            }
            if self.line.starts_with(b">") {
                std::mem::swap(&mut self.header, &mut self.line);
                trim_end(&mut self.header);
                break;
            }
            trim_end(&mut self.line);
            seq.extend_from_slice(&self.line);
        }

        Ok(Some(Sequence::new(id, seq, Vec::new())))
    }
}

impl FastaReader<Box<dyn Read + Send>> {
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = dyn_reader(path)?;
        Ok(Self::new(reader))
    }
}

impl<R: Read + Send> Reader for FastaReader<R> {
    fn read_chunk(&mut self, max_records: usize, out: &mut Vec<Sequence>) -> Result<usize> {
        let mut records = 0;
        while records < max_records {
            match self.read_next()? {
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

pub(crate) fn first_word(line: &[u8]) -> String {
    let end = line
        .iter()
        .position(|&c| c == b' ' || c == b'\t')
        .unwrap_or(line.len());
    String::from_utf8_lossy(&line[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_multi_record_multi_line() {
        let data = b">seq1 first genome\nACGT\nACGT\n>seq2\nTTTT\n";
        let mut reader = FastaReader::new(Cursor::new(&data[..]));
        let s1 = reader.read_next().unwrap().unwrap();
        assert_eq!(s1.id, "seq1");
        assert_eq!(s1.seq, b"ACGTACGT");
        let s2 = reader.read_next().unwrap().unwrap();
        assert_eq!(s2.id, "seq2");
        assert_eq!(s2.seq, b"TTTT");
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_chunked_reads() {
        let data = b">a\nAC\n>b\nGT\n>c\nCC\n";
        let mut reader = FastaReader::new(Cursor::new(&data[..]));
        let mut out = Vec::new();
        assert_eq!(reader.read_chunk(2, &mut out).unwrap(), 2);
        assert_eq!(reader.read_chunk(2, &mut out).unwrap(), 1);
        assert_eq!(reader.read_chunk(2, &mut out).unwrap(), 0);
        let ids: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
