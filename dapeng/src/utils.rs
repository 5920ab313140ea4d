use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("File not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

/// Reads the seqid2taxid map used to label reference genomes: one
/// `<accession>\t<taxid>` pair per line, extra columns ignored.
pub fn read_id_to_taxon_map<P: AsRef<Path>>(filename: P) -> Result<HashMap<String, u32>> {
    let file = open_file(filename)?;
    let reader = BufReader::new(file);
    let mut id_map = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.trim().split_whitespace();
        let (Some(seq_id), Some(taxid)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(taxid) = taxid.parse::<u32>() {
            id_map.insert(seq_id.to_string(), taxid);
        }
    }

    Ok(id_map)
}

/// Accession of a reference record id. Old-style pipe-delimited headers
/// (`gi|568336023|gb|CM000663.2|`) carry it in the fourth field; otherwise
/// the id itself is the accession.
pub fn extract_accession(id: &str) -> Option<&str> {
    if id.contains('|') {
        id.split('|').nth(3).filter(|acc| !acc.is_empty())
    } else {
        Some(id)
    }
}

const LIBRARY_SUFFIXES: [&str; 6] = [".fa", ".fna", ".fasta", ".fa.gz", ".fna.gz", ".fasta.gz"];

/// Collect reference files: a file argument is taken as-is, a directory is
/// walked for FASTA suffixes. Sorted so builds are reproducible.
pub fn find_library_files<P: AsRef<Path>>(source: P) -> Vec<PathBuf> {
    let source = source.as_ref();
    if source.is_file() {
        return vec![source.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(source)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| LIBRARY_SUFFIXES.iter().any(|s| name.ends_with(s)))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort_unstable();
    files
}

pub fn format_bytes(size: f64) -> String {
    let suffixes = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    let mut size = size;
    let mut current_suffix = &suffixes[0];

    for suffix in &suffixes[1..] {
        if size >= 1024.0 {
            current_suffix = suffix;
            size /= 1024.0;
        } else {
            break;
        }
    }

    format!("{:.2}{}", size, current_suffix)
}
