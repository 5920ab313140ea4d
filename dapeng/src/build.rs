use crate::table::{td_encode, KmerTable};
use crate::taxonomy::{Taxonomy, TAXON_ROOT, TAXON_UNKNOWN};
use crate::utils::extract_accession;
use seqmer::{Encoder, FastaReader};
use std::collections::{HashMap, HashSet};
use std::io::{Error, ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Distinct k-mer set of one reference genome, tagged with its taxon.
pub struct GenomeSet {
    pub taxid: u32,
    pub kmers: HashSet<u64>,
}

/// Stream one reference file into its distinct k-mer set. The taxon comes
/// from the first record's accession; a missing mapping is fatal and names
/// both the file and the accession.
pub fn fill_set_genome<P: AsRef<Path>>(
    path: P,
    encoder: &Encoder,
    id_to_taxon_map: &HashMap<String, u32>,
) -> Result<GenomeSet> {
    let path = path.as_ref();
    let mut reader = FastaReader::from_path(path)?;
    let mut kmers = HashSet::new();
    let mut taxid = None;

    while let Some(record) = reader.read_next()? {
        if taxid.is_none() {
            let accession = extract_accession(&record.id).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("Malformed sequence header {:?} in {:?}", record.id, path),
                )
            })?;
            taxid = Some(*id_to_taxon_map.get(accession).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("Missing taxid for {} in {:?}", accession, path),
                )
            })?);
        }
        kmers.extend(encoder.minimizers(&record.seq));
    }

    let taxid = taxid.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("No sequences in reference file {:?}", path),
        )
    })?;
    Ok(GenomeSet { taxid, kmers })
}

/// Fold one genome set into the classify table: insert new k-mers with the
/// genome's taxon, lower existing entries to the LCA.
pub fn update_lca_map(
    table: &mut KmerTable<u32>,
    set: &GenomeSet,
    taxonomy: &Taxonomy,
) {
    for &kmer in &set.kmers {
        match table.get(kmer) {
            None => table.set(kmer, set.taxid),
            Some(prev) if prev == set.taxid => {}
            Some(prev) => {
                let mut merged = taxonomy.lca(prev, set.taxid);
                if merged == TAXON_UNKNOWN {
                    eprintln!(
                        "Missing taxid {} while merging; setting lca to tree root",
                        set.taxid
                    );
                    merged = TAXON_ROOT;
                }
                table.set(kmer, merged);
            }
        }
    }
}

/// Tax-depth variant of `update_lca_map`: values carry the taxon's depth so
/// raw word order sorts deeper entries first.
pub fn update_td_map(
    table: &mut KmerTable<u64>,
    set: &GenomeSet,
    taxonomy: &Taxonomy,
) {
    let encode = |taxon: u32| -> u64 {
        let depth = taxonomy.depth(taxon);
        if depth == TAXON_UNKNOWN {
            eprintln!("Missing depth for taxid {}; storing tree root", taxon);
            td_encode(0, TAXON_ROOT)
        } else {
            td_encode(depth, taxon)
        }
    };

    for &kmer in &set.kmers {
        match table.get(kmer) {
            None => table.set(kmer, encode(set.taxid)),
            Some(prev) => {
                let prev_taxon = crate::table::td_taxon(prev);
                if prev_taxon == set.taxid {
                    continue;
                }
                let merged = taxonomy.lca(prev_taxon, set.taxid);
                if merged == TAXON_UNKNOWN {
                    eprintln!(
                        "Missing taxid {} while merging; setting lca to tree root",
                        set.taxid
                    );
                    table.set(kmer, td_encode(0, TAXON_ROOT));
                } else {
                    table.set(kmer, encode(merged));
                }
            }
        }
    }
}

/// Project one genome set through a prebuilt full map: first writer wins,
/// and a k-mer absent from the full map aborts the build.
pub fn update_minimized_map(
    table: &mut KmerTable<u32>,
    set: &GenomeSet,
    full_map: &KmerTable<u64>,
) -> Result<()> {
    for &kmer in &set.kmers {
        if table.contains(kmer) {
            continue;
        }
        match full_map.get(kmer) {
            Some(value) => table.set(kmer, crate::table::td_taxon(value)),
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "Missing kmer {:#x} from full map; check for matching spacer and kmer size",
                        kmer
                    ),
                ))
            }
        }
    }
    Ok(())
}

/// Build the classify table over a reference library: `n_workers` genome
/// readers feed one serial merger.
pub fn lca_map(
    files: &[PathBuf],
    taxonomy: &Taxonomy,
    id_to_taxon_map: &HashMap<String, u32>,
    encoder: &Encoder,
    n_workers: usize,
    capacity: usize,
) -> Result<KmerTable<u32>> {
    let mut table = KmerTable::with_capacity(capacity);
    let mut completed = 0usize;
    seqmer::reduce_parallel(
        files,
        n_workers,
        |_, path| fill_set_genome(path, encoder, id_to_taxon_map),
        |index, set: GenomeSet| {
            update_lca_map(&mut table, &set, taxonomy);
            completed += 1;
            eprintln!(
                "Merged {:?} ({}/{} done, table size {})",
                files[index],
                completed,
                files.len(),
                table.size()
            );
            Ok(())
        },
    )?;
    Ok(table)
}

/// Tax-depth sibling of `lca_map`.
pub fn taxdepth_map(
    files: &[PathBuf],
    taxonomy: &Taxonomy,
    id_to_taxon_map: &HashMap<String, u32>,
    encoder: &Encoder,
    n_workers: usize,
    capacity: usize,
) -> Result<KmerTable<u64>> {
    let mut table = KmerTable::with_capacity(capacity);
    let mut completed = 0usize;
    seqmer::reduce_parallel(
        files,
        n_workers,
        |_, path| fill_set_genome(path, encoder, id_to_taxon_map),
        |index, set: GenomeSet| {
            update_td_map(&mut table, &set, taxonomy);
            completed += 1;
            eprintln!(
                "Merged {:?} ({}/{} done, table size {})",
                files[index],
                completed,
                files.len(),
                table.size()
            );
            Ok(())
        },
    )?;
    Ok(table)
}

/// Restrict a prebuilt full map to the k-mers of `files`. Taxids are not
/// consulted; values come from the full map.
pub fn minimized_map(
    files: &[PathBuf],
    full_map: &KmerTable<u64>,
    encoder: &Encoder,
    n_workers: usize,
) -> Result<KmerTable<u32>> {
    let mut table = KmerTable::new();
    seqmer::reduce_parallel(
        files,
        n_workers,
        |_, path| fill_set_genome_untaxed(path, encoder),
        |_, set: GenomeSet| update_minimized_map(&mut table, &set, full_map),
    )?;
    Ok(table)
}

fn fill_set_genome_untaxed<P: AsRef<Path>>(path: P, encoder: &Encoder) -> Result<GenomeSet> {
    let mut reader = FastaReader::from_path(path.as_ref())?;
    let mut kmers = HashSet::new();
    while let Some(record) = reader.read_next()? {
        kmers.extend(encoder.minimizers(&record.seq));
    }
    Ok(GenomeSet { taxid: 0, kmers })
}
