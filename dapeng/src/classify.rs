use crate::linear::TaxonCounter;
use crate::report::{append_fastq_classification, append_kraken_classification};
use crate::table::KmerTable;
use crate::taxonomy::Taxonomy;
use crate::TAXA_AMBIG;
use seqmer::{chunk_parallel, create_reader, Encoder, Sequence, BF};
use std::collections::HashMap;
use std::io::{Result, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Output gating for classification records.
#[derive(Debug, Clone, Copy)]
pub struct OutputFlags {
    pub kraken: bool,
    pub fastq: bool,
    pub emit_all: bool,
}

impl Default for OutputFlags {
    fn default() -> Self {
        Self {
            kraken: true,
            fastq: false,
            emit_all: false,
        }
    }
}

/// Everything classify workers share read-only, plus the two-element
/// classified/unclassified counter.
pub struct Classifier {
    pub table: KmerTable<u32>,
    pub taxonomy: Taxonomy,
    pub encoder: Encoder,
    pub flags: OutputFlags,
    classified: [AtomicU64; 2],
}

impl Classifier {
    pub fn new(
        table: KmerTable<u32>,
        taxonomy: Taxonomy,
        encoder: Encoder,
        flags: OutputFlags,
    ) -> Self {
        Self {
            table,
            taxonomy,
            encoder,
            flags,
            classified: [AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    pub fn n_classified(&self) -> u64 {
        self.classified[0].load(Ordering::Relaxed)
    }

    pub fn n_unclassified(&self) -> u64 {
        self.classified[1].load(Ordering::Relaxed)
    }
}

/// Pick the taxon whose root path accumulates the highest hit count; ties
/// go to the deeper node, then the smaller id. Depths come from the walks
/// themselves, so a taxon with no known parent competes from depth 0.
pub fn resolve_tree(hit_counts: &TaxonCounter, taxonomy: &Taxonomy) -> u32 {
    if hit_counts.is_empty() {
        return 0;
    }

    let mut scores: HashMap<u32, u64> = HashMap::new();
    let mut depths: HashMap<u32, u32> = HashMap::new();
    for (taxon, count) in hit_counts.iter() {
        let path = taxonomy.path_to_root(taxon);
        let deepest = path.len() - 1;
        for (i, &node) in path.iter().enumerate() {
            *scores.entry(node).or_insert(0) += count as u64;
            depths.entry(node).or_insert((deepest - i) as u32);
        }
    }

    let mut max_taxon = 0u32;
    let mut max_score = 0u64;
    let mut max_depth = 0u32;
    for (&node, &score) in &scores {
        let depth = depths[&node];
        if score > max_score
            || (score == max_score && depth > max_depth)
            || (score == max_score && depth == max_depth && node < max_taxon)
        {
            max_taxon = node;
            max_score = score;
            max_depth = depth;
        }
    }
    max_taxon
}

/// Classify one read (plus its mate for paired input) and append its
/// formatted record to `buf`. Scratch vectors are reused across calls.
pub fn classify_sequence(
    classifier: &Classifier,
    encoder: &Encoder,
    seqs: &[Sequence],
    taxa: &mut Vec<u32>,
    hit_counts: &mut TaxonCounter,
    buf: &mut Vec<u8>,
) -> u32 {
    taxa.clear();
    hit_counts.clear();
    let mut ambig_count = 0u32;
    let mut missing_count = 0u32;

    for seq in seqs {
        let emitted_before = taxa.len();
        for kmer in encoder.windows(&seq.seq) {
            if kmer == BF {
                taxa.push(TAXA_AMBIG);
                ambig_count += 1;
            } else {
                match classifier.table.get(kmer) {
                    None => {
                        taxa.push(0);
                        missing_count += 1;
                    }
                    Some(taxon) => {
                        taxa.push(taxon);
                        hit_counts.add(taxon);
                    }
                }
            }
        }
        // Windows the encoder suppressed still occupy trace positions.
        let expected = encoder.window_count(seq.len());
        let emitted = taxa.len() - emitted_before;
        for _ in emitted..expected {
            taxa.push(TAXA_AMBIG);
            ambig_count += 1;
        }
    }

    let taxon = resolve_tree(hit_counts, &classifier.taxonomy);
    let outcome = if taxon == 0 { 1 } else { 0 };
    classifier.classified[outcome].fetch_add(1, Ordering::Relaxed);

    if taxon != 0 || classifier.flags.emit_all {
        if classifier.flags.fastq {
            append_fastq_classification(
                taxa,
                taxon,
                ambig_count,
                missing_count,
                seqs,
                classifier.flags.kraken,
                buf,
            );
        } else if classifier.flags.kraken {
            append_kraken_classification(taxa, taxon, ambig_count, missing_count, &seqs[0], buf);
        }
    }
    taxon
}

/// Classify one dataset (a file or a file pair): chunked read, per-group
/// workers with thread-local scratch, order-preserving single write per
/// chunk.
pub fn process_dataset(
    classifier: &Classifier,
    input_files: &[PathBuf],
    output: &mut dyn Write,
    n_threads: usize,
    chunk_size: usize,
    per_set: usize,
) -> Result<()> {
    let mut reader = create_reader(input_files)?;
    let step = reader.step();
    chunk_parallel(
        reader.as_mut(),
        n_threads,
        chunk_size,
        per_set,
        |group| {
            let encoder = classifier.encoder.clone();
            let mut taxa = Vec::new();
            let mut hit_counts = TaxonCounter::new();
            let mut buf = Vec::new();
            for record in group.chunks(step) {
                classify_sequence(
                    classifier,
                    &encoder,
                    record,
                    &mut taxa,
                    &mut hit_counts,
                    &mut buf,
                );
            }
            buf
        },
        |chunk_buf| output.write_all(&chunk_buf),
    )?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqmer::{ScoreScheme, Spacer};

    fn counter_of(pairs: &[(u32, u16)]) -> TaxonCounter {
        let mut counter = TaxonCounter::new();
        for &(taxon, count) in pairs {
            for _ in 0..count {
                counter.add(taxon);
            }
        }
        counter
    }

    fn single_hit_classifier(flags: OutputFlags) -> Classifier {
        // ACG -> 42, taxonomy 42 -> 1.
        let mut table = KmerTable::new();
        table.set(0b000110, 42);
        let taxonomy = Taxonomy::from_entries([(1, 1, "no rank"), (42, 1, "species")]);
        let encoder = Encoder::new(Spacer::contiguous(3).unwrap(), true, ScoreScheme::Lex);
        Classifier::new(table, taxonomy, encoder, flags)
    }

    #[test]
    fn test_resolver_empty_histogram() {
        let taxonomy = Taxonomy::from_entries([(1, 1, "no rank")]);
        assert_eq!(resolve_tree(&TaxonCounter::new(), &taxonomy), 0);
    }

    #[test]
    fn test_resolver_tiebreak_prefers_depth() {
        // 10 and 11 under 9, 9 under 1; equal leaf hits promote the parent.
        let taxonomy = Taxonomy::from_entries([
            (1, 1, "no rank"),
            (9, 1, "genus"),
            (10, 9, "species"),
            (11, 9, "species"),
        ]);
        let hits = counter_of(&[(10, 2), (11, 2)]);
        assert_eq!(resolve_tree(&hits, &taxonomy), 9);
    }

    #[test]
    fn test_resolver_tiebreak_prefers_smaller_id() {
        // Two unrelated leaves at equal depth and score.
        let taxonomy = Taxonomy::from_entries([
            (1, 1, "no rank"),
            (6, 1, "species"),
            (4, 1, "species"),
        ]);
        let hits = counter_of(&[(6, 1), (4, 1)]);
        // Root collects 2, both leaves 1; root wins outright here.
        assert_eq!(resolve_tree(&hits, &taxonomy), 1);

        // With only leaf hits and no shared score advantage, smaller id wins.
        let taxonomy = Taxonomy::from_entries([(6, 6, "no rank"), (4, 4, "no rank")]);
        let hits = counter_of(&[(6, 1), (4, 1)]);
        assert_eq!(resolve_tree(&hits, &taxonomy), 4);
    }

    #[test]
    fn test_resolver_dominant_leaf() {
        let taxonomy = Taxonomy::from_entries([
            (1, 1, "no rank"),
            (9, 1, "genus"),
            (10, 9, "species"),
            (11, 9, "species"),
        ]);
        let hits = counter_of(&[(10, 3), (11, 1)]);
        assert_eq!(resolve_tree(&hits, &taxonomy), 10);
    }

    #[test]
    fn test_classify_single_hit() {
        let classifier = single_hit_classifier(OutputFlags::default());
        let encoder = classifier.encoder.clone();
        let read = [Sequence::new("r".into(), b"ACG".to_vec(), Vec::new())];
        let mut taxa = Vec::new();
        let mut hits = TaxonCounter::new();
        let mut buf = Vec::new();

        let taxon = classify_sequence(&classifier, &encoder, &read, &mut taxa, &mut hits, &mut buf);
        assert_eq!(taxon, 42);
        assert_eq!(taxa, vec![42]);
        assert_eq!(hits.count(42), 1);
        assert_eq!(String::from_utf8(buf).unwrap(), "C\tr\t42\t3\t42:1\n");
        assert_eq!(classifier.n_classified(), 1);
        assert_eq!(classifier.n_unclassified(), 0);
    }

    #[test]
    fn test_classify_ambiguous_read() {
        let flags = OutputFlags {
            emit_all: true,
            ..OutputFlags::default()
        };
        let classifier = single_hit_classifier(flags);
        let encoder = classifier.encoder.clone();
        let read = [Sequence::new("r".into(), b"ACNGT".to_vec(), Vec::new())];
        let mut taxa = Vec::new();
        let mut hits = TaxonCounter::new();
        let mut buf = Vec::new();

        let taxon = classify_sequence(&classifier, &encoder, &read, &mut taxa, &mut hits, &mut buf);
        assert_eq!(taxon, 0);
        assert_eq!(taxa, vec![TAXA_AMBIG, TAXA_AMBIG, TAXA_AMBIG]);
        assert!(hits.is_empty());
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("U\t"));
        assert!(text.contains("A:3"));
        assert_eq!(classifier.n_unclassified(), 1);
    }

    #[test]
    fn test_classify_pads_short_mate() {
        let classifier = single_hit_classifier(OutputFlags::default());
        let encoder = classifier.encoder.clone();
        // Mate shorter than the covered width contributes no windows.
        let pair = [
            Sequence::new("r/1".into(), b"ACGT".to_vec(), Vec::new()),
            Sequence::new("r/2".into(), b"AC".to_vec(), Vec::new()),
        ];
        let mut taxa = Vec::new();
        let mut hits = TaxonCounter::new();
        let mut buf = Vec::new();

        classify_sequence(&classifier, &encoder, &pair, &mut taxa, &mut hits, &mut buf);
        // Trace covers both reads: 4 - 3 + 1 = 2 windows, mate 0 windows.
        assert_eq!(taxa.len(), 2);
        let total_hits: u64 = hits.iter().map(|(_, c)| c as u64).sum();
        assert!(taxa.len() >= total_hits as usize);
    }
}
