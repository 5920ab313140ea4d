use crate::TAXA_AMBIG;
use seqmer::Sequence;

#[inline]
fn push_uint(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(value.to_string().as_bytes());
}

fn append_taxa_run(last_taxa: u32, taxa_run: u32, buf: &mut Vec<u8>) {
    // U for unclassified (unambiguous but not in database)
    // A for ambiguous nucleotides
    // Actual taxon otherwise.
    match last_taxa {
        0 => buf.push(b'U'),
        TAXA_AMBIG => buf.push(b'A'),
        taxon => push_uint(buf, taxon as u64),
    }
    buf.push(b':');
    push_uint(buf, taxa_run as u64);
}

/// Run-length encode the per-window trace, tab separated, no trailing
/// separator. Unclassified reads degenerate to `0:0`.
pub fn append_taxa_runs(taxon: u32, taxa: &[u32], buf: &mut Vec<u8>) {
    if taxon == 0 || taxa.is_empty() {
        buf.extend_from_slice(b"0:0");
        return;
    }
    let mut last_taxa = taxa[0];
    let mut taxa_run = 1u32;
    for &t in &taxa[1..] {
        if t == last_taxa {
            taxa_run += 1;
        } else {
            append_taxa_run(last_taxa, taxa_run, buf);
            buf.push(b'\t');
            last_taxa = t;
            taxa_run = 1;
        }
    }
    append_taxa_run(last_taxa, taxa_run, buf);
}

fn append_counts(count: u32, label: u8, buf: &mut Vec<u8>) {
    if count > 0 {
        buf.push(label);
        buf.push(b':');
        push_uint(buf, count as u64);
        buf.push(b'\t');
    }
}

/// One Kraken-style record:
/// `<C|U>\t<name>\t<taxid>\t<l_seq>\t[M:<missing>\t][A:<ambig>\t]<runs>\n`.
pub fn append_kraken_classification(
    taxa: &[u32],
    taxon: u32,
    ambig_count: u32,
    missing_count: u32,
    seq: &Sequence,
    buf: &mut Vec<u8>,
) {
    buf.push(if taxon == 0 { b'U' } else { b'C' });
    buf.push(b'\t');
    buf.extend_from_slice(seq.id.as_bytes());
    buf.push(b'\t');
    push_uint(buf, taxon as u64);
    buf.push(b'\t');
    push_uint(buf, seq.len() as u64);
    buf.push(b'\t');
    append_counts(missing_count, b'M', buf);
    append_counts(ambig_count, b'A', buf);
    append_taxa_runs(taxon, taxa, buf);
    buf.push(b'\n');
}

/// FASTQ record(s) with the classification in the comment. The comment is
/// built once and copied verbatim onto the mate; `verbose` embeds the runs.
pub fn append_fastq_classification(
    taxa: &[u32],
    taxon: u32,
    ambig_count: u32,
    missing_count: u32,
    seqs: &[Sequence],
    verbose: bool,
    buf: &mut Vec<u8>,
) {
    let mut comment = Vec::new();
    comment.push(if taxon == 0 { b'U' } else { b'C' });
    comment.push(b'\t');
    push_uint(&mut comment, taxon as u64);
    comment.push(b'\t');
    push_uint(&mut comment, seqs[0].len() as u64);
    comment.push(b'\t');
    append_counts(missing_count, b'M', &mut comment);
    append_counts(ambig_count, b'A', &mut comment);
    if verbose {
        append_taxa_runs(taxon, taxa, &mut comment);
    } else {
        // Drop the trailing field separator.
        comment.pop();
    }

    for seq in seqs {
        buf.push(b'@');
        buf.extend_from_slice(seq.id.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(&comment);
        buf.push(b'\n');
        buf.extend_from_slice(&seq.seq);
        buf.extend_from_slice(b"\n+\n");
        buf.extend_from_slice(&seq.qual);
        buf.push(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(taxon: u32, taxa: &[u32]) -> String {
        let mut buf = Vec::new();
        append_taxa_runs(taxon, taxa, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_paired_runs() {
        // Read trace [42,42,0] followed by mate trace [-1,-1].
        let taxa = [42, 42, 0, TAXA_AMBIG, TAXA_AMBIG];
        assert_eq!(runs(42, &taxa), "42:2\tU:1\tA:2");
    }

    #[test]
    fn test_unclassified_runs_degenerate() {
        assert_eq!(runs(0, &[0, 0, TAXA_AMBIG]), "0:0");
    }

    #[test]
    fn test_runs_are_lossless() {
        let taxa = [7u32, 7, 0, 0, 0, TAXA_AMBIG, 9, 9, 9, 7];
        let encoded = runs(9, &taxa);
        let mut decoded = Vec::new();
        for token in encoded.split('\t') {
            let (label, count) = token.split_once(':').unwrap();
            let value = match label {
                "U" => 0,
                "A" => TAXA_AMBIG,
                t => t.parse().unwrap(),
            };
            for _ in 0..count.parse::<u32>().unwrap() {
                decoded.push(value);
            }
        }
        assert_eq!(decoded, taxa);
    }

    #[test]
    fn test_kraken_line_shape() {
        let seq = Sequence::new("read1".into(), b"ACGTT".to_vec(), Vec::new());
        let mut buf = Vec::new();
        append_kraken_classification(&[42, 42, 42], 42, 0, 0, &seq, &mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "C\tread1\t42\t5\t42:3\n"
        );

        let mut buf = Vec::new();
        append_kraken_classification(&[0, TAXA_AMBIG, TAXA_AMBIG], 0, 2, 1, &seq, &mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "U\tread1\t0\t5\tM:1\tA:2\t0:0\n"
        );
    }

    #[test]
    fn test_fastq_comment_copied_to_mate() {
        let r1 = Sequence::new("r1/1".into(), b"ACGT".to_vec(), b"FFFF".to_vec());
        let r2 = Sequence::new("r1/2".into(), b"TTTT".to_vec(), b"IIII".to_vec());
        let mut buf = Vec::new();
        append_fastq_classification(&[5, 5], 5, 0, 0, &[r1, r2], false, &mut buf);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "@r1/1 C\t5\t4\nACGT\n+\nFFFF\n@r1/2 C\t5\t4\nTTTT\n+\nIIII\n"
        );
    }

    #[test]
    fn test_fastq_verbose_embeds_runs() {
        let r1 = Sequence::new("r".into(), b"ACGT".to_vec(), b"FFFF".to_vec());
        let mut buf = Vec::new();
        append_fastq_classification(&[5, 0], 5, 0, 1, &[r1], true, &mut buf);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "@r C\t5\t4\tM:1\t5:1\tU:1\nACGT\n+\nFFFF\n");
    }
}
