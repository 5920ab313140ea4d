use crate::BITS_PER_CHAR;
use std::io::{Error, ErrorKind, Result};

/// Spaced-seed template: `k` sampled positions inside a window of `w`
/// consecutive bases. `gaps[i]` skipped bases sit between sampled position
/// `i` and `i + 1`, and the gap counts must sum to `w - k`, so the covered
/// width of every window equals `w`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spacer {
    k: u32,
    w: u32,
    gaps: Vec<u32>,
    offsets: Vec<usize>,
    mask: u64,
}

impl Spacer {
    pub fn new(k: u32, w: u32, mut gaps: Vec<u32>) -> Result<Self> {
        if !(1..=32).contains(&k) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("k must be in 1..=32, got {}", k),
            ));
        }
        if w < k {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("window size {} smaller than k {}", w, k),
            ));
        }
        let total: u32 = gaps.iter().sum();
        if total != w - k {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("gap counts sum to {}, expected w - k = {}", total, w - k),
            ));
        }
        if gaps.len() > k.saturating_sub(1) as usize {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "{} gap entries but only {} positions between sampled bases",
                    gaps.len(),
                    k.saturating_sub(1)
                ),
            ));
        }
        // One gap per adjacent pair of sampled positions; short lists mean
        // the remaining positions are contiguous.
        gaps.resize(k.saturating_sub(1) as usize, 0);

        let mut offsets = Vec::with_capacity(k as usize);
        let mut pos = 0usize;
        offsets.push(pos);
        for &g in &gaps {
            pos += 1 + g as usize;
            offsets.push(pos);
        }

        // Shifted down from the full word so k = 32 stays in range.
        let mask = u64::MAX >> (64 - k as usize * BITS_PER_CHAR);

        Ok(Self {
            k,
            w,
            gaps,
            offsets,
            mask,
        })
    }

    /// Contiguous seed: every base of a k-wide window contributes.
    pub fn contiguous(k: u32) -> Result<Self> {
        Self::new(k, k, Vec::new())
    }

    pub fn k(&self) -> usize {
        self.k as usize
    }

    pub fn w(&self) -> usize {
        self.w as usize
    }

    /// Number of consecutive bases one window spans.
    pub fn covered(&self) -> usize {
        self.w as usize
    }

    pub fn gaps(&self) -> &[u32] {
        &self.gaps
    }

    /// Window offsets of the sampled positions, in order.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// How many successive window positions one minimizer is drawn from.
    pub fn minimizer_span(&self) -> usize {
        (self.w - self.k) as usize + 1
    }

    pub fn kmer_mask(&self) -> u64 {
        self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_offsets() {
        let sp = Spacer::contiguous(5).unwrap();
        assert_eq!(sp.covered(), 5);
        assert_eq!(sp.offsets(), &[0, 1, 2, 3, 4]);
        assert_eq!(sp.minimizer_span(), 1);
    }

    #[test]
    fn test_spaced_offsets() {
        // k=3, w=5, one skipped base after each of the first two positions
        let sp = Spacer::new(3, 5, vec![1, 1]).unwrap();
        assert_eq!(sp.covered(), 5);
        assert_eq!(sp.offsets(), &[0, 2, 4]);
        assert_eq!(sp.minimizer_span(), 3);
    }

    #[test]
    fn test_full_width_mask() {
        assert_eq!(Spacer::contiguous(32).unwrap().kmer_mask(), u64::MAX);
        assert_eq!(Spacer::contiguous(1).unwrap().kmer_mask(), 0b11);
    }

    #[test]
    fn test_bad_configs_are_errors() {
        // Gap sum must equal w - k.
        assert!(Spacer::new(3, 5, vec![1]).is_err());
        // At most k - 1 gap entries.
        assert!(Spacer::new(3, 7, vec![1, 1, 1, 1]).is_err());
        // k out of range, w below k.
        assert!(Spacer::new(0, 5, vec![]).is_err());
        assert!(Spacer::new(33, 33, vec![]).is_err());
        assert!(Spacer::new(5, 3, vec![]).is_err());
    }
}
