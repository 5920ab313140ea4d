/// Bounded taxon-to-count map backed by a flat vector. Reads hit only a
/// handful of distinct taxa, so a short linear scan beats a hash table on
/// cache traffic. Counts saturate at `u16::MAX`.
#[derive(Debug, Default, Clone)]
pub struct TaxonCounter {
    entries: Vec<(u32, u16)>,
}

impl TaxonCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, taxon: u32) {
        debug_assert!(taxon != 0, "taxon 0 is never counted");
        for entry in self.entries.iter_mut() {
            if entry.0 == taxon {
                entry.1 = entry.1.saturating_add(1);
                return;
            }
        }
        self.entries.push((taxon, 1));
    }

    pub fn count(&self, taxon: u32) -> u16 {
        self.entries
            .iter()
            .find(|&&(t, _)| t == taxon)
            .map_or(0, |&(_, c)| c)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, c)| c as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.entries.iter().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let mut counter = TaxonCounter::new();
        for i in 1..20u32 {
            for _ in 0..i {
                counter.add(i);
            }
        }
        for i in 1..20u32 {
            assert_eq!(counter.count(i), i as u16);
        }
        assert_eq!(counter.count(99), 0);
        assert_eq!(counter.len(), 19);
        assert_eq!(counter.total(), (1..20u64).sum::<u64>());
    }

    #[test]
    fn test_saturation() {
        let mut counter = TaxonCounter::new();
        for _ in 0..(u16::MAX as u32 + 10) {
            counter.add(7);
        }
        assert_eq!(counter.count(7), u16::MAX);
    }

    #[test]
    fn test_clear() {
        let mut counter = TaxonCounter::new();
        counter.add(3);
        counter.clear();
        assert!(counter.is_empty());
        assert_eq!(counter.count(3), 0);
    }
}
