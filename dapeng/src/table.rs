use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use seqmer::fmix64;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Result, Write};
use std::path::Path;

pub const DEFAULT_LOAD_FACTOR: f64 = 0.77;
const MIN_BUCKETS: usize = 16;

/// Pack depth and taxon into one tax-depth word. Complementing the depth
/// makes plain u64 ordering sort deeper entries first.
#[inline]
pub fn td_encode(depth: u32, taxon: u32) -> u64 {
    ((!depth as u64) << 32) | taxon as u64
}

#[inline]
pub fn td_taxon(value: u64) -> u32 {
    value as u32
}

#[inline]
pub fn td_depth(value: u64) -> u32 {
    !((value >> 32) as u32)
}

/// Value slot of a `KmerTable`: plain taxa for classification, tax-depth
/// words for the deeper-resolution variant.
pub trait TableValue: Copy + PartialEq + Default + Send + Sync {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()>;
    fn read_from<R: Read>(reader: &mut R) -> Result<Self>;
}

impl TableValue for u32 {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(*self)
    }
    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        reader.read_u32::<LittleEndian>()
    }
}

impl TableValue for u64 {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(*self)
    }
    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        reader.read_u64::<LittleEndian>()
    }
}

/// Flat open-addressed hash from 64-bit k-mer to taxon value. Bucket count
/// is a power of two; occupancy lives in a 2-bits-per-bucket flag bitmap.
/// Built single-writer, then shared read-only across classify workers.
pub struct KmerTable<V: TableValue> {
    n_buckets: usize,
    size: usize,
    upper_bound: usize,
    load_factor: f64,
    flags: Vec<u32>,
    keys: Vec<u64>,
    vals: Vec<V>,
}

#[inline]
fn flag_words(n_buckets: usize) -> usize {
    if n_buckets < 16 {
        1
    } else {
        n_buckets >> 4
    }
}

impl<V: TableValue> KmerTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(MIN_BUCKETS)
    }

    /// Size buckets so `capacity` entries fit under the load factor.
    pub fn with_capacity(capacity: usize) -> Self {
        let wanted = ((capacity as f64 / DEFAULT_LOAD_FACTOR).ceil() as usize).max(MIN_BUCKETS);
        let n_buckets = wanted.next_power_of_two();
        Self {
            n_buckets,
            size: 0,
            upper_bound: (n_buckets as f64 * DEFAULT_LOAD_FACTOR) as usize,
            load_factor: DEFAULT_LOAD_FACTOR,
            flags: vec![0xaaaaaaaa; flag_words(n_buckets)],
            keys: vec![0; n_buckets],
            vals: vec![V::default(); n_buckets],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.n_buckets
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    fn is_empty_bucket(&self, i: usize) -> bool {
        (self.flags[i >> 4] >> ((i & 0xf) << 1)) & 2 != 0
    }

    #[inline]
    fn mark_occupied(&mut self, i: usize) {
        self.flags[i >> 4] &= !(3u32 << ((i & 0xf) << 1));
    }

    /// Probe for `key`: the occupied slot holding it, or the first empty
    /// slot on its probe path.
    #[inline]
    fn bucket_for(&self, key: u64) -> (usize, bool) {
        let mask = self.n_buckets - 1;
        let mut i = fmix64(key) as usize & mask;
        let mut step = 0;
        loop {
            if self.is_empty_bucket(i) {
                return (i, false);
            }
            if self.keys[i] == key {
                return (i, true);
            }
            step += 1;
            i = (i + step) & mask;
        }
    }

    pub fn get(&self, key: u64) -> Option<V> {
        let (i, found) = self.bucket_for(key);
        found.then(|| self.vals[i])
    }

    pub fn contains(&self, key: u64) -> bool {
        self.bucket_for(key).1
    }

    /// Insert or overwrite.
    pub fn set(&mut self, key: u64, value: V) {
        if self.size + 1 > self.upper_bound {
            self.grow();
        }
        let (i, found) = self.bucket_for(key);
        self.keys[i] = key;
        self.vals[i] = value;
        if !found {
            self.mark_occupied(i);
            self.size += 1;
        }
    }

    fn grow(&mut self) {
        let mut bigger = Self {
            n_buckets: self.n_buckets * 2,
            size: 0,
            upper_bound: (self.n_buckets as f64 * 2.0 * self.load_factor) as usize,
            load_factor: self.load_factor,
            flags: vec![0xaaaaaaaa; flag_words(self.n_buckets * 2)],
            keys: vec![0; self.n_buckets * 2],
            vals: vec![V::default(); self.n_buckets * 2],
        };
        for (key, value) in self.iter() {
            let (i, _) = bigger.bucket_for(key);
            bigger.keys[i] = key;
            bigger.vals[i] = value;
            bigger.mark_occupied(i);
            bigger.size += 1;
        }
        *self = bigger;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, V)> + '_ {
        (0..self.n_buckets)
            .filter(move |&i| !self.is_empty_bucket(i))
            .map(move |i| (self.keys[i], self.vals[i]))
    }

    /// Serialize as bucket count, load factor, flag bitmap, keys, values.
    pub fn write_to_disk<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(filename)?);
        writer.write_u64::<LittleEndian>(self.n_buckets as u64)?;
        writer.write_f64::<LittleEndian>(self.load_factor)?;
        for word in &self.flags {
            writer.write_u32::<LittleEndian>(*word)?;
        }
        for key in &self.keys {
            writer.write_u64::<LittleEndian>(*key)?;
        }
        for value in &self.vals {
            value.write_to(&mut writer)?;
        }
        writer.flush()
    }

    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let mut reader = BufReader::new(crate::utils::open_file(filename)?);
        let n_buckets = reader.read_u64::<LittleEndian>()? as usize;
        let load_factor = reader.read_f64::<LittleEndian>()?;

        let mut flags = vec![0u32; flag_words(n_buckets)];
        for word in flags.iter_mut() {
            *word = reader.read_u32::<LittleEndian>()?;
        }
        let mut keys = vec![0u64; n_buckets];
        for key in keys.iter_mut() {
            *key = reader.read_u64::<LittleEndian>()?;
        }
        let mut vals = vec![V::default(); n_buckets];
        for value in vals.iter_mut() {
            *value = V::read_from(&mut reader)?;
        }

        let mut table = Self {
            n_buckets,
            size: 0,
            upper_bound: (n_buckets as f64 * load_factor) as usize,
            load_factor,
            flags,
            keys,
            vals,
        };
        table.size = (0..n_buckets).filter(|&i| !table.is_empty_bucket(i)).count();
        Ok(table)
    }
}

impl<V: TableValue> Default for KmerTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl KmerTable<u64> {
    /// Collapse a tax-depth table into a plain classify table.
    pub fn strip_depths(&self) -> KmerTable<u32> {
        let mut out = KmerTable::with_capacity(self.size);
        for (key, value) in self.iter() {
            out.set(key, td_taxon(value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let mut table = KmerTable::<u32>::new();
        assert_eq!(table.get(42), None);
        table.set(42, 7);
        table.set(99, 8);
        assert_eq!(table.get(42), Some(7));
        table.set(42, 9);
        assert_eq!(table.get(42), Some(9));
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut table = KmerTable::<u32>::with_capacity(4);
        for i in 0..1000u64 {
            table.set(i.wrapping_mul(0x9e3779b97f4a7c15), i as u32);
        }
        assert_eq!(table.size(), 1000);
        for i in 0..1000u64 {
            assert_eq!(table.get(i.wrapping_mul(0x9e3779b97f4a7c15)), Some(i as u32));
        }
        assert!(table.size() <= table.capacity());
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut table = KmerTable::<u32>::new();
        for i in 1..200u64 {
            table.set(i * 31, (i % 97) as u32);
        }
        let path = std::env::temp_dir().join("dapeng_table_test.kdb");
        table.write_to_disk(&path).unwrap();
        let loaded = KmerTable::<u32>::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.size(), table.size());
        assert_eq!(loaded.capacity(), table.capacity());
        for i in 1..200u64 {
            assert_eq!(loaded.get(i * 31), table.get(i * 31));
        }
    }

    #[test]
    fn test_td_word_round_trip() {
        let word = td_encode(3, 561);
        assert_eq!(td_taxon(word), 561);
        assert_eq!(td_depth(word), 3);
        // Deeper entries order first on the raw word.
        assert!(td_encode(5, 1) < td_encode(2, 1));
    }

    #[test]
    fn test_strip_depths() {
        let mut table = KmerTable::<u64>::new();
        table.set(11, td_encode(4, 33));
        table.set(12, td_encode(0, 1));
        let plain = table.strip_depths();
        assert_eq!(plain.get(11), Some(33));
        assert_eq!(plain.get(12), Some(1));
    }
}
