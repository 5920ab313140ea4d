use crate::utils::open_file;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Error, ErrorKind, Result};
use std::path::Path;

/// Taxon id reported when an operation involves an unknown taxon. Callers
/// that must keep going map it to the root (1) and warn.
pub const TAXON_UNKNOWN: u32 = u32::MAX;

/// Root of the taxonomy tree.
pub const TAXON_ROOT: u32 = 1;

#[derive(Debug, Clone)]
pub struct TaxonomyNode {
    pub parent: u32,
    pub rank: String,
}

/// In-memory taxonomy graph: taxon id to (parent, rank). The root is its
/// own parent.
#[derive(Debug, Default)]
pub struct Taxonomy {
    nodes: HashMap<u32, TaxonomyNode>,
}

/// Parse the NCBI taxonomy nodes file into (parent map, rank map).
pub fn parse_nodes_file<P: AsRef<Path>>(
    nodes_filename: P,
) -> Result<(HashMap<u32, u32>, HashMap<u32, String>)> {
    let nodes_file = open_file(nodes_filename)?;
    let reader = BufReader::new(nodes_file);

    let mut parent_map = HashMap::new();
    let mut rank_map = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<_> = line.split("\t|\t").collect();
        if fields.len() < 3 {
            continue;
        }

        let node_id = fields[0]
            .parse::<u32>()
            .map_err(|_| Error::new(ErrorKind::InvalidData, "node_id"))?;
        let parent_id = fields[1]
            .parse::<u32>()
            .map_err(|_| Error::new(ErrorKind::InvalidData, "parent_id"))?;

        parent_map.insert(node_id, parent_id);
        rank_map.insert(node_id, fields[2].to_string());
    }

    Ok((parent_map, rank_map))
}

/// Parse the NCBI taxonomy names file, keeping scientific names only.
pub fn parse_names_file<P: AsRef<Path>>(names_filename: P) -> Result<HashMap<u32, String>> {
    let names_file = open_file(names_filename)?;
    let reader = BufReader::new(names_file);

    let mut name_map = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.trim_end_matches(|c| c == '\t' || c == '|' || c == '\n');
        let fields: Vec<_> = line.split("\t|\t").collect();
        if fields.len() < 4 {
            continue;
        }
        let node_id = fields[0].parse::<u32>().unwrap_or(0);
        if fields[3] == "scientific name" {
            name_map.insert(node_id, fields[1].to_string());
        }
    }

    Ok(name_map)
}

impl Taxonomy {
    pub fn from_nodes_dmp<P: AsRef<Path>>(nodes_filename: P) -> Result<Self> {
        let (parent_map, mut rank_map) = parse_nodes_file(nodes_filename)?;
        let nodes = parent_map
            .into_iter()
            .map(|(id, parent)| {
                let rank = rank_map.remove(&id).unwrap_or_default();
                (id, TaxonomyNode { parent, rank })
            })
            .collect();
        Ok(Self { nodes })
    }

    /// Build from (taxon, parent, rank) triples; handy for tests and for
    /// callers that already hold the dump in memory.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32, &'static str)>,
    {
        let nodes = entries
            .into_iter()
            .map(|(id, parent, rank)| {
                (
                    id,
                    TaxonomyNode {
                        parent,
                        rank: rank.to_string(),
                    },
                )
            })
            .collect();
        Self { nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, taxid: u32) -> bool {
        self.nodes.contains_key(&taxid)
    }

    pub fn rank(&self, taxid: u32) -> Option<&str> {
        self.nodes.get(&taxid).map(|n| n.rank.as_str())
    }

    pub fn parent(&self, taxid: u32) -> Option<u32> {
        self.nodes.get(&taxid).map(|n| n.parent)
    }

    /// Distance to the root; the root is at depth 0 and an unknown taxon
    /// reports `TAXON_UNKNOWN`.
    pub fn depth(&self, taxid: u32) -> u32 {
        let mut depth = 0u32;
        let mut current = taxid;
        loop {
            match self.parent(current) {
                None => return TAXON_UNKNOWN,
                Some(parent) if parent == current => return depth,
                Some(parent) => {
                    depth += 1;
                    current = parent;
                }
            }
        }
    }

    /// Ordered walk from `taxid` up to the root, both endpoints included.
    /// The walk stops at the last known node, so a taxon with a missing
    /// parent is its own root.
    pub fn path_to_root(&self, taxid: u32) -> Vec<u32> {
        let mut path = vec![taxid];
        let mut current = taxid;
        while let Some(parent) = self.parent(current) {
            if parent == current || !self.contains(parent) {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Lowest common ancestor: lift the deeper node to matching depth, then
    /// walk both up until they meet. Unknown inputs yield `TAXON_UNKNOWN`.
    pub fn lca(&self, mut a: u32, mut b: u32) -> u32 {
        let mut depth_a = self.depth(a);
        let mut depth_b = self.depth(b);
        if depth_a == TAXON_UNKNOWN || depth_b == TAXON_UNKNOWN {
            return TAXON_UNKNOWN;
        }

        while depth_a > depth_b {
            a = match self.parent(a) {
                Some(p) => p,
                None => return TAXON_UNKNOWN,
            };
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = match self.parent(b) {
                Some(p) => p,
                None => return TAXON_UNKNOWN,
            };
            depth_b -= 1;
        }

        while a != b {
            match (self.parent(a), self.parent(b)) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                _ => return TAXON_UNKNOWN,
            }
        }
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 <- 3 <- {5, 7}; 9 dangles off an absent parent.
    fn sample() -> Taxonomy {
        Taxonomy::from_entries([
            (1, 1, "no rank"),
            (3, 1, "family"),
            (5, 3, "genus"),
            (7, 3, "genus"),
            (9, 1000, "species"),
        ])
    }

    #[test]
    fn test_depth() {
        let tax = sample();
        assert_eq!(tax.depth(1), 0);
        assert_eq!(tax.depth(3), 1);
        assert_eq!(tax.depth(5), 2);
        assert_eq!(tax.depth(42), TAXON_UNKNOWN);
        // Parent chain leaves the map.
        assert_eq!(tax.depth(9), TAXON_UNKNOWN);
    }

    #[test]
    fn test_path_to_root() {
        let tax = sample();
        assert_eq!(tax.path_to_root(5), vec![5, 3, 1]);
        assert_eq!(tax.path_to_root(1), vec![1]);
        // Unknown taxa and broken chains anchor their own walk.
        assert_eq!(tax.path_to_root(42), vec![42]);
        assert_eq!(tax.path_to_root(9), vec![9]);
    }

    #[test]
    fn test_lca() {
        let tax = sample();
        assert_eq!(tax.lca(5, 7), 3);
        assert_eq!(tax.lca(5, 3), 3);
        assert_eq!(tax.lca(5, 5), 5);
        assert_eq!(tax.lca(5, 1), 1);
        assert_eq!(tax.lca(5, 42), TAXON_UNKNOWN);
    }
}
