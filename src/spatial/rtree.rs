//! Bulk-loaded R-tree (Sort-Tile-Recursive) over feature bounding boxes.
//! Internal nodes hold feature-store indices rather than on-disk page ids,
//! since this index lives entirely in memory.

use crate::spatial::bbox::Bounds;

pub const DEFAULT_MAX_NODE_ENTRIES: usize = 16;

#[derive(Debug, Clone)]
struct LeafEntry {
    bbox: Bounds,
    feature_idx: usize,
}

#[derive(Debug, Clone)]
struct ChildRef {
    bbox: Bounds,
    node_idx: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { entries: Vec<LeafEntry> },
    Internal { children: Vec<ChildRef>, level: u32 },
}

impl Node {
    fn bbox(&self) -> Bounds {
        let mut b = Bounds::empty();
        match self {
            Node::Leaf { entries } => entries.iter().for_each(|e| b.expand(&e.bbox)),
            Node::Internal { children, .. } => children.iter().for_each(|c| b.expand(&c.bbox)),
        }
        b
    }
}

/// A bulk-loaded R-tree over `(Bounds, feature_idx)` pairs. Holds no
/// `Feature` data itself — callers resolve `feature_idx` against their own
/// backing storage (Design Notes: "mixed ownership... store uniquely,
/// reference by id").
#[derive(Debug)]
pub struct RTree {
    nodes: Vec<Node>,
    root: usize,
    len: usize,
}

impl RTree {
    /// Bulk-load via Sort-Tile-Recursive: `P = ceil(N/M)`
    /// leaves, `S = ceil(sqrt(P))` vertical slices sorted by `minX`, each
    /// slice sorted by `minY` and cut into leaves of up to `M` entries;
    /// internal levels repeat the same STR step over child MBRs.
    pub fn build(mut entries: Vec<(Bounds, usize)>, max_node_entries: usize) -> Self {
        let max_node_entries = max_node_entries.max(1);
        let len = entries.len();
        if entries.is_empty() {
            return Self {
                nodes: vec![Node::Leaf { entries: vec![] }],
                root: 0,
                len: 0,
            };
        }

        let leaf_groups = str_partition(&mut entries, max_node_entries);
        let mut nodes: Vec<Node> = leaf_groups
            .into_iter()
            .map(|group| Node::Leaf {
                entries: group
                    .into_iter()
                    .map(|(bbox, idx)| LeafEntry { bbox, feature_idx: idx })
                    .collect(),
            })
            .collect();

        let mut level = 0u32;
        let mut current: Vec<usize> = (0..nodes.len()).collect();
        while current.len() > 1 {
            level += 1;
            let mut child_entries: Vec<(Bounds, usize)> =
                current.iter().map(|&i| (nodes[i].bbox(), i)).collect();
            let groups = str_partition(&mut child_entries, max_node_entries);
            let start = nodes.len();
            for group in groups {
                nodes.push(Node::Internal {
                    children: group
                        .into_iter()
                        .map(|(bbox, idx)| ChildRef { bbox, node_idx: idx })
                        .collect(),
                    level,
                });
            }
            current = (start..nodes.len()).collect();
        }

        let root = current[0];
        Self { nodes, root, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Feature indices whose stored MBR intersects `bounds`: depth-first
    /// descent pruning on each node's own MBR, leaf entries checked
    /// individually rather than assumed from their parent's box.
    pub fn query_bounds(&self, bounds: &Bounds) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect(self.root, bounds, &mut out);
        out
    }

    fn collect(&self, node_idx: usize, bounds: &Bounds, out: &mut Vec<usize>) {
        match &self.nodes[node_idx] {
            Node::Leaf { entries } => {
                for e in entries {
                    if e.bbox.intersects(bounds) {
                        out.push(e.feature_idx);
                    }
                }
            }
            Node::Internal { children, .. } => {
                for c in children {
                    if c.bbox.intersects(bounds) {
                        self.collect(c.node_idx, bounds, out);
                    }
                }
            }
        }
    }

    /// Tree height: 0 for a single leaf root, incrementing per internal
    /// level (`N = maxNodeEntries` gives a single leaf root; `N =
    /// maxNodeEntries + 1` gives a two-level tree).
    pub fn height(&self) -> u32 {
        match &self.nodes[self.root] {
            Node::Leaf { .. } => 0,
            Node::Internal { level, .. } => *level,
        }
    }
}

fn str_partition(entries: &mut [(Bounds, usize)], m: usize) -> Vec<Vec<(Bounds, usize)>> {
    let n = entries.len();
    if n == 0 {
        return vec![];
    }
    let p = n.div_ceil(m);
    let s = (p as f64).sqrt().ceil() as usize;
    let s = s.max(1);

    entries.sort_by(|a, b| a.0.west.partial_cmp(&b.0.west).unwrap());

    let slice_size = n.div_ceil(s);
    let mut groups = Vec::new();
    for slice in entries.chunks_mut(slice_size) {
        slice.sort_by(|a, b| a.0.south.partial_cmp(&b.0.south).unwrap());
        for leaf in slice.chunks(m) {
            groups.push(leaf.to_vec());
        }
    }
    groups
}
