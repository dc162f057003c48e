use crate::cluster::ClusterSplitter;
use planeseg_core::PointCloud;
use std::collections::BTreeMap;

/// Ward-linkage hierarchical clustering down to a fixed group count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agglomerative {
    pub n_clusters: usize,
}

#[derive(Debug, Clone, Copy)]
struct Group {
    centroid: [f64; 3],
    size: usize,
    /// Any original point of the group.
    rep: usize,
}

impl Group {
    /// Increase in within-group variance caused by merging.
    fn ward_cost(&self, other: &Group) -> f64 {
        let (na, nb) = (self.size as f64, other.size as f64);
        let d2: f64 = (0..3)
            .map(|k| (self.centroid[k] - other.centroid[k]).powi(2))
            .sum();
        na * nb / (na + nb) * d2
    }

    fn absorb(&mut self, other: &Group) {
        let (na, nb) = (self.size as f64, other.size as f64);
        for k in 0..3 {
            self.centroid[k] = (self.centroid[k] * na + other.centroid[k] * nb) / (na + nb);
        }
        self.size += other.size;
    }
}

/// Every merge of the full Ward dendrogram as `(cost, rep_a, rep_b)`, in
/// the order the nearest-neighbour chain finds them.
fn ward_merges(cloud: &PointCloud) -> Vec<(f64, usize, usize)> {
    let mut slots: Vec<Option<Group>> = cloud
        .iter_points()
        .enumerate()
        .map(|(i, p)| {
            Some(Group {
                centroid: [p[0] as f64, p[1] as f64, p[2] as f64],
                size: 1,
                rep: i,
            })
        })
        .collect();
    let mut active = slots.len();
    let mut merges = Vec::with_capacity(active.saturating_sub(1));

    // Follow nearest neighbours until two groups are mutual nearest
    // neighbours, then merge them. Ward linkage is reducible, so the rest
    // of the chain stays valid after a merge.
    let mut chain: Vec<usize> = Vec::new();
    while active > 1 {
        if chain.is_empty() {
            match slots.iter().position(Option::is_some) {
                Some(first) => chain.push(first),
                None => break,
            }
        }

        let top = chain[chain.len() - 1];
        let prev = chain.len().checked_sub(2).map(|i| chain[i]);
        let Some(current) = slots[top] else {
            break;
        };

        // Ties prefer the previous chain element so the chain closes.
        let mut nearest = prev.and_then(|p| slots[p].map(|g| (p, current.ward_cost(&g))));
        for (j, slot) in slots.iter().enumerate() {
            let Some(g) = slot else { continue };
            if j == top || Some(j) == prev {
                continue;
            }
            let cost = current.ward_cost(g);
            if nearest.map_or(true, |(_, best)| cost < best) {
                nearest = Some((j, cost));
            }
        }
        let Some((next, cost)) = nearest else {
            break;
        };

        if Some(next) == prev {
            chain.truncate(chain.len() - 2);
            let (keep, drop) = (top.min(next), top.max(next));
            if let (Some(dropped), Some(kept)) = (slots[drop].take(), slots[keep].as_mut()) {
                merges.push((cost, kept.rep, dropped.rep));
                kept.absorb(&dropped);
            }
            active -= 1;
        } else {
            chain.push(next);
        }
    }
    merges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

impl Agglomerative {
    pub fn new(n_clusters: usize) -> Self {
        Self { n_clusters }
    }

    /// Groups of point indices, each sorted, ordered by their smallest
    /// index. With no more points than groups every point stands alone.
    pub fn groups(&self, cloud: &PointCloud) -> Vec<Vec<usize>> {
        let n = cloud.len();
        let target = self.n_clusters.max(1);
        let mut parent: Vec<usize> = (0..n).collect();

        if n > target {
            // Cutting the dendrogram at `target` groups applies the
            // cheapest n - target merges. The sort is stable, so a merge
            // never precedes one of its children.
            let mut merges = ward_merges(cloud);
            merges.sort_by(|a, b| a.0.total_cmp(&b.0));
            for &(_, a, b) in merges.iter().take(n - target) {
                let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        let mut group_of_root = vec![usize::MAX; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = find(&mut parent, i);
            if group_of_root[root] == usize::MAX {
                group_of_root[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[group_of_root[root]].push(i);
        }
        groups
    }
}

impl ClusterSplitter for Agglomerative {
    fn split(&self, points: &PointCloud) -> BTreeMap<i32, Vec<usize>> {
        self.groups(points)
            .into_iter()
            .enumerate()
            .map(|(label, members)| (label as i32, members))
            .collect()
    }
}
