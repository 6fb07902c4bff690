//! Greedy similarity clustering with small-cluster absorption.

use tracing::debug;

use super::similarity::SimilarityMatrix;
use super::types::Cluster;

/// Factor applied to the similarity threshold when absorbing undersized clusters.
const MERGE_RELAXATION: f32 = 0.8;

/// Partition sentence indices `0..n` into clusters.
///
/// Seeding is a single greedy pass: each unassigned index becomes a seed and
/// pulls in every unassigned index whose similarity to the seed reaches
/// `threshold`. Followers are never reconsidered as seeds, so this is not a
/// transitive closure.
///
/// Clusters smaller than `min_size` are then merged, one at a time, into the
/// cluster with the highest mean cross-similarity, provided that mean exceeds
/// `threshold * 0.8`. The scan restarts after every merge and stops after a
/// pass with no merge, or after `n` merges.
///
/// Returned clusters are sorted internally and ordered by smallest index.
pub fn build_clusters(matrix: &SimilarityMatrix, threshold: f32, min_size: usize) -> Vec<Cluster> {
    let n = matrix.len();
    let mut clusters = seed_clusters(matrix, threshold);
    let seeded = clusters.len();

    let merge_floor = threshold * MERGE_RELAXATION;
    let mut merges = 0usize;
    while merges < n {
        match find_merge(matrix, &clusters, min_size, merge_floor) {
            Some((small, target)) => {
                let absorbed = std::mem::take(&mut clusters[small]);
                clusters[target].extend(absorbed);
                clusters.remove(small);
                merges += 1;
            }
            None => break,
        }
    }

    debug!(seeded, merges, clusters = clusters.len(), "clusters built");

    let mut clusters: Vec<Cluster> = clusters
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|mut indices| {
            indices.sort_unstable();
            Cluster::new(indices)
        })
        .collect();
    clusters.sort_by_key(|c| c.indices[0]);
    clusters
}

fn seed_clusters(matrix: &SimilarityMatrix, threshold: f32) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut cluster = vec![i];
        for j in 0..n {
            if !visited[j] && matrix.get(i, j) >= threshold {
                visited[j] = true;
                cluster.push(j);
            }
        }
        clusters.push(cluster);
    }
    clusters
}

/// First undersized cluster (in arena order) with a qualifying target.
/// Ties between targets go to the earlier one.
fn find_merge(
    matrix: &SimilarityMatrix,
    clusters: &[Vec<usize>],
    min_size: usize,
    merge_floor: f32,
) -> Option<(usize, usize)> {
    for (small, members) in clusters.iter().enumerate() {
        if members.is_empty() || members.len() >= min_size {
            continue;
        }

        let mut best: Option<(usize, f32)> = None;
        for (target, other) in clusters.iter().enumerate() {
            if target == small || other.is_empty() {
                continue;
            }
            let score = matrix.mean_between(members, other);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((target, score));
            }
        }

        if let Some((target, score)) = best {
            if score > merge_floor {
                return Some((small, target));
            }
        }
    }
    None
}
