//! Adaptive clustering: k-means++ seeding, Lloyd refinement, and an
//! X-means outer loop that grows the cluster count while the Bayesian
//! Information Criterion justifies each split.
//!
//! The engine is domain-agnostic: it operates on flat row-major `f64`
//! vectors of any dimension. All randomness flows through an injected
//! [`Rng`], so callers decide between OS entropy and a pinned seed.
//!
//! Distances are squared Euclidean throughout (only relative ordering
//! matters), per-cluster means accumulate incrementally, and degenerate
//! single-point clusters are kept finite by the caller-supplied variance
//! floor.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::Mean;

/// A fitted cluster model: `K` centroids (flat, row-major) plus the
/// nearest-centroid assignment of every input vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Centroid coordinates, `K × dim` values.
    pub centroids: Vec<f64>,
    /// For each input vector, the index of its nearest centroid.
    pub assignments: Vec<usize>,
}

impl Clustering {
    /// Number of clusters in the model.
    #[must_use]
    pub const fn cluster_count(&self, dim: usize) -> usize {
        self.centroids.len() / dim
    }
}

/// How to seed the 2-way split tried on each cluster during the X-means
/// outer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStyle {
    /// Re-seed two centroids with k-means++ on the cluster's points.
    #[default]
    #[serde(rename = "kmeans++")]
    KmeansPlusPlus,
    /// Perturb the cluster mean by ± a Gaussian vector scaled by the
    /// cluster's standard deviation.
    #[serde(rename = "xmeans-classic")]
    Classic,
    /// Seed with the two most mutually distant points in the cluster.
    MaxDistance,
}

impl SplitStyle {
    /// The wire/CLI name of this style.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::KmeansPlusPlus => "kmeans++",
            Self::Classic => "xmeans-classic",
            Self::MaxDistance => "max-distance",
        }
    }
}

impl fmt::Display for SplitStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SplitStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kmeans++" => Ok(Self::KmeansPlusPlus),
            "xmeans-classic" => Ok(Self::Classic),
            "max-distance" => Ok(Self::MaxDistance),
            other => Err(format!("unknown split style: {other}")),
        }
    }
}

/// Tuning knobs for [`xmeans`].
#[derive(Debug, Clone, PartialEq)]
pub struct XmeansOptions {
    /// Iteration cap for every inner Lloyd refinement.
    pub max_kmeans_iters: usize,
    /// Cluster count of the starting model.
    pub init_clusters: usize,
    /// Hard cap on the cluster count; `None` lets BIC alone decide.
    pub max_clusters: Option<usize>,
    /// Lower clamp applied to the pooled variance inside BIC, so a
    /// perfectly homogeneous cluster cannot blow up the log-likelihood.
    pub min_variance: f64,
    /// Split seeding strategy.
    pub split_style: SplitStyle,
}

impl Default for XmeansOptions {
    fn default() -> Self {
        Self {
            max_kmeans_iters: 1000,
            init_clusters: 1,
            max_clusters: None,
            min_variance: 0.0,
            split_style: SplitStyle::default(),
        }
    }
}

/// One row of a flat row-major matrix.
fn row(data: &[f64], index: usize, dim: usize) -> &[f64] {
    &data[index * dim..(index + 1) * dim]
}

/// Squared Euclidean distance between two vectors.
fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l - r) * (l - r))
        .sum()
}

/// Sample an index with probability proportional to its weight.
///
/// Falls back to the last index when the weights sum to zero (all
/// candidate points coincide with an already-chosen centroid).
fn sample_weighted<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let val = rng.random::<f64>() * total;
    let mut running = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        running += w;
        if val < running {
            return i;
        }
    }
    weights.len() - 1
}

/// A standard normal draw via Box-Muller on the injected generator.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - u lies in (0, 1], keeping the log finite.
    let u: f64 = rng.random();
    let v: f64 = rng.random();
    (-2.0 * (1.0 - u).ln()).sqrt() * (std::f64::consts::TAU * v).cos()
}

/// Seed `k` centroids with k-means++.
///
/// The first centroid is a uniformly random point; each subsequent one
/// is sampled with probability proportional to its running minimum
/// squared distance from the centroids chosen so far.
#[must_use]
pub fn kmeans_plus_plus<R: Rng>(rng: &mut R, data: &[f64], dim: usize, k: usize) -> Vec<f64> {
    let n = data.len() / dim;
    let mut centroids = vec![0.0; k * dim];
    if n == 0 || k == 0 {
        return centroids;
    }

    let first = rng.random_range(0..n);
    centroids[..dim].copy_from_slice(row(data, first, dim));

    let mut dists = vec![f64::INFINITY; n];
    for c in 1..k {
        let last = centroids[(c - 1) * dim..c * dim].to_vec();
        for (i, d) in dists.iter_mut().enumerate() {
            let candidate = squared_distance(&last, row(data, i, dim));
            if candidate < *d {
                *d = candidate;
            }
        }
        let pick = sample_weighted(rng, &dists);
        let point = row(data, pick, dim).to_vec();
        centroids[c * dim..(c + 1) * dim].copy_from_slice(&point);
    }
    centroids
}

/// Seed a 2-way split with the two most mutually distant points.
fn max_distance_split(data: &[f64], dim: usize) -> Vec<f64> {
    let n = data.len() / dim;
    let mut seeds = vec![0.0; 2 * dim];
    let mut max_dist = 0.0;
    for i in 0..n {
        let left = row(data, i, dim);
        for j in 0..i {
            let right = row(data, j, dim);
            let d = squared_distance(left, right);
            if d > max_dist {
                max_dist = d;
                seeds[..dim].copy_from_slice(left);
                seeds[dim..].copy_from_slice(right);
            }
        }
    }
    seeds
}

/// Refine centroids in place with Lloyd's algorithm and return the final
/// assignments.
///
/// Each iteration assigns every point to its nearest centroid, recomputes
/// centroids as incremental means of their points, and re-seeds any
/// centroid left without points from a uniformly random input point
/// (which forces at least one more iteration). Iteration stops early once
/// assignments repeat and no re-seed occurred.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kmeans<R: Rng>(
    rng: &mut R,
    data: &[f64],
    centroids: &mut [f64],
    dim: usize,
    max_iterations: usize,
) -> Vec<usize> {
    let n = data.len() / dim;
    let k = centroids.len() / dim;
    if n == 0 || k == 0 {
        return Vec::new();
    }

    let mut assignments = vec![0usize; n];
    let mut previous = vec![usize::MAX; n];
    let mut counts = vec![0u64; k];

    for _ in 0..max_iterations {
        for (i, assignment) in assignments.iter_mut().enumerate() {
            let point = row(data, i, dim);
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..k {
                let d = squared_distance(point, &centroids[c * dim..(c + 1) * dim]);
                if d < best_dist {
                    best_dist = d;
                    best = c;
                }
            }
            *assignment = best;
        }

        // Incremental means: each point folds into its cluster's running
        // mean, so large clusters do not accumulate summation error.
        counts.fill(0);
        centroids.fill(0.0);
        for (i, &a) in assignments.iter().enumerate() {
            counts[a] += 1;
            let count = counts[a] as f64;
            for j in 0..dim {
                let slot = &mut centroids[a * dim + j];
                *slot += (data[i * dim + j] - *slot) / count;
            }
        }

        let mut reseeded = false;
        for (c, &count) in counts.iter().enumerate() {
            if count == 0 {
                let replacement = row(data, rng.random_range(0..n), dim).to_vec();
                centroids[c * dim..(c + 1) * dim].copy_from_slice(&replacement);
                reseeded = true;
            }
        }

        if !reseeded && assignments == previous {
            break;
        }
        previous.copy_from_slice(&assignments);
    }
    assignments
}

/// Pooled variance: the incremental mean of squared per-dimension
/// deviations of every point from its assigned centroid.
fn variance(data: &[f64], centroids: &[f64], assignments: &[usize], dim: usize) -> f64 {
    let mut pooled = Mean::new();
    for (i, &a) in assignments.iter().enumerate() {
        let point = row(data, i, dim);
        let centroid = &centroids[a * dim..(a + 1) * dim];
        for (p, c) in point.iter().zip(centroid) {
            pooled.push((p - c) * (p - c));
        }
    }
    pooled.value().unwrap_or(0.0)
}

/// Bayesian Information Criterion of a fitted model, together with the
/// unclamped pooled variance.
///
/// Log-likelihood is `Σ countᶜ·ln countᶜ − (N·D/2)·ln(variance)` with the
/// variance clamped below by `min_variance`; the penalty counts
/// `K·(D+1)` free parameters (centroid coordinates plus mixture
/// weights).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bic(
    data: &[f64],
    centroids: &[f64],
    assignments: &[usize],
    dim: usize,
    min_variance: f64,
) -> (f64, f64) {
    let n = data.len() / dim;
    let k = centroids.len() / dim;

    let mut counts = vec![0u64; k];
    for &a in assignments {
        counts[a] += 1;
    }
    // Clusters without points contribute nothing to the entropy term.
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| (c as f64) * (c as f64).ln())
        .sum();

    let raw_variance = variance(data, centroids, assignments, dim);
    let clamped = raw_variance.max(min_variance);
    let likelihood = entropy - (data.len() as f64 / 2.0) * clamped.ln();

    let parameters = (k * (dim + 1)) as f64;
    let score = likelihood - parameters / 2.0 * (n as f64).ln();
    (score, raw_variance)
}

/// Fit a cluster model with an adaptively chosen cluster count.
///
/// Starting from `init_clusters` found via k-means++ and Lloyd
/// refinement, each generation tries a 2-way split of every cluster and
/// keeps the split only when its BIC on that cluster's points beats
/// keeping the cluster whole. Generations exceeding `max_clusters` are
/// reservoir-downsampled to the cap so every surviving candidate had
/// equal a-priori odds. After re-tightening over the full dataset, the
/// generation's whole-data BIC is compared against the best seen and the
/// best-ever model is what is finally returned, since a later generation
/// may regress.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn xmeans<R: Rng>(rng: &mut R, data: &[f64], dim: usize, options: &XmeansOptions) -> Clustering {
    let mut centroids = kmeans_plus_plus(rng, data, dim, options.init_clusters);
    let mut assignments = kmeans(rng, data, &mut centroids, dim, options.max_kmeans_iters);

    let (mut best_score, _) = bic(data, &centroids, &assignments, dim, options.min_variance);
    let mut best = Clustering {
        centroids: centroids.clone(),
        assignments: assignments.clone(),
    };

    let mut did_split = true;
    while did_split && options.max_clusters != Some(centroids.len() / dim) {
        did_split = false;
        let k = centroids.len() / dim;
        let mut next = Vec::with_capacity(centroids.len() * 2);

        for c in 0..k {
            let center = centroids[c * dim..(c + 1) * dim].to_vec();
            let subset: Vec<f64> = assignments
                .iter()
                .enumerate()
                .filter(|&(_, &a)| a == c)
                .flat_map(|(i, _)| row(data, i, dim).iter().copied())
                .collect();
            let subset_len = subset.len() / dim;
            if subset_len == 0 {
                next.extend_from_slice(&center);
                continue;
            }

            let keep_assignments = vec![0usize; subset_len];
            let (keep_score, keep_variance) =
                bic(&subset, &center, &keep_assignments, dim, options.min_variance);

            let mut split = match options.split_style {
                SplitStyle::KmeansPlusPlus => kmeans_plus_plus(rng, &subset, dim, 2),
                SplitStyle::Classic => {
                    let stdev = keep_variance.sqrt();
                    let mut seeds = Vec::with_capacity(2 * dim);
                    seeds.extend_from_slice(&center);
                    seeds.extend_from_slice(&center);
                    for j in 0..dim {
                        let offset = standard_normal(rng) * stdev;
                        seeds[j] += offset;
                        seeds[j + dim] -= offset;
                    }
                    seeds
                }
                SplitStyle::MaxDistance => max_distance_split(&subset, dim),
            };
            let split_assignments =
                kmeans(rng, &subset, &mut split, dim, options.max_kmeans_iters);
            let (split_score, _) =
                bic(&subset, &split, &split_assignments, dim, options.min_variance);

            if split_score > keep_score {
                next.extend_from_slice(&split);
                did_split = true;
            } else {
                next.extend_from_slice(&center);
            }
        }

        if let Some(cap) = options.max_clusters {
            let candidates = next.len() / dim;
            if candidates > cap {
                // Reservoir sampling: each excess candidate replaces a
                // uniform slot with probability cap/(i+1).
                for i in cap..candidates {
                    if rng.random::<f64>() * ((i + 1) as f64) < cap as f64 {
                        let slot = rng.random_range(0..cap);
                        let source = next[i * dim..(i + 1) * dim].to_vec();
                        next[slot * dim..(slot + 1) * dim].copy_from_slice(&source);
                    }
                }
                next.truncate(cap * dim);
            }
        }

        centroids = next;
        assignments = kmeans(rng, data, &mut centroids, dim, options.max_kmeans_iters);
        let (score, _) = bic(data, &centroids, &assignments, dim, options.min_variance);
        if score > best_score {
            best_score = score;
            best = Clustering {
                centroids: centroids.clone(),
                assignments: assignments.clone(),
            };
        }
    }
    best
}
