//! Color extraction: summarize a region's pixels as weighted
//! representative colors.
//!
//! Three strategies, selected per invocation: a single mean color, one
//! weighted color per pixel (letting downstream note aggregation do the
//! summarizing), or adaptive clustering on the HSL cone.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cluster::{XmeansOptions, xmeans};
use crate::color::{Hslc, Rgb, hslc_to_rgb, rgb_to_hslc};
use crate::stats::ArrayMean;

/// Selects how a region's pixels become weighted colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorChoice {
    /// A single incremental RGB mean with weight 1.
    #[default]
    Mean,
    /// Adaptive clustering on the HSL cone; one color per cluster,
    /// weighted by its pixel count.
    Xmeans,
    /// Every pixel as its own color with weight 1.
    Proportional,
}

impl ColorChoice {
    /// The wire/CLI name of this strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Xmeans => "xmeans",
            Self::Proportional => "proportional",
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "xmeans" => Ok(Self::Xmeans),
            "proportional" => Ok(Self::Proportional),
            other => Err(format!("unknown color choice: {other}")),
        }
    }
}

/// Per-region knobs for extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Number of pixels in the region, used to size cluster buffers.
    pub pixel_count: usize,
    /// Cluster cap for the adaptive strategy.
    pub max_clusters: usize,
    /// Minimum per-cluster standard deviation; squared into the
    /// clustering variance floor.
    pub min_std: f64,
}

/// The incremental RGB mean of a color stream.
#[must_use]
pub fn rgb_mean(colors: impl Iterator<Item = Rgb>) -> Option<Rgb> {
    let mut mean = ArrayMean::<3>::new();
    for c in colors {
        mean.push([c.r, c.g, c.b]);
    }
    mean.value().map(|[r, g, b]| Rgb::new(r, g, b))
}

/// The incremental HSL-cone mean of a color stream, mapped back to RGB.
///
/// Averaging on the cone keeps opposing hues from cancelling into an
/// unrelated hue the way a naive channel mean can.
#[must_use]
pub fn hslc_mean(colors: impl Iterator<Item = Rgb>) -> Option<Rgb> {
    let mut mean = ArrayMean::<3>::new();
    for c in colors {
        mean.push(rgb_to_hslc(c).to_array());
    }
    mean.value().map(|m| hslc_to_rgb(Hslc::from_array(m)))
}

/// Summarize a color stream as weighted representative colors.
///
/// The returned sequence is finite and consumed exactly once; the
/// proportional strategy stays lazy so a large region is never
/// materialized.
pub fn extract<'a, R: Rng>(
    colors: impl Iterator<Item = Rgb> + 'a,
    choice: ColorChoice,
    options: &ExtractOptions,
    rng: &mut R,
) -> Box<dyn Iterator<Item = (Rgb, f64)> + 'a> {
    match choice {
        ColorChoice::Mean => Box::new(rgb_mean(colors).map(|c| (c, 1.0)).into_iter()),
        ColorChoice::Proportional => Box::new(colors.map(|c| (c, 1.0))),
        ColorChoice::Xmeans => Box::new(cluster_colors(colors, options, rng).into_iter()),
    }
}

/// Cluster the region's pixels on the HSL cone and emit one color per
/// cluster, weighted by assigned pixel count.
#[allow(clippy::cast_precision_loss)]
fn cluster_colors<R: Rng>(
    colors: impl Iterator<Item = Rgb>,
    options: &ExtractOptions,
    rng: &mut R,
) -> Vec<(Rgb, f64)> {
    let mut data = Vec::with_capacity(options.pixel_count * 3);
    for c in colors {
        data.extend_from_slice(&rgb_to_hslc(c).to_array());
    }

    let model = xmeans(
        rng,
        &data,
        3,
        &XmeansOptions {
            max_clusters: Some(options.max_clusters),
            min_variance: options.min_std * options.min_std,
            ..XmeansOptions::default()
        },
    );

    let k = model.cluster_count(3);
    let mut counts = vec![0u64; k];
    for &a in &model.assignments {
        counts[a] += 1;
    }
    (0..k)
        .map(|c| {
            let centroid = &model.centroids[c * 3..(c + 1) * 3];
            let color = hslc_to_rgb(Hslc::from_array([centroid[0], centroid[1], centroid[2]]));
            (color, counts[c] as f64)
        })
        .collect()
}
